//! Headless core of the OvaScan front-end: tab switching and image previews.

pub mod config;
pub mod data_url;
pub mod error;
pub mod preview;
pub mod tabs;

pub use config::{AppConfig, PanelKind, PreviewConfig, TabSpec};
pub use data_url::{DataUrl, sniff_mime};
pub use error::{ConfigError, DataUrlError, PreviewError, TabError};
pub use preview::{
    Applied, FileReader, FsReader, PreviewArtifact, PreviewHandler, PreviewPixels, PreviewStyle,
    ReadOutcome, ReadTicket, SelectedFile, read_artifact,
};
pub use tabs::{Panel, Selector, TabClick, TabController};
