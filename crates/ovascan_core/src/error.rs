//! Error types for the tab controller, preview handler and configuration.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TabError {
    #[error("Host has no panels")]
    NoPanels,

    #[error("Duplicate panel id: {0}")]
    DuplicatePanel(String),

    #[error("Duplicate selector id: {0}")]
    DuplicateSelector(String),

    #[error("Selector {selector} targets unknown panel {target}")]
    DanglingSelector { selector: String, target: String },

    #[error("Panel {panel} has {count} selectors, expected exactly one")]
    UnpairedPanel { panel: String, count: usize },

    #[error("Unknown panel: {0}")]
    UnknownPanel(String),

    #[error("Unknown selector: {0}")]
    UnknownSelector(String),
}

#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("Could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is empty", path.display())]
    Empty { path: PathBuf },

    #[error("{} is {size} bytes, the limit is {limit}", path.display())]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("{} is not a supported image", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("Could not decode {}: {message}", path.display())]
    Decode { path: PathBuf, message: String },

    #[error("Read of {} was superseded by a newer selection", path.display())]
    Superseded { path: PathBuf },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DataUrlError {
    #[error("Missing data: scheme")]
    MissingScheme,

    #[error("Only base64 data URLs are supported")]
    NotBase64,

    #[error("Invalid base64 payload: {0}")]
    InvalidPayload(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
