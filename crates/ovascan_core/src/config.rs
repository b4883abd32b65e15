//! Application configuration loaded from TOML.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::preview::PreviewStyle;

/// What a panel shows when it is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PanelKind {
    /// File picker plus inline image preview.
    ImageUpload,
    /// Static text.
    Text { body: String },
    /// Session settings.
    Settings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabSpec {
    pub id: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: PanelKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Files larger than this are rejected before encoding.
    pub max_bytes: u64,
    pub style: PreviewStyle,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_bytes: 20 * 1024 * 1024,
            style: PreviewStyle::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_tabs")]
    pub tabs: Vec<TabSpec>,
    #[serde(default)]
    pub default_tab: Option<String>,
    #[serde(default)]
    pub preview: PreviewConfig,
}

fn default_tabs() -> Vec<TabSpec> {
    vec![
        TabSpec {
            id: "lab".into(),
            label: "Lab Results".into(),
            kind: PanelKind::Text {
                body: "Lab results are entered and assessed by the clinical service. \
                       This panel is for information only."
                    .into(),
            },
        },
        TabSpec {
            id: "image".into(),
            label: "Image Analysis".into(),
            kind: PanelKind::ImageUpload,
        },
        TabSpec {
            id: "settings".into(),
            label: "Settings".into(),
            kind: PanelKind::Settings,
        },
    ]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tabs: default_tabs(),
            default_tab: Some("lab".into()),
            preview: PreviewConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(input)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Like [`AppConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match Self::load(path) {
            Err(ConfigError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                tracing::info!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tabs.is_empty() {
            return Err(ConfigError::Invalid("at least one tab is required".into()));
        }
        let mut seen = HashSet::new();
        for tab in &self.tabs {
            if tab.id.trim().is_empty() {
                return Err(ConfigError::Invalid("tab id must not be empty".into()));
            }
            if !seen.insert(tab.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate tab id `{}`", tab.id)));
            }
        }
        if let Some(default) = &self.default_tab
            && !seen.contains(default.as_str())
        {
            return Err(ConfigError::Invalid(format!(
                "default_tab `{default}` is not a configured tab"
            )));
        }
        if self.preview.max_bytes == 0 {
            return Err(ConfigError::Invalid("preview.max_bytes must be positive".into()));
        }
        let fraction = self.preview.style.max_width_fraction;
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "preview.style.max_width_fraction must be in (0, 1], got {fraction}"
            )));
        }
        Ok(())
    }
}
