use anyhow::{Context, Result, anyhow};
use directories_next::ProjectDirs;
use eframe::NativeOptions;
use ovascan_core::{AppConfig, TabController};
use std::env;
use std::path::PathBuf;

mod app;

use app::UiApp;

const CONFIG_ENV: &str = "OVASCAN_CONFIG";

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config_path = config_path();
    let config = match &config_path {
        Some(path) => AppConfig::load_or_default(path)
            .with_context(|| format!("invalid configuration at {}", path.display()))?,
        None => AppConfig::default(),
    };
    let tabs =
        TabController::from_config(&config).context("could not build tabs from configuration")?;
    tracing::info!(tabs = tabs.panels().len(), "Starting OvaScan");

    let options = NativeOptions::default();
    eframe::run_native(
        "OvaScan",
        options,
        Box::new(move |cc| {
            Ok::<_, Box<dyn std::error::Error + Send + Sync>>(Box::new(UiApp::new(
                &cc.egui_ctx,
                config,
                config_path,
                tabs,
            )))
        }),
    )
    .map_err(|e| anyhow!("application stopped with error: {e}"))
}

fn config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    ProjectDirs::from("org", "OvaScan", "OvaScan").map(|dirs| dirs.config_dir().join("config.toml"))
}
