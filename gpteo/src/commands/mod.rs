// gpteo/src/commands/mod.rs

pub mod checks;
pub mod delete;
pub mod list;
pub mod render;
pub mod scan;
pub mod show;
pub mod stats;

use anyhow::Context;
use std::path::Path;

use gpteo_core::application::ScanService;
use gpteo_core::infrastructure::config::{Settings, load_settings};

/// Settings from `--config`, or from `gpteo.yaml` in the working directory.
pub fn settings(config: Option<&Path>) -> anyhow::Result<Settings> {
    load_settings(config).with_context(|| match config {
        Some(path) => format!("Failed to load settings from {}", path.display()),
        None => "Failed to load settings from the working directory".to_string(),
    })
}

pub fn service(settings: &Settings) -> anyhow::Result<ScanService> {
    ScanService::from_settings(settings).with_context(|| {
        format!(
            "Failed to open the {:?} store at {}",
            settings.store.backend, settings.store.db_path
        )
    })
}
