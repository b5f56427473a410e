//! Initialize the configuration directory: create `~/.dmrelay` and a default `config.json`.
//!
//! The written config holds every default explicitly so operators can see what to fill in.
//! Secrets are left null; they normally come from the environment.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::Config;

/// Pretty JSON of the default config.
pub fn default_config_json() -> Result<String> {
    serde_json::to_string_pretty(&Config::default()).context("serializing default config")
}

/// Create the config directory and default config file if they do not exist.
/// An existing config file is left untouched. Returns the config directory.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        let mut contents = default_config_json()?;
        contents.push('\n');
        std::fs::write(config_path, contents)
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    } else {
        log::debug!(
            "config already exists at {}, skipping",
            config_path.display()
        );
    }

    Ok(config_dir.to_path_buf())
}
