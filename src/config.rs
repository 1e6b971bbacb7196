// src/config.rs

//! Configuration loading utilities.
//!
//! The effective configuration is the TOML file (or defaults when it is
//! missing or broken) with `FS22_BOT_*` environment overrides on top.

use std::path::Path;

use crate::models::Config;

/// Load the configuration file and apply environment overrides.
///
/// Falls back to defaults if the file cannot be loaded.
pub fn load_config(path: &Path) -> Config {
    let mut config = if path.exists() {
        Config::load_or_default(path)
    } else {
        log::info!("No config file at {:?}, using defaults", path);
        Config::default()
    };
    config.apply_env();
    config
}
