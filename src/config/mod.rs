// Configuration module for sensor-datastore
//
// Provides:
// - YAML configuration file loading
// - Environment variable substitution
// - Configuration validation
// - Default values

pub mod types;
mod loader;

pub use types::*;
pub use loader::ConfigLoader;

use anyhow::{Context, Result};
use std::path::Path;

/// Environment variable selecting the storage backend
pub const BACKEND_ENV: &str = "DATA_ACCESS";

/// Environment variable pointing every backend at one host
pub const HOSTNAME_ENV: &str = "DATA_HOSTNAME";

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    ConfigLoader::load(path).context("Failed to load configuration")
}

/// Load configuration with environment variable overrides
pub fn load_config_with_env<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let mut config = load_config(path)?;
    apply_env_overrides(&mut config);
    ConfigLoader::validate(&config)?;
    Ok(config)
}

/// Built-in defaults with environment variable overrides, for running without
/// a configuration file
pub fn config_from_env() -> Result<AppConfig> {
    let mut config = AppConfig::default();
    apply_env_overrides(&mut config);
    ConfigLoader::validate(&config)?;
    Ok(config)
}

fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(backend) = std::env::var(BACKEND_ENV) {
        config.storage.backend = backend;
    }

    if let Ok(host) = std::env::var(HOSTNAME_ENV) {
        if !host.is_empty() {
            config.storage.set_host(&host);
        }
    }
}
