//! Configuration loading from file system

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use super::defaults::DEFAULT_CONFIG_PATH;
use super::types::Config;

/// Path of the config file with `~` expanded
pub fn default_config_path() -> PathBuf {
    PathBuf::from(shellexpand::tilde(DEFAULT_CONFIG_PATH).as_ref())
}

/// Load configuration from ~/.clipstack/config.json
///
/// Returns Config::default() if the file is missing or invalid.
pub fn load_config() -> Config {
    load_config_from(&default_config_path())
}

/// Load configuration from an explicit path.
///
/// Never fails: a missing, unreadable or malformed file logs and yields defaults.
#[instrument(name = "load_config", skip_all, fields(path = %path.display()))]
pub fn load_config_from(path: &Path) -> Config {
    if !path.exists() {
        info!("Config file not found, using defaults");
        return Config::default();
    }

    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            warn!(error = %e, "Failed to read config file, using defaults");
            return Config::default();
        }
    };

    match serde_json::from_str::<Config>(&contents) {
        Ok(config) => {
            info!("Successfully loaded config");
            config
        }
        Err(e) => {
            warn!(error = %e, "Failed to parse config JSON, using defaults");
            Config::default()
        }
    }
}
