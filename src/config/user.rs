//! Loading pool configuration from disk.
//!
//! User config location: $XDG_CONFIG_HOME/sentipool/sentipool.toml
//! Fallback: the platform config directory (e.g. ~/.config on Linux).

use std::path::{Path, PathBuf};

use super::PoolConfig;
use crate::error::ConfigError;

/// Returns the path to the user configuration file.
///
/// Returns None if neither $XDG_CONFIG_HOME nor a platform config directory
/// is available.
pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg_config.is_empty() {
            return Some(config_file_in(Path::new(&xdg_config)));
        }
    }
    dirs::config_dir().map(|dir| config_file_in(&dir))
}

fn config_file_in(dir: &Path) -> PathBuf {
    dir.join("sentipool").join("sentipool.toml")
}

/// Load and validate a TOML config file.
pub fn load_config(path: &Path) -> Result<PoolConfig, ConfigError> {
    let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    PoolConfig::from_toml_str(&source)
}

/// Load the user config if it exists, otherwise defaults.
pub fn load_user_config() -> Result<PoolConfig, ConfigError> {
    match user_config_path() {
        Some(path) if path.is_file() => {
            log::debug!(
                target: "sentipool::config",
                "Loading user config from {}",
                path.display()
            );
            load_config(&path)
        }
        _ => Ok(PoolConfig::default()),
    }
}
