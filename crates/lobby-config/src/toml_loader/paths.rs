//! Where the lobby config lives, and writing the commented default.

use lobby_common::ConfigError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::template::default_config_toml;

const APP_DIR: &str = "lobby";
const FILE_NAME: &str = "config.toml";

/// `<platform config dir>/lobby/config.toml`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(FILE_NAME))
        .ok_or_else(|| ConfigError::ParseError("no platform config directory".into()))
}

/// Write the commented default config to `path`, creating parent
/// directories. An existing file is left untouched.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        debug!("config already present at {}, not overwriting", path.display());
        return Ok(());
    }

    let io_err = |what: &str, target: &Path, e: std::io::Error| {
        ConfigError::ParseError(format!("{what} {}: {e}", target.display()))
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| io_err("cannot create config directory", parent, e))?;
    }
    std::fs::write(path, default_config_toml())
        .map_err(|e| io_err("cannot write default config to", path, e))?;

    info!("wrote default config to {}", path.display());
    Ok(())
}
