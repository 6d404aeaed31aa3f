//! Lobby configuration system.
//!
//! TOML-based configuration with validation. Every section uses serde
//! defaults so partial configs work out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use lobby_config::{load_config, config_to_json};
//!
//! let config = load_config().expect("failed to load config");
//! println!("{}", config_to_json(&config));
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    ChatConfig, LobbyConfig, LogLevel, LoggingConfig, SessionConfig, VoiceConfig,
    CONFIG_SCHEMA_VERSION, DEFAULT_TALK_WINDOW_SECS,
};
pub use toml_loader::{create_default_config, default_config_path, load_default, load_from_path};

use lobby_common::ConfigError;

/// Load config from the platform default path and validate it.
pub fn load_config() -> Result<LobbyConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &LobbyConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
