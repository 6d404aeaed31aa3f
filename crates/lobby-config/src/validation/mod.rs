//! Configuration validation.
//!
//! Validates numeric ranges per section and collects every violation into
//! a single `ConfigError`.

mod helpers;


use crate::schema::LobbyConfig;
use lobby_common::ConfigError;

use helpers::{validate_range, validate_range_f32};

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &LobbyConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_voice(&mut errors, config);
    validate_session(&mut errors, config);
    validate_chat(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_voice(errors: &mut Vec<String>, config: &LobbyConfig) {
    // Lower bound is exclusive.
    if config.voice.talk_window_secs <= 0.0 {
        errors.push(format!(
            "voice.talk_window_secs = {} must be positive",
            config.voice.talk_window_secs
        ));
    }
    validate_range_f32(
        errors,
        "voice.talk_window_secs",
        config.voice.talk_window_secs,
        0.0,
        10.0,
    );
    validate_range_f32(errors, "voice.volume", config.voice.volume, 0.0, 4.0);
}

fn validate_session(errors: &mut Vec<String>, config: &LobbyConfig) {
    validate_range_f32(
        errors,
        "session.update_interval_secs",
        config.session.update_interval_secs,
        0.05,
        3600.0,
    );
}

fn validate_chat(errors: &mut Vec<String>, config: &LobbyConfig) {
    validate_range(errors, "chat.history_size", config.chat.history_size, 1, 10_000);
    validate_range(
        errors,
        "chat.max_message_bytes",
        config.chat.max_message_bytes,
        1,
        65_536,
    );
}
