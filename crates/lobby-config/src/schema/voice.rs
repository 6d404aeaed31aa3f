//! Voice chat configuration types.

use serde::{Deserialize, Serialize};

/// Seconds a speaker keeps reading as "talking" after their last voice frame.
pub const DEFAULT_TALK_WINDOW_SECS: f32 = 0.25;

/// Voice chat settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Talk-timer reset value applied on every captured or received frame.
    pub talk_window_secs: f32,
    /// Playback volume applied to every remote speaker.
    pub volume: f32,
    /// Start capturing as soon as the session initializes.
    pub enabled_on_join: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            talk_window_secs: DEFAULT_TALK_WINDOW_SECS,
            volume: 1.0,
            enabled_on_join: false,
        }
    }
}
