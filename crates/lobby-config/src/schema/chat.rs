//! Lobby chat configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Received messages retained in history.
    pub history_size: u32,
    /// Largest payload the platform's chat transport accepts.
    pub max_message_bytes: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_size: 100,
            max_message_bytes: 4096,
        }
    }
}
