//! Session tick configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds between passive metadata/member refreshes. Not counted in light mode.
    pub update_interval_secs: f32,
    /// Start with light mode enabled.
    pub light_mode: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: 1.0,
            light_mode: false,
        }
    }
}
