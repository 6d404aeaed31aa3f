//! Configuration schema types.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod chat;
mod session;
mod system;
mod voice;

pub use chat::*;
pub use session::*;
pub use system::*;
pub use voice::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for a lobby session.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LobbyConfig {
    pub voice: VoiceConfig,
    pub session: SessionConfig,
    pub chat: ChatConfig,
    pub logging: LoggingConfig,
}
