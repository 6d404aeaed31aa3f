//! Runtime knobs for a session, usually derived from `LobbyConfig`.

use lobby_config::LobbyConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub talk_window_secs: f32,
    pub voice_volume: f32,
    pub voice_enabled_on_join: bool,
    pub update_interval_secs: f32,
    pub light_mode: bool,
    pub chat_history_size: usize,
    pub max_chat_message_bytes: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&LobbyConfig::default())
    }
}

impl From<&LobbyConfig> for SessionSettings {
    fn from(config: &LobbyConfig) -> Self {
        Self {
            talk_window_secs: config.voice.talk_window_secs,
            voice_volume: config.voice.volume,
            voice_enabled_on_join: config.voice.enabled_on_join,
            update_interval_secs: config.session.update_interval_secs,
            light_mode: config.session.light_mode,
            chat_history_size: config.chat.history_size as usize,
            max_chat_message_bytes: config.chat.max_message_bytes as usize,
        }
    }
}
