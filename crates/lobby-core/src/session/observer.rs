//! Extension points invoked synchronously by the session.

use crate::chat::ChatMessage;
use crate::membership::RosterDelta;
use crate::metadata::LobbyInfo;

/// Host hooks. Every method defaults to doing nothing.
pub trait LobbyObserver {
    /// Lobby or member metadata was pulled after a platform update.
    fn on_lobby_data_updated(&mut self, _info: &LobbyInfo) {}

    fn on_lobby_chat_msg(&mut self, _msg: &ChatMessage) {}

    /// Runs once per tick while light mode is off.
    fn on_light_tick(&mut self, _dt: f32) {}

    fn on_roster_changed(&mut self, _delta: &RosterDelta) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl LobbyObserver for NoopObserver {}
