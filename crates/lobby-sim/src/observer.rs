//! Observer that narrates session callbacks through `tracing`.

use lobby_core::{ChatMessage, LobbyInfo, LobbyObserver, RosterDelta, UserId};

pub struct LogObserver {
    peer: UserId,
    light_ticks: u64,
}

impl LogObserver {
    pub fn new(peer: UserId) -> Self {
        Self {
            peer,
            light_ticks: 0,
        }
    }
}

impl LobbyObserver for LogObserver {
    fn on_lobby_data_updated(&mut self, info: &LobbyInfo) {
        tracing::debug!(
            peer = %self.peer,
            lobby = %info.name,
            entries = info.metadata.len(),
            "lobby data updated"
        );
    }

    fn on_lobby_chat_msg(&mut self, msg: &ChatMessage) {
        tracing::info!(peer = %self.peer, from = %msg.sender, "chat: {}", msg.text());
    }

    fn on_light_tick(&mut self, _dt: f32) {
        self.light_ticks += 1;
        tracing::trace!(peer = %self.peer, ticks = self.light_ticks, "light tick");
    }

    fn on_roster_changed(&mut self, delta: &RosterDelta) {
        tracing::info!(
            peer = %self.peer,
            joined = ?delta.joined,
            left = ?delta.left,
            "roster changed"
        );
    }
}
