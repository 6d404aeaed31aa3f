//! Top-level lobby session: lifecycle, tick, and callback dispatch.
//!
//! A session is driven from one thread. Platform callbacks are applied the
//! moment they are handed to [`LobbySession::handle_event`]; the tick only
//! drives time-based work (talk-timer decay, voice capture, the periodic
//! passive refresh).

mod observer;
mod settings;

#[cfg(test)]
mod tests;

pub use observer::{LobbyObserver, NoopObserver};
pub use settings::SessionSettings;

use lobby_common::{LobbyError, LobbyId, Result, UserId};
use tracing::{debug, info, trace, warn};

use crate::chat::{ChatHistory, ChatMessage};
use crate::membership::{Member, MembershipTracker, RosterEntry};
use crate::metadata::{LobbyInfo, MetadataStore};
use crate::platform::{LobbyPlatform, LobbyType, PlatformEvent, VoiceOutput};
use crate::voice::VoicePipeline;

/// Lifecycle of a session. `ShuttingDown` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Active,
    ShuttingDown,
}

pub struct LobbySession<P: LobbyPlatform, O: VoiceOutput> {
    platform: P,
    output: O,
    observer: Box<dyn LobbyObserver>,
    settings: SessionSettings,
    state: SessionState,
    members: MembershipTracker,
    metadata: MetadataStore,
    voice: VoicePipeline,
    chat: ChatHistory,
    member_limit: u32,
    light_mode: bool,
    update_timer: f32,
}

impl<P: LobbyPlatform, O: VoiceOutput> LobbySession<P, O> {
    pub fn new(platform: P, output: O, settings: SessionSettings) -> Self {
        let lobby_id = platform.lobby_id();
        Self {
            metadata: MetadataStore::new(lobby_id)
                .with_request_timeout(settings.update_interval_secs),
            voice: VoicePipeline::new(settings.talk_window_secs, settings.voice_volume),
            chat: ChatHistory::new(settings.chat_history_size),
            light_mode: settings.light_mode,
            platform,
            output,
            observer: Box::new(NoopObserver),
            settings,
            state: SessionState::Uninitialized,
            members: MembershipTracker::new(),
            member_limit: 0,
            update_timer: 0.0,
        }
    }

    /// Register the host's hooks, replacing any previous observer.
    pub fn with_observer(mut self, observer: impl LobbyObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn set_observer(&mut self, observer: impl LobbyObserver + 'static) {
        self.observer = Box::new(observer);
    }

    // -- lifecycle ----------------------------------------------------------

    /// Bind the local identity, pull the initial metadata and roster, and go
    /// `Active`. Only valid once.
    pub fn initialize(&mut self) {
        if self.state != SessionState::Uninitialized {
            warn!(state = ?self.state, "initialize called twice; ignoring");
            return;
        }

        let local = self.platform.local_user();
        self.members.bind_local_user(local);
        self.voice.reset();
        self.metadata.refresh(&mut self.platform, false);
        self.member_limit = self.platform.member_limit();
        self.state = SessionState::Active;
        self.update_member_list();

        if self.settings.voice_enabled_on_join {
            self.voice.set_enabled(&mut self.platform, true);
        }

        info!(
            lobby_id = %self.metadata.info().id,
            user_id = %local,
            members = self.members.len(),
            owner = self.members.is_local_owner(),
            "Lobby session active"
        );
    }

    /// Stop capture, release every playback stream and leave the lobby.
    /// Further calls, and every tick afterwards, do nothing.
    pub fn shutdown(&mut self) {
        match self.state {
            SessionState::ShuttingDown => {
                debug!("shutdown called twice; ignoring");
                return;
            }
            SessionState::Uninitialized => {
                self.voice.set_enabled(&mut self.platform, false);
                self.state = SessionState::ShuttingDown;
                return;
            }
            SessionState::Active => {}
        }

        self.voice.set_enabled(&mut self.platform, false);
        let released = self.voice.release_outputs(&mut self.output);
        self.platform.leave_lobby();
        self.state = SessionState::ShuttingDown;
        info!(released, "Lobby session shut down");
    }

    /// Advance the session by `dt` seconds.
    ///
    /// Talk-timers always decay. Voice capture, the light-tick hook and the
    /// periodic refresh are skipped in light mode. Non-positive and NaN `dt`
    /// are ignored.
    pub fn tick(&mut self, dt: f32) {
        if self.state != SessionState::Active {
            trace!(state = ?self.state, "tick ignored");
            return;
        }
        if !dt.is_finite() || dt <= 0.0 {
            debug!(dt, "Ignoring tick with unusable dt");
            return;
        }

        self.voice.decay(dt);
        self.metadata.age_request(dt);

        if self.light_mode {
            return;
        }

        if let Some(local) = self.members.local_user() {
            self.voice.capture(&mut self.platform, local);
        }
        self.observer.on_light_tick(dt);

        self.update_timer += dt;
        if self.update_timer >= self.settings.update_interval_secs {
            self.update_timer = 0.0;
            self.refresh_lobby_data(true);
            self.update_member_list();
        }
    }

    // -- platform callbacks -------------------------------------------------

    /// Apply every callback the platform has queued. Returns how many.
    pub fn pump_events(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.platform.poll_event() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Apply one platform callback to the local caches.
    pub fn handle_event(&mut self, event: PlatformEvent) {
        if self.state != SessionState::Active {
            debug!(state = ?self.state, ?event, "Dropping platform event outside active session");
            return;
        }

        match event {
            PlatformEvent::RosterChanged => self.update_member_list(),
            PlatformEvent::LobbyDataChanged { member: None } => {
                self.metadata.apply_lobby_update(&self.platform);
                self.member_limit = self.platform.member_limit();
                self.members.set_owner(self.platform.owner());
                self.observer.on_lobby_data_updated(self.metadata.info());
            }
            PlatformEvent::LobbyDataChanged { member: Some(user) } => {
                self.metadata.apply_member_update(&self.platform, user);
                self.observer.on_lobby_data_updated(self.metadata.info());
            }
            PlatformEvent::ChatMessage { sender, bytes } => self.on_chat_message(sender, bytes),
            PlatformEvent::VoicePacket { sender, bytes } => {
                self.voice
                    .receive(&mut self.platform, &mut self.output, sender, &bytes);
            }
        }
    }

    fn on_chat_message(&mut self, sender: UserId, bytes: Vec<u8>) {
        match ChatMessage::new(sender, bytes, self.settings.max_chat_message_bytes) {
            Ok(msg) => {
                self.chat.push(msg.clone());
                self.observer.on_lobby_chat_msg(&msg);
            }
            Err(e) => warn!(user_id = %sender, "Dropping chat message: {e}"),
        }
    }

    /// Re-read the roster and owner from the platform.
    pub fn update_member_list(&mut self) {
        let roster: Vec<RosterEntry> = self
            .platform
            .roster()
            .into_iter()
            .map(|user_id| RosterEntry {
                user_id,
                name: self.platform.member_name(user_id),
                avatar: self.platform.member_avatar(user_id),
            })
            .collect();

        let delta = self.members.reconcile(roster, self.platform.owner());
        self.metadata
            .refresh_members(&self.platform, &self.members.ids());

        if !delta.is_empty() {
            self.observer.on_roster_changed(&delta);
        }
    }

    /// Pull lobby metadata. A non-passive refresh also asks the platform for
    /// fresh data; the answer arrives as `LobbyDataChanged`.
    pub fn refresh_lobby_data(&mut self, passive: bool) {
        self.metadata.refresh(&mut self.platform, passive);
        self.member_limit = self.platform.member_limit();
    }

    // -- queries ------------------------------------------------------------

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn lobby_id(&self) -> LobbyId {
        self.metadata.info().id
    }

    pub fn info(&self) -> &LobbyInfo {
        self.metadata.info()
    }

    pub fn local_user_id(&self) -> Option<UserId> {
        self.members.local_user()
    }

    pub fn owner_id(&self) -> Option<UserId> {
        self.members.owner_id()
    }

    pub fn is_local_owner(&self) -> bool {
        self.members.is_local_owner()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn members(&self) -> &[Member] {
        self.members.members()
    }

    /// 0 means unlimited. Changes only when the platform confirms.
    pub fn lobby_member_limit(&self) -> u32 {
        self.member_limit
    }

    pub fn member_by_index(&self, index: usize) -> Option<&Member> {
        self.members.member_by_index(index)
    }

    pub fn member_index_by_id(&self, user: UserId) -> Option<usize> {
        self.members.member_index_by_id(user)
    }

    pub fn member_by_id_mut(&mut self, user: UserId) -> Option<&mut Member> {
        self.members.member_by_id_mut(user)
    }

    pub fn lobby_data(&self, key: &str) -> &str {
        self.metadata.get(key)
    }

    /// Member metadata by roster index; empty for unknown indices or keys.
    pub fn member_data(&self, index: usize, key: &str) -> &str {
        match self.members.member_by_index(index) {
            Some(member) => self.metadata.member_data(member.user_id, key),
            None => "",
        }
    }

    pub fn is_member_talking(&self, index: usize) -> bool {
        self.members
            .member_by_index(index)
            .is_some_and(|m| self.voice.is_talking(m.user_id))
    }

    pub fn local_talk_timer(&self) -> f32 {
        self.members
            .local_user()
            .map(|id| self.voice.pool().talk_timer(id))
            .unwrap_or(0.0)
    }

    pub fn voice_buffer_count(&self) -> usize {
        self.voice.pool().len()
    }

    pub fn is_voice_chat_enabled(&self) -> bool {
        self.voice.is_enabled()
    }

    pub fn is_light_mode_enabled(&self) -> bool {
        self.light_mode
    }

    pub fn voice_volume(&self) -> f32 {
        self.voice.volume()
    }

    pub fn chat_history(&self) -> &ChatHistory {
        &self.chat
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    // -- mutators -----------------------------------------------------------

    fn ensure_active(&self, operation: &'static str) -> Result<()> {
        if self.state == SessionState::Active {
            Ok(())
        } else {
            debug!(operation, state = ?self.state, "Rejecting call outside active session");
            Err(LobbyError::NotActive { operation })
        }
    }

    /// Owner-only. The cached limit updates once the platform confirms.
    pub fn set_lobby_member_limit(&mut self, limit: u32) -> Result<()> {
        self.ensure_active("set_lobby_member_limit")?;
        self.members.set_member_limit(&mut self.platform, limit)
    }

    /// Owner-only lobby-level write, echoed back through `LobbyDataChanged`.
    pub fn set_lobby_data(&mut self, key: &str, value: &str) -> Result<()> {
        self.ensure_active("set_lobby_data")?;
        let is_owner = self.members.is_local_owner();
        self.metadata.set(&mut self.platform, is_owner, key, value)
    }

    /// Write into the local user's own member data.
    pub fn set_member_data(&mut self, key: &str, value: &str) -> Result<()> {
        self.ensure_active("set_member_data")?;
        self.metadata.set_member_data(&mut self.platform, key, value);
        Ok(())
    }

    /// Owner-only visibility change.
    pub fn set_lobby_type(&mut self, lobby_type: LobbyType) -> Result<()> {
        self.ensure_active("set_lobby_type")?;
        if !self.members.is_local_owner() {
            debug!(?lobby_type, "Ignoring lobby type change from non-owner");
            return Err(LobbyError::NotOwner {
                operation: "set_lobby_type",
            });
        }
        if !self.platform.set_lobby_visibility(lobby_type) {
            debug!(?lobby_type, "Platform did not accept lobby type change");
        }
        Ok(())
    }

    pub fn set_voice_chat_enabled(&mut self, enabled: bool) {
        if self.state == SessionState::ShuttingDown {
            debug!(enabled, "Ignoring voice toggle after shutdown");
            return;
        }
        self.voice.set_enabled(&mut self.platform, enabled);
    }

    pub fn set_voice_volume(&mut self, volume: f32) {
        self.voice.set_volume(&mut self.output, volume);
    }

    pub fn set_light_mode_enabled(&mut self, enabled: bool) {
        if self.light_mode != enabled {
            debug!(enabled, "Light mode toggled");
        }
        self.light_mode = enabled;
    }

    /// Open the platform's friend invite overlay.
    pub fn invite_friends(&mut self) {
        self.platform.open_invite_overlay();
    }

    /// Send an out-of-band chat message to the lobby.
    pub fn send_lobby_chat_msg(&mut self, bytes: &[u8]) -> Result<()> {
        self.ensure_active("send_lobby_chat_msg")?;
        let max = self.settings.max_chat_message_bytes;
        if bytes.len() > max {
            return Err(LobbyError::ChatMessageTooLong {
                len: bytes.len(),
                max,
            });
        }
        if !self.platform.send_chat(bytes) {
            debug!(bytes = bytes.len(), "Platform did not accept chat message");
        }
        Ok(())
    }
}
