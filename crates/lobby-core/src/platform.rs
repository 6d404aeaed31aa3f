//! The platform seam: capabilities consumed from the session provider and
//! the audio collaborator, plus the events the provider raises into us.
//!
//! None of these calls block. Requests that replicate (lobby data, member
//! data, limits) return immediately and are confirmed later by a
//! [`PlatformEvent`]. A `false` return only means the request was not
//! dispatched; there is no retry at this layer.

use lobby_common::{AvatarHandle, LobbyId, OutputHandle, UserId};
use serde::{Deserialize, Serialize};

/// Lobby visibility as understood by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LobbyType {
    Private,
    FriendsOnly,
    #[default]
    Public,
    Invisible,
}

/// Callbacks raised by the platform. They may arrive between ticks and are
/// applied immediately by [`crate::LobbySession::handle_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    /// Someone joined or left; re-read the roster.
    RosterChanged,
    /// Lobby-level data changed (`member: None`) or one member's data did.
    LobbyDataChanged { member: Option<UserId> },
    /// Out-of-band lobby chat.
    ChatMessage { sender: UserId, bytes: Vec<u8> },
    /// A compressed voice frame from another peer.
    VoicePacket { sender: UserId, bytes: Vec<u8> },
}

/// Lobby membership, key-value replication and voice transport.
pub trait LobbyPlatform {
    fn local_user(&self) -> UserId;
    fn lobby_id(&self) -> LobbyId;
    fn lobby_name(&self) -> String;
    fn is_friend_lobby(&self) -> bool;

    /// Current members in platform order.
    fn roster(&self) -> Vec<UserId>;
    fn owner(&self) -> Option<UserId>;
    fn member_name(&self, user: UserId) -> String;
    fn member_avatar(&self, user: UserId) -> Option<AvatarHandle>;

    /// Locally replicated copy of the lobby-level key/value pairs.
    fn lobby_data_entries(&self) -> Vec<(String, String)>;
    /// Ask the platform for a fresh copy; answered by `LobbyDataChanged { member: None }`.
    fn request_lobby_data(&mut self) -> bool;
    /// Replicated write into the lobby namespace. The platform ignores non-owners.
    fn set_lobby_data(&mut self, key: &str, value: &str) -> bool;

    fn member_data_entries(&self, user: UserId) -> Vec<(String, String)>;
    /// Replicated write into the local user's own member namespace.
    fn set_member_data(&mut self, key: &str, value: &str) -> bool;

    /// 0 means unlimited.
    fn member_limit(&self) -> u32;
    fn set_member_limit(&mut self, limit: u32) -> bool;
    fn set_lobby_visibility(&mut self, lobby_type: LobbyType) -> bool;

    fn open_invite_overlay(&mut self);
    fn send_chat(&mut self, payload: &[u8]) -> bool;

    fn set_voice_recording(&mut self, enabled: bool);
    /// Append whatever raw audio is available since the last call.
    fn capture_voice(&mut self, raw: &mut Vec<i16>);
    fn compress_voice(&mut self, raw: &[i16], out: &mut Vec<u8>);
    fn decompress_voice(&mut self, compressed: &[u8], out: &mut Vec<i16>);
    fn send_voice(&mut self, payload: &[u8]) -> bool;

    fn leave_lobby(&mut self);

    /// Next pending callback, if any. Never blocks.
    fn poll_event(&mut self) -> Option<PlatformEvent>;
}

/// Per-speaker playback owned by the audio collaborator.
pub trait VoiceOutput {
    fn create_output(&mut self, speaker: UserId, volume: f32) -> OutputHandle;
    fn queue_samples(&mut self, output: OutputHandle, samples: &[i16]);
    fn set_volume(&mut self, output: OutputHandle, volume: f32);
    fn release(&mut self, output: OutputHandle);
}
