//! Lobby session policy layer.
//!
//! Sits on top of a peer-to-peer session provider (the platform) and owns
//! who may mutate what, how roster and metadata are reconciled locally, and
//! how voice frames are captured, buffered, decoded and expired per speaker.
//! Everything runs on the host's tick/callback thread.

pub mod chat;
pub mod loopback;
pub mod marshal;
pub mod membership;
pub mod metadata;
pub mod platform;
pub mod session;
pub mod voice;

pub use chat::{ChatHistory, ChatMessage};
pub use loopback::{LoopbackLobby, LoopbackPlatform, RecordingOutput};
pub use marshal::{event_channel, EventReceiver, EventSender};
pub use membership::{Member, MembershipTracker, RosterDelta, RosterEntry};
pub use metadata::{LobbyInfo, MetadataEntry, MetadataStore};
pub use platform::{LobbyPlatform, LobbyType, PlatformEvent, VoiceOutput};
pub use session::{LobbyObserver, LobbySession, NoopObserver, SessionSettings, SessionState};
pub use voice::{VoiceBuffer, VoiceBufferPool, VoicePipeline};

pub use lobby_common::{AvatarHandle, LobbyError, LobbyId, OutputHandle, Result, UserId};
