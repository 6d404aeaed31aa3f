//! In-process platform for tests and the simulator.
//!
//! A [`LoopbackLobby`] plays the session provider for any number of peers
//! in one process. It enforces the same authority rules as a real provider
//! (only the owner writes lobby-level state, members only write their own
//! data) and delivers callbacks through each peer's event channel.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lobby_common::{AvatarHandle, LobbyId, OutputHandle, UserId};
use tracing::debug;

use crate::marshal::{event_channel, EventReceiver, EventSender};
use crate::platform::{LobbyPlatform, LobbyType, PlatformEvent, VoiceOutput};

// ---------------------------------------------------------------------------
// Shared lobby
// ---------------------------------------------------------------------------

struct PeerSlot {
    user: UserId,
    name: String,
    avatar: Option<AvatarHandle>,
    data: BTreeMap<String, String>,
    inbox: EventSender,
}

struct LobbyState {
    id: LobbyId,
    name: String,
    friend_lobby: bool,
    visibility: LobbyType,
    owner: Option<UserId>,
    member_limit: u32,
    data: BTreeMap<String, String>,
    peers: Vec<PeerSlot>,
}

impl LobbyState {
    fn peer(&self, user: UserId) -> Option<&PeerSlot> {
        self.peers.iter().find(|p| p.user == user)
    }

    fn broadcast(&self, event: PlatformEvent) {
        for peer in &self.peers {
            peer.inbox.send(event.clone());
        }
    }

    fn broadcast_except(&self, skip: UserId, event: PlatformEvent) {
        for peer in self.peers.iter().filter(|p| p.user != skip) {
            peer.inbox.send(event.clone());
        }
    }

    fn is_owner(&self, user: UserId) -> bool {
        self.owner == Some(user)
    }
}

/// Handle to a shared in-process lobby. Cheap to clone.
#[derive(Clone)]
pub struct LoopbackLobby {
    state: Arc<Mutex<LobbyState>>,
}

impl LoopbackLobby {
    pub fn create(id: LobbyId, name: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(LobbyState {
                id,
                name: name.to_string(),
                friend_lobby: false,
                visibility: LobbyType::default(),
                owner: None,
                member_limit: 0,
                data: BTreeMap::new(),
                peers: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LobbyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a peer. The first peer to join owns the lobby. Existing peers are
    /// notified with `RosterChanged`.
    pub fn join(&self, user: UserId, name: &str) -> LoopbackPlatform {
        let (tx, rx) = event_channel();
        let mut state = self.lock();
        state.broadcast(PlatformEvent::RosterChanged);
        state.peers.push(PeerSlot {
            user,
            name: name.to_string(),
            avatar: Some(AvatarHandle::new(user.raw())),
            data: BTreeMap::new(),
            inbox: tx,
        });
        if state.owner.is_none() {
            state.owner = Some(user);
        }
        debug!(user_id = %user, count = state.peers.len(), "Peer joined loopback lobby");
        drop(state);

        LoopbackPlatform {
            lobby: self.clone(),
            user,
            inbox: rx,
            microphone: VecDeque::new(),
            recording: false,
            stats: PlatformStats::default(),
        }
    }

    pub fn set_name(&self, name: &str) {
        self.lock().name = name.to_string();
    }

    pub fn set_friend_lobby(&self, friend: bool) {
        self.lock().friend_lobby = friend;
    }

    pub fn visibility(&self) -> LobbyType {
        self.lock().visibility
    }

    pub fn owner(&self) -> Option<UserId> {
        self.lock().owner
    }

    pub fn member_limit(&self) -> u32 {
        self.lock().member_limit
    }

    pub fn member_count(&self) -> usize {
        self.lock().peers.len()
    }

    /// Inject an event into `user`'s inbox, as a provider callback thread would.
    pub fn inject(&self, user: UserId, event: PlatformEvent) -> bool {
        self.lock()
            .peer(user)
            .map(|p| p.inbox.send(event))
            .unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Per-peer platform
// ---------------------------------------------------------------------------

/// Counters for outbound calls, for assertions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformStats {
    pub voice_sends: usize,
    pub data_requests: usize,
    pub chat_sends: usize,
    pub invites_opened: usize,
    pub leaves: usize,
}

/// One peer's view of a [`LoopbackLobby`].
pub struct LoopbackPlatform {
    lobby: LoopbackLobby,
    user: UserId,
    inbox: EventReceiver,
    microphone: VecDeque<Vec<i16>>,
    recording: bool,
    stats: PlatformStats,
}

impl LoopbackPlatform {
    /// Queue audio for the next `capture_voice` call.
    pub fn feed_microphone(&mut self, samples: Vec<i16>) {
        self.microphone.push_back(samples);
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn stats(&self) -> &PlatformStats {
        &self.stats
    }

    pub fn lobby(&self) -> &LoopbackLobby {
        &self.lobby
    }

    /// The loopback "codec": little-endian PCM.
    pub fn encode(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    pub fn decode(bytes: &[u8], out: &mut Vec<i16>) {
        out.extend(
            bytes
                .chunks_exact(2)
                .map(|pair| i16::from_le_bytes([pair[0], pair[1]])),
        );
    }
}

impl LobbyPlatform for LoopbackPlatform {
    fn local_user(&self) -> UserId {
        self.user
    }

    fn lobby_id(&self) -> LobbyId {
        self.lobby.lock().id
    }

    fn lobby_name(&self) -> String {
        self.lobby.lock().name.clone()
    }

    fn is_friend_lobby(&self) -> bool {
        self.lobby.lock().friend_lobby
    }

    fn roster(&self) -> Vec<UserId> {
        self.lobby.lock().peers.iter().map(|p| p.user).collect()
    }

    fn owner(&self) -> Option<UserId> {
        self.lobby.lock().owner
    }

    fn member_name(&self, user: UserId) -> String {
        self.lobby
            .lock()
            .peer(user)
            .map(|p| p.name.clone())
            .unwrap_or_default()
    }

    fn member_avatar(&self, user: UserId) -> Option<AvatarHandle> {
        self.lobby.lock().peer(user).and_then(|p| p.avatar)
    }

    fn lobby_data_entries(&self) -> Vec<(String, String)> {
        self.lobby
            .lock()
            .data
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn request_lobby_data(&mut self) -> bool {
        self.stats.data_requests += 1;
        self.lobby
            .lock()
            .peer(self.user)
            .map(|p| p.inbox.send(PlatformEvent::LobbyDataChanged { member: None }))
            .unwrap_or(false)
    }

    fn set_lobby_data(&mut self, key: &str, value: &str) -> bool {
        let mut state = self.lobby.lock();
        if !state.is_owner(self.user) {
            return false;
        }
        state.data.insert(key.to_string(), value.to_string());
        state.broadcast(PlatformEvent::LobbyDataChanged { member: None });
        true
    }

    fn member_data_entries(&self, user: UserId) -> Vec<(String, String)> {
        self.lobby
            .lock()
            .peer(user)
            .map(|p| {
                p.data
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn set_member_data(&mut self, key: &str, value: &str) -> bool {
        let mut state = self.lobby.lock();
        let user = self.user;
        let Some(slot) = state.peers.iter_mut().find(|p| p.user == user) else {
            return false;
        };
        slot.data.insert(key.to_string(), value.to_string());
        state.broadcast(PlatformEvent::LobbyDataChanged { member: Some(user) });
        true
    }

    fn member_limit(&self) -> u32 {
        self.lobby.lock().member_limit
    }

    fn set_member_limit(&mut self, limit: u32) -> bool {
        let mut state = self.lobby.lock();
        if !state.is_owner(self.user) {
            return false;
        }
        state.member_limit = limit;
        state.broadcast(PlatformEvent::LobbyDataChanged { member: None });
        true
    }

    fn set_lobby_visibility(&mut self, lobby_type: LobbyType) -> bool {
        let mut state = self.lobby.lock();
        if !state.is_owner(self.user) {
            return false;
        }
        state.visibility = lobby_type;
        true
    }

    fn open_invite_overlay(&mut self) {
        self.stats.invites_opened += 1;
    }

    fn send_chat(&mut self, payload: &[u8]) -> bool {
        self.stats.chat_sends += 1;
        self.lobby.lock().broadcast(PlatformEvent::ChatMessage {
            sender: self.user,
            bytes: payload.to_vec(),
        });
        true
    }

    fn set_voice_recording(&mut self, enabled: bool) {
        self.recording = enabled;
        if !enabled {
            self.microphone.clear();
        }
    }

    fn capture_voice(&mut self, raw: &mut Vec<i16>) {
        if !self.recording {
            return;
        }
        for frame in self.microphone.drain(..) {
            raw.extend_from_slice(&frame);
        }
    }

    fn compress_voice(&mut self, raw: &[i16], out: &mut Vec<u8>) {
        out.extend(Self::encode(raw));
    }

    fn decompress_voice(&mut self, compressed: &[u8], out: &mut Vec<i16>) {
        Self::decode(compressed, out);
    }

    fn send_voice(&mut self, payload: &[u8]) -> bool {
        self.stats.voice_sends += 1;
        self.lobby.lock().broadcast_except(
            self.user,
            PlatformEvent::VoicePacket {
                sender: self.user,
                bytes: payload.to_vec(),
            },
        );
        true
    }

    fn leave_lobby(&mut self) {
        self.stats.leaves += 1;
        let mut state = self.lobby.lock();
        let user = self.user;
        let before = state.peers.len();
        state.peers.retain(|p| p.user != user);
        if state.peers.len() == before {
            return;
        }
        if state.is_owner(user) {
            state.owner = state.peers.first().map(|p| p.user);
        }
        state.broadcast(PlatformEvent::RosterChanged);
        debug!(user_id = %user, "Peer left loopback lobby");
    }

    fn poll_event(&mut self) -> Option<PlatformEvent> {
        self.inbox.try_next()
    }
}

// ---------------------------------------------------------------------------
// Audio output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct StreamRecord {
    speaker: UserId,
    volume: f32,
    samples_queued: usize,
    released: bool,
}

/// [`VoiceOutput`] that records what it was asked to do.
#[derive(Debug, Default)]
pub struct RecordingOutput {
    next_handle: u64,
    streams: HashMap<OutputHandle, StreamRecord>,
    release_calls: usize,
}

impl RecordingOutput {
    pub fn created(&self) -> usize {
        self.streams.len()
    }

    pub fn release_calls(&self) -> usize {
        self.release_calls
    }

    pub fn live(&self) -> usize {
        self.streams.values().filter(|s| !s.released).count()
    }

    pub fn speaker(&self, output: OutputHandle) -> Option<UserId> {
        self.streams.get(&output).map(|s| s.speaker)
    }

    pub fn volume(&self, output: OutputHandle) -> Option<f32> {
        self.streams.get(&output).map(|s| s.volume)
    }

    pub fn samples_queued(&self, output: OutputHandle) -> usize {
        self.streams
            .get(&output)
            .map(|s| s.samples_queued)
            .unwrap_or(0)
    }
}

impl VoiceOutput for RecordingOutput {
    fn create_output(&mut self, speaker: UserId, volume: f32) -> OutputHandle {
        self.next_handle += 1;
        let handle = OutputHandle::new(self.next_handle);
        self.streams.insert(
            handle,
            StreamRecord {
                speaker,
                volume,
                samples_queued: 0,
                released: false,
            },
        );
        handle
    }

    fn queue_samples(&mut self, output: OutputHandle, samples: &[i16]) {
        if let Some(stream) = self.streams.get_mut(&output) {
            stream.samples_queued += samples.len();
        }
    }

    fn set_volume(&mut self, output: OutputHandle, volume: f32) {
        if let Some(stream) = self.streams.get_mut(&output) {
            stream.volume = volume;
        }
    }

    fn release(&mut self, output: OutputHandle) {
        self.release_calls += 1;
        if let Some(stream) = self.streams.get_mut(&output) {
            stream.released = true;
        }
    }
}
