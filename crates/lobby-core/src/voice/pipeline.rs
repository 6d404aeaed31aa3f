//! Local capture → compress → send, and receive → decompress → playback.

use lobby_common::UserId;
use tracing::{debug, trace};

use crate::platform::{LobbyPlatform, VoiceOutput};

use super::buffer_pool::VoiceBufferPool;

#[derive(Debug)]
pub struct VoicePipeline {
    pool: VoiceBufferPool,
    enabled: bool,
    volume: f32,
    raw: Vec<i16>,
    compressed: Vec<u8>,
    decoded: Vec<i16>,
}

impl VoicePipeline {
    pub fn new(talk_window: f32, volume: f32) -> Self {
        Self {
            pool: VoiceBufferPool::new(talk_window),
            enabled: false,
            volume: volume.max(0.0),
            raw: Vec::new(),
            compressed: Vec::new(),
            decoded: Vec::new(),
        }
    }

    pub fn pool(&self) -> &VoiceBufferPool {
        &self.pool
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Toggle local capture. Remote audio already queued is unaffected.
    pub fn set_enabled(&mut self, platform: &mut dyn LobbyPlatform, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        platform.set_voice_recording(enabled);
        debug!(enabled, "Voice capture toggled");
    }

    /// Capture whatever the microphone produced and hand it to the platform.
    ///
    /// Returns true when a compressed payload was passed to `send_voice`.
    /// An empty capture touches nothing.
    pub fn capture(&mut self, platform: &mut dyn LobbyPlatform, local: UserId) -> bool {
        if !self.enabled {
            return false;
        }

        self.raw.clear();
        platform.capture_voice(&mut self.raw);
        if self.raw.is_empty() {
            return false;
        }
        self.pool.mark_talking(local);

        self.compressed.clear();
        platform.compress_voice(&self.raw, &mut self.compressed);
        if self.compressed.is_empty() {
            return false;
        }

        if !platform.send_voice(&self.compressed) {
            debug!(bytes = self.compressed.len(), "Voice send not accepted");
        }
        trace!(
            samples = self.raw.len(),
            bytes = self.compressed.len(),
            "Voice frame sent"
        );
        true
    }

    /// Decode one received frame into `sender`'s playback stream.
    ///
    /// The sender does not have to be in the roster; packets may beat the
    /// roster update.
    pub fn receive(
        &mut self,
        platform: &mut dyn LobbyPlatform,
        output: &mut dyn VoiceOutput,
        sender: UserId,
        bytes: &[u8],
    ) {
        let volume = self.volume;
        let buffer = self.pool.mark_talking(sender);

        self.decoded.clear();
        platform.decompress_voice(bytes, &mut self.decoded);
        if self.decoded.is_empty() {
            return;
        }

        let handle = *buffer.output.get_or_insert_with(|| {
            debug!(user_id = %sender, "Creating voice output");
            output.create_output(sender, volume)
        });
        output.queue_samples(handle, &self.decoded);
    }

    pub fn decay(&mut self, dt: f32) {
        self.pool.decay(dt);
    }

    pub fn is_talking(&self, user: UserId) -> bool {
        self.pool.is_talking(user)
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Apply a new volume to every existing and future playback stream.
    pub fn set_volume(&mut self, output: &mut dyn VoiceOutput, volume: f32) {
        self.volume = volume.max(0.0);
        for handle in self.pool.outputs() {
            output.set_volume(handle, self.volume);
        }
    }

    /// Release every playback stream. Returns how many were released.
    pub fn release_outputs(&mut self, output: &mut dyn VoiceOutput) -> usize {
        let handles = self.pool.take_outputs();
        for &handle in &handles {
            output.release(handle);
        }
        handles.len()
    }

    /// Drop all buffers. Callers release outputs first.
    pub fn reset(&mut self) {
        self.pool.clear();
        self.raw.clear();
        self.compressed.clear();
        self.decoded.clear();
    }
}
