//! Voice buffers keyed by speaker, with decaying talk-timers.

use std::collections::HashMap;

use lobby_common::{OutputHandle, UserId};

/// Residue below this counts as expired, so summed tick deltas that equal
/// the window in real time expire it despite float rounding.
const TIMER_EPSILON: f32 = 1e-6;

/// State for one identity that has talked during the session.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceBuffer {
    pub user_id: UserId,
    /// Playback stream, created on the first decoded frame.
    pub output: Option<OutputHandle>,
    /// Seconds until the speaker reads as silent.
    pub talk_timer: f32,
}

impl VoiceBuffer {
    fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            output: None,
            talk_timer: 0.0,
        }
    }

    pub fn is_talking(&self) -> bool {
        self.talk_timer > 0.0
    }
}

/// At most one buffer per identity. Entries live for the whole session;
/// the timer is the only liveness signal.
#[derive(Debug)]
pub struct VoiceBufferPool {
    talk_window: f32,
    buffers: HashMap<UserId, VoiceBuffer>,
}

impl VoiceBufferPool {
    pub fn new(talk_window: f32) -> Self {
        Self {
            talk_window,
            buffers: HashMap::new(),
        }
    }

    pub fn get(&self, user: UserId) -> Option<&VoiceBuffer> {
        self.buffers.get(&user)
    }

    pub fn get_or_insert(&mut self, user: UserId) -> &mut VoiceBuffer {
        self.buffers
            .entry(user)
            .or_insert_with(|| VoiceBuffer::new(user))
    }

    /// Reset `user`'s timer to the full window, creating the buffer if needed.
    pub fn mark_talking(&mut self, user: UserId) -> &mut VoiceBuffer {
        let window = self.talk_window;
        let buffer = self.get_or_insert(user);
        buffer.talk_timer = window;
        buffer
    }

    /// Count every timer down by `dt`, stopping at zero.
    pub fn decay(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        for buffer in self.buffers.values_mut() {
            if buffer.talk_timer > 0.0 {
                let left = buffer.talk_timer - dt;
                buffer.talk_timer = if left <= TIMER_EPSILON { 0.0 } else { left };
            }
        }
    }

    pub fn is_talking(&self, user: UserId) -> bool {
        self.get(user).is_some_and(VoiceBuffer::is_talking)
    }

    pub fn talk_timer(&self, user: UserId) -> f32 {
        self.get(user).map(|b| b.talk_timer).unwrap_or(0.0)
    }

    /// Detach every playback handle, leaving the buffers in place.
    pub fn take_outputs(&mut self) -> Vec<OutputHandle> {
        self.buffers
            .values_mut()
            .filter_map(|b| b.output.take())
            .collect()
    }

    pub fn outputs(&self) -> impl Iterator<Item = OutputHandle> + '_ {
        self.buffers.values().filter_map(|b| b.output)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffers.clear();
    }
}
