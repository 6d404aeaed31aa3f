//! Lobby chat messages and a bounded history of what was received.

use std::collections::VecDeque;

use lobby_common::{LobbyError, Result, UserId};

/// A received or outgoing chat payload, bounded by the transport's limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: UserId,
    payload: Vec<u8>,
}

impl ChatMessage {
    pub fn new(sender: UserId, payload: Vec<u8>, max_len: usize) -> Result<Self> {
        if payload.len() > max_len {
            return Err(LobbyError::ChatMessageTooLong {
                len: payload.len(),
                max: max_len,
            });
        }
        Ok(Self { sender, payload })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.payload
    }

    /// Lossy UTF-8 view; the transport does not guarantee text.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Ring buffer of received messages. Oldest are evicted when full.
#[derive(Debug)]
pub struct ChatHistory {
    capacity: usize,
    messages: VecDeque<ChatMessage>,
}

impl ChatHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            messages: VecDeque::new(),
        }
    }

    pub fn push(&mut self, msg: ChatMessage) {
        if self.messages.len() >= self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(msg);
    }

    /// The most recent `limit` messages, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<&ChatMessage> {
        let skip = self.messages.len().saturating_sub(limit);
        self.messages.iter().skip(skip).collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
