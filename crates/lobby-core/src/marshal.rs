//! Hand-off of platform callbacks onto the owning thread.
//!
//! Platforms that raise callbacks from their own threads push them through an
//! [`EventSender`]; the thread that owns the session drains the matching
//! [`EventReceiver`] between ticks.

use tokio::sync::mpsc;

use crate::platform::PlatformEvent;

/// Create a connected sender/receiver pair.
pub fn event_channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, EventReceiver { rx })
}

/// Cloneable, `Send` half used by platform callback threads.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<PlatformEvent>,
}

impl EventSender {
    /// Queue an event. Returns false once the receiver is gone.
    pub fn send(&self, event: PlatformEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Owning-thread half.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<PlatformEvent>,
}

impl EventReceiver {
    /// Next queued event without blocking.
    pub fn try_next(&mut self) -> Option<PlatformEvent> {
        self.rx.try_recv().ok()
    }

    /// Drain everything queued right now.
    pub fn drain(&mut self) -> Vec<PlatformEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.try_next() {
            events.push(event);
        }
        events
    }
}
