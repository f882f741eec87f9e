//! In-process transition bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`TransitionBus`] fans every detected [`TransitionEvent`] out to any
//! number of host-level observers (analytics, logging, UI badges). It is
//! independent of the notification dispatch queue: observers see every
//! transition, not only the ones that raise a notification.

use reelwatch_core::TransitionEvent;
use tokio::sync::broadcast;

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// Fan-out hub for [`TransitionEvent`]s.
pub struct TransitionBus {
    sender: broadcast::Sender<TransitionEvent>,
}

impl TransitionBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed events are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a transition to all current subscribers.
    ///
    /// Events published with no subscribers are silently dropped.
    pub fn publish(&self, event: TransitionEvent) {
        // A SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TransitionEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for TransitionBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
