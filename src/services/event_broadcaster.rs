//! Event broadcaster for execution lifecycle updates.
//!
//! Uses tokio::sync::broadcast to fan out events to every subscriber.

use tokio::sync::broadcast;

use crate::models::{ExecutionEvent, ExecutionEventMessage};

/// Default capacity for the broadcast channel.
const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Distributes execution events to all subscribers.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<ExecutionEventMessage>,
}

impl EventBroadcaster {
    /// Create a new EventBroadcaster with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receiver for all future events. Slow receivers observe `Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEventMessage> {
        self.sender.subscribe()
    }

    /// Broadcast an event, returning the number of receivers reached.
    /// Having no subscribers is not an error.
    pub fn send(&self, event: ExecutionEvent) -> usize {
        self.sender
            .send(ExecutionEventMessage::new(event))
            .unwrap_or(0)
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
