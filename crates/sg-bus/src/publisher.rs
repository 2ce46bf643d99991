//! # Event Publisher
//!
//! `InMemoryEventBus` fans a published `GraphEvent` out to every live
//! subscriber over a `tokio::sync::broadcast` channel.

use crate::events::{EventFilter, GraphEvent};
use crate::subscriber::Subscription;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

/// Default channel capacity: how many events a slow subscriber can lag
/// behind before it starts missing some (`broadcast::error::RecvError::Lagged`).
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Publishes `GraphEvent`s to any number of subscribers.
#[async_trait::async_trait]
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: GraphEvent);
    fn subscribe(&self, filter: EventFilter) -> Subscription;
    fn subscriber_count(&self) -> usize;
}

/// Broadcast-channel backed event bus. One instance is shared (via `Arc`)
/// across every subsystem in a running node.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<GraphEvent>,
    published: AtomicU64,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self {
            sender,
            published: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn events_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.sender.len().max(self.sender.receiver_count())
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl EventPublisher for InMemoryEventBus {
    fn publish(&self, event: GraphEvent) {
        self.published.fetch_add(1, Ordering::Relaxed);
        // No receivers is not an error: events fired before the first
        // subscriber attaches are simply dropped, matching the teacher's
        // fire-and-forget broadcast semantics.
        let _ = self.sender.send(event);
    }

    fn subscribe(&self, filter: EventFilter) -> Subscription {
        Subscription::new(self.sender.subscribe(), filter)
    }

    fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
