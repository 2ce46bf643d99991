//! # Event Bus
//!
//! Typed publish/subscribe event bus shared by every subsystem, plus a
//! throttled progress tracker for long-running batch operations. See
//! spec.md §6 for the event catalogue and §5 for the throttling
//! requirement.

pub mod events;
pub mod progress;
pub mod publisher;
pub mod subscriber;

pub use events::{EventFilter, EventPayload, EventType, GraphEvent};
pub use progress::ProgressTracker;
pub use publisher::{EventPublisher, InMemoryEventBus, DEFAULT_CHANNEL_CAPACITY};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Event schema version carried alongside serialized events when crossing
/// a process boundary (e.g. sync transport). Bump when `EventPayload`'s
/// shape changes incompatibly.
pub const PROTOCOL_VERSION: u32 = 1;
