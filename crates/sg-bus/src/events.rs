//! # Graph Events
//!
//! The nine event kinds named in spec.md §6, plus the generic `Error`
//! event. Every event carries `{ type, source, timestamp, correlationId?,
//! payload }` in an envelope (`GraphEvent`) around a closed `EventPayload`
//! sum type.

use serde::{Deserialize, Serialize};
use sg_types::Hash;
use uuid::Uuid;

/// The closed set of event type tags. Matches the `subsystem:verb` naming
/// from spec.md §6 (`Display` renders exactly that string).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    NeuronCreated,
    NeuronUpdated,
    NeuronDeleted,
    SynapseFormed,
    LearningProgress,
    LearningComplete,
    SyncStateChanged,
    SyncConflict,
    MemoryCleared,
    Error,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventType::NeuronCreated => "neuron:created",
            EventType::NeuronUpdated => "neuron:updated",
            EventType::NeuronDeleted => "neuron:deleted",
            EventType::SynapseFormed => "synapse:formed",
            EventType::LearningProgress => "learning:progress",
            EventType::LearningComplete => "learning:complete",
            EventType::SyncStateChanged => "sync:state_changed",
            EventType::SyncConflict => "sync:conflict",
            EventType::MemoryCleared => "memory:cleared",
            EventType::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// The payload carried by a `GraphEvent`. One variant per `EventType`,
/// named identically, so `payload.event_type()` is always consistent with
/// the envelope's own `event_type` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    NeuronCreated { neuron_id: Uuid, merkle_root: Hash },
    NeuronUpdated { neuron_id: Uuid },
    NeuronDeleted { neuron_id: Uuid },
    SynapseFormed { synapse_id: Uuid, source_id: Uuid, target_id: Uuid, weight: f32 },
    LearningProgress { operation: String, processed: u64, total: Option<u64> },
    LearningComplete { operation: String, affected: u64 },
    SyncStateChanged { node_id: String, sequence: u64 },
    SyncConflict { entity_id: String, resolution: String },
    MemoryCleared { chunks_removed: u64, tombstones_removed: u64, journal_entries_removed: u64 },
    Error { message: String, source_kind: String },
}

impl EventPayload {
    #[must_use]
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::NeuronCreated { .. } => EventType::NeuronCreated,
            EventPayload::NeuronUpdated { .. } => EventType::NeuronUpdated,
            EventPayload::NeuronDeleted { .. } => EventType::NeuronDeleted,
            EventPayload::SynapseFormed { .. } => EventType::SynapseFormed,
            EventPayload::LearningProgress { .. } => EventType::LearningProgress,
            EventPayload::LearningComplete { .. } => EventType::LearningComplete,
            EventPayload::SyncStateChanged { .. } => EventType::SyncStateChanged,
            EventPayload::SyncConflict { .. } => EventType::SyncConflict,
            EventPayload::MemoryCleared { .. } => EventType::MemoryCleared,
            EventPayload::Error { .. } => EventType::Error,
        }
    }
}

/// The envelope every event is published as.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEvent {
    pub event_type: EventType,
    pub source: String,
    pub timestamp: u64,
    pub correlation_id: Option<Uuid>,
    pub payload: EventPayload,
}

impl GraphEvent {
    #[must_use]
    pub fn new(source: impl Into<String>, timestamp: u64, payload: EventPayload) -> Self {
        Self {
            event_type: payload.event_type(),
            source: source.into(),
            timestamp,
            correlation_id: None,
            payload,
        }
    }

    #[must_use]
    pub fn with_correlation(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

/// Subscription filter: `None` matches every event; `Some(types)` matches
/// only events whose `event_type` is in the list.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub types: Option<Vec<EventType>>,
}

impl EventFilter {
    #[must_use]
    pub fn all() -> Self {
        Self { types: None }
    }

    #[must_use]
    pub fn of_types(types: Vec<EventType>) -> Self {
        Self { types: Some(types) }
    }

    #[must_use]
    pub fn matches(&self, event: &GraphEvent) -> bool {
        match &self.types {
            None => true,
            Some(types) => types.contains(&event.event_type),
        }
    }
}
