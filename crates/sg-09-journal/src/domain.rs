//! Change journal entry shape.

use serde::{Deserialize, Serialize};
use sg_types::VectorClock;
use uuid::Uuid;

/// The kind of entity a change entry describes. Closed: the journal only
/// ever records changes to the two entities the graph persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityType {
    Neuron,
    Synapse,
}

/// The mutation a change entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeOperation {
    Create,
    Update,
    Delete,
}

/// A single append-only journal record. `sequence` is assigned by
/// `ChangeJournal::append`; every other field is supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub sequence: u64,
    pub entity_type: EntityType,
    pub operation: ChangeOperation,
    pub entity_id: Uuid,
    pub data: serde_json::Value,
    pub vector_clock: VectorClock,
    pub timestamp: u64,
    pub node_id: String,
}

/// What a caller supplies to `append`; the journal stamps `sequence`.
#[derive(Debug, Clone)]
pub struct NewChangeEntry {
    pub entity_type: EntityType,
    pub operation: ChangeOperation,
    pub entity_id: Uuid,
    pub data: serde_json::Value,
    pub vector_clock: VectorClock,
    pub timestamp: u64,
    pub node_id: String,
}
