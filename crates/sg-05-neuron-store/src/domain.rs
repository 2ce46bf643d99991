//! Neuron and synapse entities.

use serde::{Deserialize, Serialize};
use sg_01_hasher::Embedding;
use sg_types::Hash;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuronMetadata {
    pub created_at: u64,
    pub updated_at: u64,
    pub last_accessed: u64,
    pub access_count: u64,
    pub source_type: String,
    pub tags: Vec<String>,
}

/// Content-addressed document node: one normalized vector, a set of chunk
/// hashes, a Merkle root over those chunks, and metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neuron {
    pub id: Uuid,
    pub embedding: Embedding,
    pub chunk_hashes: Vec<Hash>,
    pub merkle_root: Hash,
    pub outgoing_synapses: Vec<Uuid>,
    pub incoming_synapses: Vec<Uuid>,
    pub metadata: NeuronMetadata,
}

/// Closed sum type of synapse kinds. Excitatory types carry `weight ∈ [0,
/// 1]`; `Inhibitory` carries `weight ∈ [-1, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SynapseType {
    Semantic,
    Causal,
    Temporal,
    Associative,
    Inhibitory,
}

impl SynapseType {
    #[must_use]
    pub fn is_excitatory(self) -> bool {
        !matches!(self, SynapseType::Inhibitory)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynapseMetadata {
    pub created_at: u64,
    pub updated_at: u64,
    pub activation_count: u64,
    pub last_activated: Option<u64>,
    pub bidirectional: bool,
}

/// Typed, weighted directed edge between two neurons. A bidirectional
/// synapse conceptually couples source->target and target->source but is
/// stored once with the flag set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Synapse {
    pub id: Uuid,
    pub source_id: Uuid,
    pub target_id: Uuid,
    pub synapse_type: SynapseType,
    pub weight: f32,
    pub metadata: SynapseMetadata,
}
