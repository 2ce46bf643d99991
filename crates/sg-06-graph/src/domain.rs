//! Graph-manager domain types: traversal strategy, terminal paths, and the
//! inputs/options for the public operations in `service.rs`.

use serde::{Deserialize, Serialize};
use sg_01_hasher::Embedding;
use uuid::Uuid;

/// The four traversal strategies named in spec.md §4.F.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraversalStrategy {
    Bfs,
    Dfs,
    Weighted,
    RandomWalk,
}

/// A terminal path recorded when traversal hits a leaf (no unvisited
/// excitatory neighbors) or the depth limit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraversalPath {
    pub neurons: Vec<Uuid>,
    pub synapses: Vec<Uuid>,
    pub total_weight: f32,
}

/// Inputs to `createNeuron`. The embedding is already computed upstream
/// (the graph manager itself has no `EmbeddingProvider` dependency).
#[derive(Debug, Clone)]
pub struct CreateNeuronInput {
    pub embedding: Embedding,
    pub chunk_hashes: Vec<sg_types::Hash>,
    pub merkle_root: sg_types::Hash,
    pub source_type: String,
    pub tags: Vec<String>,
    pub auto_connect: bool,
    pub semantic_threshold: f32,
}

impl CreateNeuronInput {
    #[must_use]
    pub fn new(embedding: Embedding, chunk_hashes: Vec<sg_types::Hash>, merkle_root: sg_types::Hash) -> Self {
        Self {
            embedding,
            chunk_hashes,
            merkle_root,
            source_type: "text".to_string(),
            tags: Vec::new(),
            auto_connect: true,
            semantic_threshold: 0.7,
        }
    }
}

/// Options for `pruneSynapses`.
#[derive(Debug, Clone, Copy)]
pub struct PruneOptions {
    pub min_weight: f32,
    pub min_activations: u64,
    pub dry_run: bool,
}

impl Default for PruneOptions {
    fn default() -> Self {
        Self {
            min_weight: 0.05,
            min_activations: 2,
            dry_run: false,
        }
    }
}

/// Report returned by `pruneSynapses`.
#[derive(Debug, Clone, Default)]
pub struct PruneReport {
    pub removed: Vec<Uuid>,
    pub dry_run: bool,
}

/// Fixed neighbor count fetched by `autoConnect`, per spec.md §4.F.
pub const AUTO_CONNECT_NEIGHBORS: usize = 20;
