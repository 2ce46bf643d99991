//! Query result shape.

use uuid::Uuid;

/// A search hit with its reconstructed content.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub neuron_id: Uuid,
    /// Cosine similarity plus the graph-aware rerank boost.
    pub score: f32,
    pub content: String,
    pub source_type: String,
    pub tags: Vec<String>,
}

/// Default `ef` passed to `HnswIndex::search` when the caller doesn't
/// override it; `None` lets the index fall back to its own configured
/// `ef_search`.
pub const DEFAULT_TOP_K: usize = 10;
