//! HNSW parameters and node shape.

use serde::{Deserialize, Serialize};
use sg_01_hasher::Embedding;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Index-wide tuning knobs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HnswParams {
    /// Neighbors installed per node on layers ≥1 (2x on layer 0).
    pub m: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
    /// Layer-assignment normalization factor (`mL` in `floor(-ln(U)*mL)`).
    pub m_l: f64,
}

impl Default for HnswParams {
    fn default() -> Self {
        let m = 16;
        Self {
            m,
            ef_construction: 200,
            ef_search: 50,
            m_l: 1.0 / (m as f64).ln(),
        }
    }
}

/// One node in the graph: an embedding, the layer it was sampled onto, and
/// its per-layer neighbor sets (symmetric on every layer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HnswNode {
    pub id: Uuid,
    pub embedding: Embedding,
    pub layer: usize,
    pub connections: HashMap<usize, HashSet<Uuid>>,
}
