//! Serializable index state, persisted by `sg-node` as `index/<name>.json`.

use crate::domain::{HnswNode, HnswParams};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HnswSnapshot {
    pub params: HnswParams,
    pub nodes: HashMap<Uuid, HnswNode>,
    pub layers: HashMap<usize, HashSet<Uuid>>,
    pub entry_point: Option<Uuid>,
    pub max_layer: usize,
    pub tombstones: HashSet<Uuid>,
    pub entry_point_stale: bool,
}

/// Sidecar metadata written alongside a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub node_count: usize,
    pub saved_at: u64,
    pub params: HnswParams,
}

impl HnswSnapshot {
    #[must_use]
    pub fn metadata(&self, saved_at: u64) -> SnapshotMetadata {
        SnapshotMetadata {
            node_count: self.nodes.len(),
            saved_at,
            params: self.params,
        }
    }
}
