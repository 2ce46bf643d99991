//! # HNSW Index
//!
//! Approximate nearest-neighbor search over L2-normalized embeddings via a
//! Hierarchical Navigable Small World graph: greedy descent on upper
//! layers, beam search on layer 0, soft-delete with lazy compaction.

mod domain;
mod index;
mod snapshot;

pub use domain::{HnswNode, HnswParams};
pub use index::HnswIndex;
pub use snapshot::{HnswSnapshot, SnapshotMetadata};
