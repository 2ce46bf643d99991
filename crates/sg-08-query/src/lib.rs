//! # Query Pipeline
//!
//! Embeds a query, searches the HNSW index, reranks hits by excitatory
//! connectivity within the result set, and reconstructs content from the
//! chunk store.

mod domain;
mod service;

pub use domain::{ScoredChunk, DEFAULT_TOP_K};
pub use service::QueryEngine;
