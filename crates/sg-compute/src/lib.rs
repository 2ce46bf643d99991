//! # Compute
//!
//! Rayon-parallel scan helpers shared across subsystems. `par_top_k` backs
//! the HNSW index's brute-force fallback (exhaustive scan of a tiny or
//! fully-tombstoned layer) and the neuron graph's `auto_connect` candidate
//! scoring, so those call sites don't reach for `rayon` directly.

pub mod tasks;

pub use tasks::top_k::par_top_k;
