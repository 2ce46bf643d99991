//! # Neuron Graph Manager
//!
//! Owns the neuron/synapse store and the HNSW index together, and
//! implements every graph-level operation on top of them: `createNeuron` /
//! `autoConnect`, the five Hebbian learning rules, the four traversal
//! strategies plus `findPath`, `patternComplete`, `encodeEpisode`, and
//! `updateNeuronEmbedding`. Each operation's implementation lives in its
//! own module, all as `impl NeuronGraph` blocks over the single struct
//! defined in `service`.

mod create;
mod domain;
mod embedding;
mod episodic;
mod learning;
mod pattern;
mod service;
#[cfg(test)]
mod test_support;
mod traversal;

pub use domain::{CreateNeuronInput, PruneOptions, PruneReport, TraversalPath, TraversalStrategy, AUTO_CONNECT_NEIGHBORS};
pub use service::NeuronGraph;
