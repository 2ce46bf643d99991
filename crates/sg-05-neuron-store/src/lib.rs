//! # Neuron Store
//!
//! Persistence for `Neuron` and `Synapse` records keyed by id, with
//! secondary indexes by Merkle root and by outgoing/incoming edge.

mod domain;
mod service;

pub use domain::{Neuron, NeuronMetadata, Synapse, SynapseMetadata, SynapseType};
pub use service::NeuronStore;
