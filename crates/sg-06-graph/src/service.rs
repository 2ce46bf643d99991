//! `NeuronGraph`: the struct every other module in this crate implements
//! methods on. Holds the neuron/synapse store, the HNSW index, and the two
//! injected capabilities (event bus, time source) needed to stamp metadata
//! and report progress.

use sg_01_hasher::Embedding;
use sg_04_hnsw::{HnswIndex, HnswSnapshot};
use sg_05_neuron_store::{Neuron, NeuronStore, Synapse};
use sg_bus::EventPublisher;
use sg_types::{GraphError, Hash, TimeSource};
use std::sync::Arc;
use uuid::Uuid;

/// The name every published `GraphEvent` carries as its `source`.
pub const EVENT_SOURCE: &str = "sg-06-graph";

pub struct NeuronGraph {
    pub(crate) store: NeuronStore,
    pub(crate) index: HnswIndex,
    pub(crate) bus: Arc<dyn EventPublisher>,
    pub(crate) time: Arc<dyn TimeSource>,
}

impl NeuronGraph {
    #[must_use]
    pub fn new(
        store: NeuronStore,
        index: HnswIndex,
        bus: Arc<dyn EventPublisher>,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        Self { store, index, bus, time }
    }

    #[must_use]
    pub fn neuron_count(&self) -> usize {
        self.index.len()
    }

    /// Passthroughs onto the wrapped store/index for the ingestion and
    /// query pipelines, which need raw reads/searches alongside the
    /// higher-level operations the rest of this crate builds on top.
    #[must_use]
    pub fn get_neuron(&self, id: &Uuid) -> Result<Option<Neuron>, GraphError> {
        self.store.get_neuron(id)
    }

    #[must_use]
    pub fn find_by_merkle_root(&self, root: &Hash) -> Result<Option<Uuid>, GraphError> {
        self.store.find_by_merkle_root(root)
    }

    #[must_use]
    pub fn outgoing(&self, id: &Uuid) -> Result<Vec<Synapse>, GraphError> {
        self.store.outgoing(id)
    }

    /// Top-`k` nearest neighbors of `query` by cosine similarity.
    pub fn search_similar(&mut self, query: &Embedding, k: usize, ef: Option<usize>) -> Vec<(Uuid, f32)> {
        self.index.search(query, k, ef)
    }

    /// Physically remove every tombstoned node from the index. Returns the
    /// number reclaimed.
    pub fn compact_index(&mut self) -> usize {
        self.index.compact()
    }

    /// Tombstone a neuron in both the store and the index. The index slot
    /// is reclaimed later by `compact_index`.
    pub fn delete_neuron(&mut self, id: &Uuid) -> Result<(), GraphError> {
        self.store.delete_neuron(id)?;
        self.index.delete(*id)
    }

    /// Snapshot the HNSW index for persistence. The neuron/synapse store
    /// persists itself on every write; the index is the one piece of
    /// state `sg-node` must save explicitly.
    #[must_use]
    pub fn index_snapshot(&self) -> HnswSnapshot {
        self.index.to_snapshot()
    }
}
