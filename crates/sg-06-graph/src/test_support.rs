//! Shared test fixtures, gated on `#[cfg(test)]` by the `mod` declaration
//! in `lib.rs`.

use crate::service::NeuronGraph;
use sg_04_hnsw::{HnswIndex, HnswParams};
use sg_05_neuron_store::NeuronStore;
use sg_bus::InMemoryEventBus;
use sg_types::{InMemoryKVStore, TimeSource};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonically increasing fake clock so tests get deterministic,
/// strictly ordered timestamps without depending on wall-clock time.
pub struct FakeTimeSource(AtomicU64);

impl FakeTimeSource {
    #[must_use]
    pub fn new() -> Self {
        Self(AtomicU64::new(1))
    }
}

impl TimeSource for FakeTimeSource {
    fn now_millis(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

#[must_use]
pub fn test_graph() -> NeuronGraph {
    let store = NeuronStore::new(Box::new(InMemoryKVStore::new()));
    let index = HnswIndex::with_seed(HnswParams::default(), 42);
    let bus = Arc::new(InMemoryEventBus::default());
    let time = Arc::new(FakeTimeSource::new());
    NeuronGraph::new(store, index, bus, time)
}
