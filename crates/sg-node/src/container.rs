//! Wires every subsystem over a `--data-dir`.
//!
//! Grounded on the teacher's `container::subsystems::SubsystemContainer`:
//! one object that opens every backing store and hands out ready-to-use
//! services, initialized in dependency order. Unlike the teacher's
//! long-lived node process, this container is opened fresh per CLI
//! invocation: every `KeyValueStore`-backed piece (chunks, neurons,
//! journal) persists itself synchronously on every write, so the only
//! state this container must explicitly save before exiting is the
//! in-memory HNSW index, snapshotted to `index/main.json`.

use crate::config::NodeConfig;
use crate::embedding::HashingEmbeddingProvider;
use sg_01_hasher::EmbeddingProvider;
use sg_02_chunk_store::ChunkStore;
use sg_04_hnsw::{HnswIndex, HnswSnapshot};
use sg_05_neuron_store::NeuronStore;
use sg_06_graph::NeuronGraph;
use sg_07_ingest::{IngestOptions, IngestOutcome, IngestPipeline};
use sg_08_query::{QueryEngine, ScoredChunk};
use sg_09_journal::ChangeJournal;
use sg_10_sync::StateSyncManager;
use sg_11_compaction::{CompactionConfig, CompactionScheduler};
use sg_bus::{EventFilter, EventPayload, EventPublisher, GraphEvent, InMemoryEventBus, Subscription, DEFAULT_CHANNEL_CAPACITY};
use sg_telemetry::{
    HistogramTimer, CHUNKS_STORED, COMPACTION_RUNS, EVENT_BUS_MESSAGES_PUBLISHED, HNSW_VECTORS_INDEXED,
    INGEST_DURATION, JOURNAL_ENTRIES_APPENDED, NEURONS_CREATED, QUERY_DURATION, SUBSYSTEM_ERRORS,
    SYNAPSES_FORMED, SYNC_CONFLICTS,
};
use sg_types::{FileBackedKVStore, GraphError, SystemTimeSource, TimeSource};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const INDEX_NAME: &str = "main";

/// `sg_telemetry::register_metrics` errors if called twice against the
/// same process-global registry. `main` registers once on startup, but
/// test binaries and library callers open containers without going
/// through it, so each `open` makes its own attempt, guarded to run at
/// most once per process; a redundant attempt (metrics already
/// registered by `main`) is harmless and ignored.
static METRICS_INIT: std::sync::Once = std::sync::Once::new();

/// Everything a CLI invocation needs: the data directory, the node's
/// persisted config, its identity, and the two capabilities (event bus,
/// clock) injected into every subsystem.
pub struct GraphContainer {
    data_dir: PathBuf,
    config: NodeConfig,
    node_id: String,
    bus: Arc<dyn EventPublisher>,
    time: Arc<dyn TimeSource>,
    embedding: Arc<dyn EmbeddingProvider>,
    /// Drained into `sg-telemetry`'s counters after every operation. A
    /// `Subscription` needs `&mut self` to poll, so it's behind a mutex
    /// even though every other field here is shared read-only.
    metrics_feed: Mutex<Subscription>,
}

impl GraphContainer {
    /// Open (creating if absent) the node rooted at `data_dir`.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, GraphError> {
        METRICS_INIT.call_once(|| {
            let _ = sg_telemetry::register_metrics();
        });
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir).map_err(|e| GraphError::StorageFailure(e.to_string()))?;
        let config = NodeConfig::load_or_init(&data_dir)?;
        let node_id = Self::load_or_assign_node_id(&data_dir)?;
        let bus: Arc<dyn EventPublisher> = Arc::new(InMemoryEventBus::new(DEFAULT_CHANNEL_CAPACITY));
        let metrics_feed = Mutex::new(bus.subscribe(EventFilter::all()));
        Ok(Self {
            data_dir,
            config,
            node_id,
            bus,
            time: Arc::new(SystemTimeSource),
            embedding: Arc::new(HashingEmbeddingProvider),
            metrics_feed,
        })
    }

    /// Drain every event published since the last call and fold it into
    /// the process-global `sg-telemetry` counters (spec.md §9's
    /// `Metrics::render()` surface for the `stats` command).
    fn drain_metrics(&self) {
        let mut feed = self.metrics_feed.lock().unwrap();
        while let Ok(Some(event)) = feed.try_recv() {
            record_event_metric(&event);
        }
    }

    fn load_or_assign_node_id(data_dir: &Path) -> Result<String, GraphError> {
        let path = data_dir.join("node_id");
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(contents.trim().to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let id = Uuid::new_v4().to_string();
                std::fs::write(&path, &id).map_err(|e| GraphError::StorageFailure(e.to_string()))?;
                Ok(id)
            }
            Err(e) => Err(GraphError::StorageFailure(e.to_string())),
        }
    }

    #[must_use]
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    #[must_use]
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn open_chunk_store(&self) -> Result<ChunkStore, GraphError> {
        let store = FileBackedKVStore::open(self.data_dir.join("chunks").join("store.kv"))?;
        Ok(ChunkStore::new(Box::new(store), self.time.clone()))
    }

    fn open_journal(&self) -> Result<ChangeJournal, GraphError> {
        Self::open_journal_at(&self.data_dir)
    }

    fn open_journal_at(data_dir: &Path) -> Result<ChangeJournal, GraphError> {
        let store = FileBackedKVStore::open(data_dir.join("journal").join("store.kv"))?;
        ChangeJournal::new(Box::new(store))
    }

    fn index_path(&self) -> PathBuf {
        self.data_dir.join("index").join(format!("{INDEX_NAME}.json"))
    }

    fn load_index(&self) -> Result<HnswIndex, GraphError> {
        let path = self.index_path();
        match std::fs::read(&path) {
            Ok(bytes) => {
                let snapshot: HnswSnapshot = serde_json::from_slice(&bytes)
                    .map_err(|e| GraphError::StorageFailure(format!("index snapshot: {e}")))?;
                Ok(HnswIndex::from_snapshot(snapshot))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HnswIndex::new(self.config.hnsw_params())),
            Err(e) => Err(GraphError::StorageFailure(e.to_string())),
        }
    }

    fn save_index(&self, graph: &NeuronGraph) -> Result<(), GraphError> {
        let path = self.index_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| GraphError::StorageFailure(e.to_string()))?;
        }
        let snapshot = graph.index_snapshot();
        let bytes = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| GraphError::StorageFailure(format!("index snapshot: {e}")))?;
        std::fs::write(&path, bytes).map_err(|e| GraphError::StorageFailure(e.to_string()))
    }

    fn open_graph(&self) -> Result<NeuronGraph, GraphError> {
        let neuron_store = FileBackedKVStore::open(self.data_dir.join("neurons").join("store.kv"))?;
        let store = NeuronStore::new(Box::new(neuron_store));
        let index = self.load_index()?;
        Ok(NeuronGraph::new(store, index, self.bus.clone(), self.time.clone()))
    }

    /// Ingest one document, persisting the updated index afterward.
    pub fn ingest(&self, text: &str, options: &IngestOptions) -> Result<IngestOutcome, GraphError> {
        let _timer = HistogramTimer::new(&INGEST_DURATION);
        let chunk_store = self.open_chunk_store()?;
        let graph = self.open_graph()?;
        let journal = self.open_journal()?;
        let mut pipeline = IngestPipeline::new(
            chunk_store,
            self.embedding.clone(),
            graph,
            journal,
            self.bus.clone(),
            self.time.clone(),
            self.node_id.clone(),
        );
        let outcome = pipeline.ingest(text, options)?;
        self.save_index(pipeline.graph())?;

        if !outcome.deduped {
            CHUNKS_STORED.inc_by(outcome.neuron.chunk_hashes.len() as f64);
            JOURNAL_ENTRIES_APPENDED.inc();
        }
        HNSW_VECTORS_INDEXED.set(pipeline.graph().neuron_count() as f64);
        self.drain_metrics();
        Ok(outcome)
    }

    /// Search for the `k` nearest neurons to `query_text`.
    pub fn search(&self, query_text: &str, k: usize) -> Result<Vec<ScoredChunk>, GraphError> {
        let _timer = HistogramTimer::new(&QUERY_DURATION);
        let chunk_store = self.open_chunk_store()?;
        let graph = self.open_graph()?;
        let mut engine = QueryEngine::new(chunk_store, self.embedding.clone(), graph);
        let hits = engine.search(query_text, k, Some(self.config.hnsw.ef_search))?;
        self.save_index(engine.graph())?;
        self.drain_metrics();
        Ok(hits)
    }

    /// Recompute the Merkle root over a neuron's chunk hashes and compare
    /// it against the one stored at ingest time.
    pub fn verify(&self, id: Uuid) -> Result<bool, GraphError> {
        let graph = self.open_graph()?;
        let neuron = graph.get_neuron(&id)?.ok_or_else(|| GraphError::NotFound(id.to_string()))?;
        let tree = sg_03_merkle::build_tree(&neuron.chunk_hashes)?;
        Ok(tree.root == neuron.merkle_root)
    }

    /// `true` unless any stored neuron's recomputed root diverges.
    pub fn verify_all(&self) -> Result<Vec<(Uuid, bool)>, GraphError> {
        let ids = self.list_ids()?;
        ids.into_iter().map(|id| self.verify(id).map(|ok| (id, ok))).collect()
    }

    pub fn list_ids(&self) -> Result<Vec<Uuid>, GraphError> {
        let journal = self.open_journal()?;
        let mut seen = std::collections::BTreeSet::new();
        for entry in journal.get_after_sequence(0)? {
            seen.insert(entry.entity_id);
        }
        Ok(seen.into_iter().collect())
    }

    pub fn get_neuron(&self, id: Uuid) -> Result<Option<sg_05_neuron_store::Neuron>, GraphError> {
        let graph = self.open_graph()?;
        graph.get_neuron(&id)
    }

    pub fn stats(&self) -> Result<NodeStats, GraphError> {
        let graph = self.open_graph()?;
        let journal = self.open_journal()?;
        Ok(NodeStats {
            node_id: self.node_id.clone(),
            neuron_count: graph.neuron_count(),
            journal_entries: journal.get_latest_sequence(),
        })
    }

    /// Prometheus text exposition of every `sg-telemetry` counter/gauge/
    /// histogram, for the `stats --metrics` CLI flag.
    pub fn render_metrics(&self) -> Result<String, GraphError> {
        self.drain_metrics();
        sg_telemetry::encode_metrics().map_err(|e| GraphError::StorageFailure(e.to_string()))
    }

    /// One-shot sync against a peer node rooted at `peer_data_dir`: diff
    /// against its journal, apply whatever it's ahead on, and record
    /// anything this node is ahead on as the peer's to pull next time.
    pub fn connect(&self, peer_data_dir: impl Into<PathBuf>) -> Result<sg_10_sync::ApplyReport, GraphError> {
        let peer_data_dir = peer_data_dir.into();
        let peer_journal = Self::open_journal_at(&peer_data_dir)?;
        let peer_node_id = Self::load_or_assign_node_id(&peer_data_dir)?;

        let journal = self.open_journal()?;
        let mut manager = StateSyncManager::new(self.node_id.clone(), journal, self.bus.clone(), self.time.clone());

        let peer_descriptor = sg_10_sync::PeerDescriptor::new(peer_node_id, "local".to_string());
        let remote_entries = peer_journal.get_after_sequence(0)?;
        manager.upsert_peer(peer_descriptor);

        let report = manager.apply_remote_changes(remote_entries)?;
        JOURNAL_ENTRIES_APPENDED.inc_by(report.applied.len() as f64);
        self.drain_metrics();
        Ok(report)
    }

    /// Build a scheduler for background compaction. Callers decide
    /// whether to `run_once` synchronously or `spawn` it.
    pub fn compaction_scheduler(&self, config: CompactionConfig) -> Result<CompactionScheduler, GraphError> {
        let chunk_store = self.open_chunk_store()?;
        let graph = self.open_graph()?;
        let journal = self.open_journal()?;
        Ok(CompactionScheduler::new(chunk_store, graph, journal, self.bus.clone(), self.time.clone(), config))
    }

    /// Run one compaction pass synchronously, for the `compact` CLI command.
    pub fn compact_once(&self) -> Result<sg_11_compaction::CompactionReport, GraphError> {
        let report = self.compaction_scheduler(CompactionConfig::default())?.run_once()?;
        self.drain_metrics();
        Ok(report)
    }
}

/// Fold one bus event into the matching `sg-telemetry` counter. Durations
/// and counts the container already knows exactly (chunks stored, index
/// size, journal appends from `connect`) are recorded directly at their
/// call sites instead, so this only covers what's cheaper to read off the
/// event stream than to thread through every call.
fn record_event_metric(event: &GraphEvent) {
    match &event.payload {
        EventPayload::NeuronCreated { .. } => NEURONS_CREATED.inc(),
        EventPayload::SynapseFormed { .. } => SYNAPSES_FORMED.inc(),
        EventPayload::SyncConflict { resolution, .. } => {
            SYNC_CONFLICTS.with_label_values(&[resolution]).inc();
        }
        EventPayload::MemoryCleared { .. } => COMPACTION_RUNS.inc(),
        EventPayload::Error { source_kind, .. } => {
            SUBSYSTEM_ERRORS.with_label_values(&[source_kind, "error"]).inc();
        }
        _ => {}
    }
    EVENT_BUS_MESSAGES_PUBLISHED.with_label_values(&[&event.event_type.to_string()]).inc();
}

#[derive(Debug, Clone)]
pub struct NodeStats {
    pub node_id: String,
    pub neuron_count: usize,
    pub journal_entries: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_the_data_dir_layout() {
        let dir = tempfile::tempdir().unwrap();
        let container = GraphContainer::open(dir.path()).unwrap();
        assert!(dir.path().join("config.json").exists());
        assert!(dir.path().join("node_id").exists());
        assert_eq!(container.stats().unwrap().neuron_count, 0);
    }

    #[test]
    fn ingest_then_search_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let container = GraphContainer::open(dir.path()).unwrap();
        let outcome = container.ingest("hello there, synaptic graph", &IngestOptions::default()).unwrap();
        assert!(!outcome.deduped);

        let hits = container.search("hello there", 5).unwrap();
        assert!(!hits.is_empty());
    }

    #[test]
    fn verify_passes_for_a_freshly_ingested_neuron() {
        let dir = tempfile::tempdir().unwrap();
        let container = GraphContainer::open(dir.path()).unwrap();
        let outcome = container.ingest("verifiable content", &IngestOptions::default()).unwrap();
        assert!(container.verify(outcome.neuron.id).unwrap());
    }

    #[test]
    fn render_metrics_reports_event_derived_counters() {
        let dir = tempfile::tempdir().unwrap();
        let container = GraphContainer::open(dir.path()).unwrap();
        container.ingest("metrics round trip", &IngestOptions::default()).unwrap();
        let text = container.render_metrics().unwrap();
        assert!(text.contains("sg_graph_neurons_created_total"));
    }

    #[test]
    fn compact_once_runs_without_error_on_an_empty_graph() {
        let dir = tempfile::tempdir().unwrap();
        let container = GraphContainer::open(dir.path()).unwrap();
        let report = container.compact_once().unwrap();
        assert!(report.ran);
    }

    #[test]
    fn index_snapshot_survives_a_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let container = GraphContainer::open(dir.path()).unwrap();
            container.ingest("persisted across reopen", &IngestOptions::default()).unwrap().neuron.id
        };
        let reopened = GraphContainer::open(dir.path()).unwrap();
        assert_eq!(reopened.stats().unwrap().neuron_count, 1);
        assert!(reopened.get_neuron(id).unwrap().is_some());
    }
}
