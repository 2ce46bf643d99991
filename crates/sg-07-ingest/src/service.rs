//! Ingestion pipeline: the eight-step `ingest` sequence, plus a
//! throttled-progress `ingest_batch` wrapper.
//!
//! Grounded on the teacher's `node-runtime::handlers::choreography`
//! sequencing style: a fixed, documented step order with no internal
//! concurrency across steps.

use crate::domain::{BatchIngestReport, IngestOptions, IngestOutcome, MAX_BATCH_ERRORS};
use sg_01_hasher::EmbeddingProvider;
use sg_02_chunk_store::{chunk_text, ChunkStore};
use sg_03_merkle::build_tree;
use sg_05_neuron_store::Neuron;
use sg_06_graph::{CreateNeuronInput, NeuronGraph};
use sg_09_journal::{ChangeJournal, ChangeOperation, EntityType, NewChangeEntry};
use sg_bus::{EventPublisher, ProgressTracker};
use sg_types::{GraphError, TimeSource, VectorClock};
use std::sync::Arc;
use std::time::Duration;

pub const EVENT_SOURCE: &str = "sg-07-ingest";
const PROGRESS_MIN_INTERVAL: Duration = Duration::from_millis(250);

/// Owns every capability the ingestion pipeline touches: the chunk
/// store, the neuron graph, the change journal, and the injected
/// embedding provider. Each `ingest` call runs the eight steps in
/// spec.md §4.G's order, with no internal fan-out.
pub struct IngestPipeline {
    chunk_store: ChunkStore,
    embedding: Arc<dyn EmbeddingProvider>,
    graph: NeuronGraph,
    journal: ChangeJournal,
    bus: Arc<dyn EventPublisher>,
    time: Arc<dyn TimeSource>,
    node_id: String,
    clock: VectorClock,
}

impl IngestPipeline {
    #[must_use]
    pub fn new(
        chunk_store: ChunkStore,
        embedding: Arc<dyn EmbeddingProvider>,
        graph: NeuronGraph,
        journal: ChangeJournal,
        bus: Arc<dyn EventPublisher>,
        time: Arc<dyn TimeSource>,
        node_id: impl Into<String>,
    ) -> Self {
        Self {
            chunk_store,
            embedding,
            graph,
            journal,
            bus,
            time,
            node_id: node_id.into(),
            clock: VectorClock::new(),
        }
    }

    #[must_use]
    pub fn graph(&self) -> &NeuronGraph {
        &self.graph
    }

    #[must_use]
    pub fn graph_mut(&mut self) -> &mut NeuronGraph {
        &mut self.graph
    }

    #[must_use]
    pub fn journal(&self) -> &ChangeJournal {
        &self.journal
    }

    /// 1. chunk the text, 2. store each piece, 3. embed the whole text,
    /// 4. build the merkle tree over the chunk hashes, 5. short-circuit
    /// on an exact merkle-root duplicate, 6. create + index + auto-connect
    /// the neuron, 7. append a journal entry, 8. publish events (already
    /// done inside `NeuronGraph::create_neuron`/`auto_connect`).
    pub fn ingest(&mut self, text: &str, options: &IngestOptions) -> Result<IngestOutcome, GraphError> {
        if text.is_empty() {
            return Err(GraphError::EmptyInput("ingest: empty text".into()));
        }

        let pieces = chunk_text(text, options.chunk_size, options.chunk_overlap);
        let mut chunk_hashes = Vec::with_capacity(pieces.len());
        for piece in &pieces {
            chunk_hashes.push(self.chunk_store.put(piece.into_bytes())?);
        }

        let embedding = self.embedding.embed(text)?;
        let merkle_root = build_tree(&chunk_hashes)?.root;

        if options.dedupe_threshold >= 1.0 {
            if let Some(existing_id) = self.graph.find_by_merkle_root(&merkle_root)? {
                let neuron = self.graph.get_neuron(&existing_id)?.ok_or_else(|| {
                    GraphError::IntegrityViolation(format!(
                        "merkle index points at missing neuron {existing_id}"
                    ))
                })?;
                return Ok(IngestOutcome { neuron, deduped: true, synapses_formed: 0 });
            }
        }

        let mut input = CreateNeuronInput::new(embedding, chunk_hashes, merkle_root);
        input.source_type = options.source_type.clone();
        input.tags = options.tags.clone();
        input.auto_connect = options.auto_connect;
        input.semantic_threshold = options.semantic_threshold;

        let neuron = self.graph.create_neuron(input)?;
        let synapses_formed = self.graph.outgoing(&neuron.id)?.len();

        self.append_create_entry(&neuron)?;

        Ok(IngestOutcome { neuron, deduped: false, synapses_formed })
    }

    fn append_create_entry(&mut self, neuron: &Neuron) -> Result<(), GraphError> {
        let now = self.time.now_millis();
        self.clock.tick(&self.node_id);
        let data = serde_json::to_value(neuron).map_err(|e| GraphError::StorageFailure(e.to_string()))?;
        self.journal.append(NewChangeEntry {
            entity_type: EntityType::Neuron,
            operation: ChangeOperation::Create,
            entity_id: neuron.id,
            data,
            vector_clock: self.clock.clone(),
            timestamp: now,
            node_id: self.node_id.clone(),
        })?;
        Ok(())
    }

    /// Ingest every text in `texts`, emitting a throttled `learning:progress`
    /// event every `batch_size` rows (and unconditionally at the end), per
    /// spec.md §5's batched-streaming requirement. A failing row is recorded
    /// in the report's capped error list rather than aborting the batch,
    /// since rows are independent.
    pub fn ingest_batch(
        &mut self,
        texts: &[String],
        options: &IngestOptions,
        batch_size: usize,
    ) -> BatchIngestReport {
        let batch_size = batch_size.max(1);
        let tracker = ProgressTracker::new(
            self.bus.clone(),
            self.time.clone(),
            EVENT_SOURCE,
            "ingest_batch",
            PROGRESS_MIN_INTERVAL,
        );
        let mut report = BatchIngestReport::default();

        for (i, text) in texts.iter().enumerate() {
            match self.ingest(text, options) {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(e) if report.errors.len() < MAX_BATCH_ERRORS => {
                    report.errors.push((i, e.to_string()));
                }
                Err(_) => {}
            }
            if (i + 1) % batch_size == 0 || i + 1 == texts.len() {
                tracker.tick((i + 1) as u64, Some(texts.len() as u64));
            }
        }

        tracker.finish(report.outcomes.len() as u64);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sg_01_hasher::Embedding;
    use sg_04_hnsw::{HnswIndex, HnswParams};
    use sg_05_neuron_store::NeuronStore;
    use sg_bus::InMemoryEventBus;
    use sg_types::InMemoryKVStore;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct FakeTime(AtomicU64);
    impl TimeSource for FakeTime {
        fn now_millis(&self) -> u64 {
            self.0.fetch_add(1, Ordering::Relaxed)
        }
    }

    /// Deterministic stand-in: hashes the text's length into a fixed unit
    /// vector so repeated ingests of identical text embed identically.
    struct StubEmbedder;
    impl EmbeddingProvider for StubEmbedder {
        fn embed(&self, text: &str) -> Result<Embedding, GraphError> {
            if text.is_empty() {
                return Err(GraphError::EmptyInput("empty".into()));
            }
            let seed = (text.len() % 7) as f32;
            let v = vec![seed + 1.0, 1.0, 0.5];
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            Ok(v.iter().map(|x| x / norm).collect())
        }
    }

    fn pipeline() -> IngestPipeline {
        let time: Arc<dyn TimeSource> = Arc::new(FakeTime(AtomicU64::new(1)));
        let chunk_store = ChunkStore::new(Box::new(InMemoryKVStore::new()), time.clone());
        let graph = NeuronGraph::new(
            NeuronStore::new(Box::new(InMemoryKVStore::new())),
            HnswIndex::with_seed(HnswParams::default(), 7),
            Arc::new(InMemoryEventBus::default()),
            time.clone(),
        );
        let journal = ChangeJournal::new(Box::new(InMemoryKVStore::new())).unwrap();
        IngestPipeline::new(
            chunk_store,
            Arc::new(StubEmbedder),
            graph,
            journal,
            Arc::new(InMemoryEventBus::default()),
            time,
            "n1",
        )
    }

    #[test]
    fn ingest_creates_neuron_and_journal_entry() {
        let mut pipeline = pipeline();
        let outcome = pipeline.ingest("hello world", &IngestOptions::default()).unwrap();
        assert!(!outcome.deduped);
        assert_eq!(pipeline.journal().get_latest_sequence(), 1);

        let entries = pipeline.journal().get_by_entity(outcome.neuron.id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].operation, ChangeOperation::Create);
    }

    #[test]
    fn ingesting_identical_text_twice_dedupes_by_merkle_root() {
        let mut pipeline = pipeline();
        let first = pipeline.ingest("same text", &IngestOptions::default()).unwrap();
        let second = pipeline.ingest("same text", &IngestOptions::default()).unwrap();

        assert!(!first.deduped);
        assert!(second.deduped);
        assert_eq!(first.neuron.id, second.neuron.id);
        assert_eq!(pipeline.journal().get_latest_sequence(), 1);
    }

    #[test]
    fn dedupe_threshold_below_one_always_creates_fresh_neuron() {
        let mut pipeline = pipeline();
        let mut options = IngestOptions::default();
        options.dedupe_threshold = 0.0;
        let first = pipeline.ingest("same text", &options).unwrap();
        let second = pipeline.ingest("same text", &options).unwrap();
        assert_ne!(first.neuron.id, second.neuron.id);
    }

    #[test]
    fn ingest_batch_reports_per_row_errors_without_aborting() {
        let mut pipeline = pipeline();
        let texts = vec!["a".to_string(), String::new(), "b".to_string()];
        let report = pipeline.ingest_batch(&texts, &IngestOptions::default(), 2);
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].0, 1);
    }
}
