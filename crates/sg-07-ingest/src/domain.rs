//! Ingestion options and outcome shapes.

use sg_05_neuron_store::Neuron;

/// Tunables for a single `ingest` call.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Gate on the merkle-root duplicate shortcut: `>= 1.0` returns the
    /// existing neuron unchanged on an exact content match (spec.md §8's
    /// idempotence law); anything lower always creates a fresh neuron.
    pub dedupe_threshold: f32,
    pub source_type: String,
    pub tags: Vec<String>,
    pub auto_connect: bool,
    pub semantic_threshold: f32,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 64,
            dedupe_threshold: 1.0,
            source_type: "text".to_string(),
            tags: Vec::new(),
            auto_connect: true,
            semantic_threshold: 0.7,
        }
    }
}

/// Default cap on texts processed per `ingest_batch` progress tick, per
/// spec.md §5's "stream batches of ≤ batchSize (default 500-1000)".
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Result of one `ingest` call.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub neuron: Neuron,
    /// `true` if an existing neuron with the same merkle root was
    /// returned instead of creating a new one.
    pub deduped: bool,
    pub synapses_formed: usize,
}

/// Cap on retained per-row errors during `ingest_batch`, per spec.md §5:
/// long batches keep a capped error list and continue when rows are
/// independent, rather than aborting the whole batch on one failure.
pub const MAX_BATCH_ERRORS: usize = 1000;

/// Outcome of `ingest_batch`: the rows that succeeded, plus `(index,
/// message)` for every row that failed, capped at `MAX_BATCH_ERRORS`.
#[derive(Debug, Clone, Default)]
pub struct BatchIngestReport {
    pub outcomes: Vec<IngestOutcome>,
    pub errors: Vec<(usize, String)>,
}
