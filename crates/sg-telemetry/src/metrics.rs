//! Prometheus metrics for the graph engine's subsystems.
//!
//! Naming convention: `sg_<subsystem>_<metric>_<unit>`.

use lazy_static::lazy_static;
use prometheus::{exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry.
    pub static ref REGISTRY: Registry = Registry::new();

    // -- chunk store ---------------------------------------------------

    pub static ref CHUNKS_STORED: Counter = Counter::new(
        "sg_chunkstore_chunks_stored_total",
        "Total chunks written to the content-addressed store"
    ).expect("metric creation failed");

    pub static ref CHUNKS_GC_RECLAIMED: Counter = Counter::new(
        "sg_chunkstore_chunks_reclaimed_total",
        "Total chunks removed by reference-count garbage collection"
    ).expect("metric creation failed");

    // -- merkle ----------------------------------------------------------

    pub static ref MERKLE_PROOFS_GENERATED: CounterVec = CounterVec::new(
        Opts::new("sg_merkle_proofs_generated_total", "Merkle proofs generated"),
        &["proof_type"]
    ).expect("metric creation failed");

    pub static ref MERKLE_VERIFY_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "sg_merkle_verify_duration_seconds",
            "Time spent verifying a Merkle proof"
        ).buckets(exponential_buckets(0.00001, 2.0, 12).unwrap())
    ).expect("metric creation failed");

    // -- hnsw index --------------------------------------------------------

    pub static ref HNSW_VECTORS_INDEXED: Gauge = Gauge::new(
        "sg_hnsw_vectors_indexed",
        "Number of live (non-tombstoned) vectors in the HNSW index"
    ).expect("metric creation failed");

    pub static ref HNSW_SEARCH_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "sg_hnsw_search_duration_seconds",
            "Time spent answering a k-nearest-neighbor query"
        ).buckets(exponential_buckets(0.0001, 2.0, 15).unwrap())
    ).expect("metric creation failed");

    // -- neuron graph --------------------------------------------------------

    pub static ref NEURONS_CREATED: Counter = Counter::new(
        "sg_graph_neurons_created_total",
        "Total neurons created"
    ).expect("metric creation failed");

    pub static ref SYNAPSES_FORMED: Counter = Counter::new(
        "sg_graph_synapses_formed_total",
        "Total synapses formed between neurons"
    ).expect("metric creation failed");

    pub static ref LEARNING_UPDATES: CounterVec = CounterVec::new(
        Opts::new("sg_graph_learning_updates_total", "Hebbian learning rule applications"),
        &["rule"]
    ).expect("metric creation failed");

    // -- ingestion / query ----------------------------------------------

    pub static ref INGEST_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "sg_ingest_duration_seconds",
            "Time spent ingesting one document"
        ).buckets(exponential_buckets(0.001, 2.0, 15).unwrap())
    ).expect("metric creation failed");

    pub static ref QUERY_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "sg_query_duration_seconds",
            "Time spent answering one query"
        ).buckets(exponential_buckets(0.0001, 2.0, 15).unwrap())
    ).expect("metric creation failed");

    // -- journal / sync ----------------------------------------------------

    pub static ref JOURNAL_ENTRIES_APPENDED: Counter = Counter::new(
        "sg_journal_entries_appended_total",
        "Total change-journal entries appended"
    ).expect("metric creation failed");

    pub static ref SYNC_CONFLICTS: CounterVec = CounterVec::new(
        Opts::new("sg_sync_conflicts_total", "Sync conflicts encountered, by resolution"),
        &["resolution"]
    ).expect("metric creation failed");

    pub static ref COMPACTION_RUNS: Counter = Counter::new(
        "sg_compaction_runs_total",
        "Total compaction cycles executed"
    ).expect("metric creation failed");

    // -- event bus ---------------------------------------------------------

    pub static ref EVENT_BUS_MESSAGES_PUBLISHED: CounterVec = CounterVec::new(
        Opts::new("sg_eventbus_messages_published_total", "Events published on the bus"),
        &["event_type"]
    ).expect("metric creation failed");

    // -- errors --------------------------------------------------------

    pub static ref SUBSYSTEM_ERRORS: CounterVec = CounterVec::new(
        Opts::new("sg_subsystem_errors_total", "Errors by subsystem and error kind"),
        &["subsystem", "error_kind"]
    ).expect("metric creation failed");
}

/// Handle for the metrics registry. Held for the process lifetime.
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register every metric above with the global registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(CHUNKS_STORED.clone()),
        Box::new(CHUNKS_GC_RECLAIMED.clone()),
        Box::new(MERKLE_PROOFS_GENERATED.clone()),
        Box::new(MERKLE_VERIFY_DURATION.clone()),
        Box::new(HNSW_VECTORS_INDEXED.clone()),
        Box::new(HNSW_SEARCH_DURATION.clone()),
        Box::new(NEURONS_CREATED.clone()),
        Box::new(SYNAPSES_FORMED.clone()),
        Box::new(LEARNING_UPDATES.clone()),
        Box::new(INGEST_DURATION.clone()),
        Box::new(QUERY_DURATION.clone()),
        Box::new(JOURNAL_ENTRIES_APPENDED.clone()),
        Box::new(SYNC_CONFLICTS.clone()),
        Box::new(COMPACTION_RUNS.clone()),
        Box::new(EVENT_BUS_MESSAGES_PUBLISHED.clone()),
        Box::new(SUBSYSTEM_ERRORS.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode every registered metric as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard that observes a histogram with the elapsed duration on drop.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    #[must_use]
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_increment() {
        CHUNKS_STORED.inc();
        assert!(CHUNKS_STORED.get() >= 1.0);
    }

    #[test]
    fn gauge_set() {
        HNSW_VECTORS_INDEXED.set(42.0);
        assert_eq!(HNSW_VECTORS_INDEXED.get(), 42.0);
    }

    #[test]
    fn histogram_timer_observes_on_drop() {
        let _timer = HistogramTimer::new(&INGEST_DURATION);
        std::thread::sleep(std::time::Duration::from_millis(1));
    }

    #[test]
    fn encode_after_register_produces_text() {
        let _ = register_metrics();
        let text = encode_metrics().unwrap();
        assert!(text.contains("sg_"));
    }
}
