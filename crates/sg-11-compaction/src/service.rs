//! Background compaction scheduler.
//!
//! Grounded on the teacher's `domain::pending::cleanup_task` background
//! loop (`tokio::time::interval` with `MissedTickBehavior::Skip`), plus
//! `qc-17-block-production`'s `AtomicBool`-guarded background task shape
//! for the single-in-flight guard: an overlapping tick is skipped rather
//! than queued, since a compaction pass that hasn't finished yet means
//! there's nothing new to reclaim.

use crate::domain::{CompactionConfig, CompactionReport};
use sg_02_chunk_store::ChunkStore;
use sg_06_graph::NeuronGraph;
use sg_09_journal::ChangeJournal;
use sg_bus::{EventPayload, EventPublisher, GraphEvent};
use sg_types::{GraphError, TimeSource};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

pub const EVENT_SOURCE: &str = "sg-11-compaction";

pub struct CompactionScheduler {
    chunk_store: Mutex<ChunkStore>,
    graph: Mutex<NeuronGraph>,
    journal: Mutex<ChangeJournal>,
    bus: Arc<dyn EventPublisher>,
    time: Arc<dyn TimeSource>,
    config: CompactionConfig,
    in_flight: AtomicBool,
}

impl CompactionScheduler {
    #[must_use]
    pub fn new(
        chunk_store: ChunkStore,
        graph: NeuronGraph,
        journal: ChangeJournal,
        bus: Arc<dyn EventPublisher>,
        time: Arc<dyn TimeSource>,
        config: CompactionConfig,
    ) -> Self {
        Self {
            chunk_store: Mutex::new(chunk_store),
            graph: Mutex::new(graph),
            journal: Mutex::new(journal),
            bus,
            time,
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn config(&self) -> &CompactionConfig {
        &self.config
    }

    /// Run one compaction pass: HNSW tombstone sweep, chunk GC, journal
    /// pruning. If a pass is already running this returns immediately
    /// with `ran: false` instead of blocking or queuing.
    pub fn run_once(&self) -> Result<CompactionReport, GraphError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("compaction pass already in flight, skipping this tick");
            return Ok(CompactionReport::default());
        }
        let _guard = InFlightGuard(&self.in_flight);

        let tombstones_removed = self.graph.lock().unwrap().compact_index() as u64;
        let chunks_removed = self.chunk_store.lock().unwrap().gc()? as u64;

        let journal_entries_removed = {
            let mut journal = self.journal.lock().unwrap();
            let latest = journal.get_latest_sequence();
            let before = latest.saturating_sub(self.config.journal_retain_count);
            if before == 0 {
                0
            } else {
                journal.compact(before)? as u64
            }
        };

        let report = CompactionReport {
            ran: true,
            chunks_removed,
            tombstones_removed,
            journal_entries_removed,
        };

        self.bus.publish(GraphEvent::new(
            EVENT_SOURCE,
            self.time.now_millis(),
            EventPayload::MemoryCleared {
                chunks_removed: report.chunks_removed,
                tombstones_removed: report.tombstones_removed,
                journal_entries_removed: report.journal_entries_removed,
            },
        ));

        Ok(report)
    }

    /// Drive `run_once` on `self.config.interval` until the returned
    /// handle is dropped/aborted. Ticks missed while a pass overruns the
    /// interval are skipped rather than replayed.
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if let Err(err) = self.run_once() {
                    warn!(error = %err, "compaction pass failed");
                }
            }
        })
    }
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sg_04_hnsw::{HnswIndex, HnswParams};
    use sg_05_neuron_store::NeuronStore;
    use sg_06_graph::CreateNeuronInput;
    use sg_bus::InMemoryEventBus;
    use sg_types::{Hash, InMemoryKVStore, SystemTimeSource};

    fn scheduler(config: CompactionConfig) -> CompactionScheduler {
        let time: Arc<dyn TimeSource> = Arc::new(SystemTimeSource);
        let chunk_store = ChunkStore::new(Box::new(InMemoryKVStore::new()), time.clone());
        let graph = NeuronGraph::new(
            NeuronStore::new(Box::new(InMemoryKVStore::new())),
            HnswIndex::with_seed(HnswParams::default(), 7),
            Arc::new(InMemoryEventBus::default()),
            time.clone(),
        );
        let journal = ChangeJournal::new(Box::new(InMemoryKVStore::new())).unwrap();
        CompactionScheduler::new(chunk_store, graph, journal, Arc::new(InMemoryEventBus::default()), time, config)
    }

    #[test]
    fn run_once_reports_zero_counts_on_an_empty_store() {
        let sched = scheduler(CompactionConfig::default());
        let report = sched.run_once().unwrap();
        assert!(report.ran);
        assert_eq!(report.chunks_removed, 0);
        assert_eq!(report.tombstones_removed, 0);
        assert_eq!(report.journal_entries_removed, 0);
    }

    #[test]
    fn run_once_runs_clean_against_a_populated_graph() {
        let sched = scheduler(CompactionConfig::default());
        let hash = Hash::from_bytes([1u8; 32]);
        let input = CreateNeuronInput::new(vec![1.0, 0.0, 0.0], vec![hash], hash);
        sched.graph.lock().unwrap().create_neuron(input).unwrap();

        let report = sched.run_once().unwrap();
        assert!(report.ran);
        assert_eq!(report.tombstones_removed, 0);
    }

    #[test]
    fn second_concurrent_run_is_skipped_while_first_holds_the_guard() {
        let sched = scheduler(CompactionConfig::default());
        sched.in_flight.store(true, Ordering::SeqCst);
        let report = sched.run_once().unwrap();
        assert!(!report.ran);
        sched.in_flight.store(false, Ordering::SeqCst);
    }

    #[test]
    fn run_once_compacts_journal_beyond_retain_window() {
        let sched = scheduler(CompactionConfig { interval: std::time::Duration::from_secs(60), journal_retain_count: 2 });
        {
            let mut journal = sched.journal.lock().unwrap();
            for _ in 0..5 {
                journal
                    .append(sg_09_journal::NewChangeEntry {
                        entity_type: sg_09_journal::EntityType::Neuron,
                        operation: sg_09_journal::ChangeOperation::Create,
                        entity_id: uuid::Uuid::new_v4(),
                        data: serde_json::json!({}),
                        vector_clock: sg_types::VectorClock::new(),
                        timestamp: 1,
                        node_id: "n1".into(),
                    })
                    .unwrap();
            }
        }
        let report = sched.run_once().unwrap();
        assert_eq!(report.journal_entries_removed, 3);
    }
}
