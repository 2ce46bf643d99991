//! # Progress Tracker
//!
//! Gates `learning:progress` emission to at most once per `min_interval`,
//! per spec.md §5's requirement that long-running batch operations
//! (ingestion, compaction) publish throttled progress rather than one
//! event per item.

use crate::events::{EventPayload, GraphEvent};
use crate::publisher::EventPublisher;
use sg_types::TimeSource;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

/// Throttles `LearningProgress` events for one in-flight operation.
/// The final call should go through `finish`, which always emits
/// regardless of the throttle gate, so subscribers never miss the
/// terminal 100%-done event.
pub struct ProgressTracker {
    bus: Arc<dyn EventPublisher>,
    time_source: Arc<dyn TimeSource>,
    source: String,
    operation: String,
    min_interval: Duration,
    last_emitted_millis: Mutex<Option<u64>>,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(
        bus: Arc<dyn EventPublisher>,
        time_source: Arc<dyn TimeSource>,
        source: impl Into<String>,
        operation: impl Into<String>,
        min_interval: Duration,
    ) -> Self {
        Self {
            bus,
            time_source,
            source: source.into(),
            operation: operation.into(),
            min_interval,
            last_emitted_millis: Mutex::new(None),
        }
    }

    /// Report progress. Emits immediately only if `min_interval` has
    /// elapsed since the last emission (or this is the first call).
    pub fn tick(&self, processed: u64, total: Option<u64>) {
        let now = self.time_source.now_millis();
        let mut last = self.last_emitted_millis.lock().expect("progress tracker lock poisoned");
        let should_emit = match *last {
            None => true,
            Some(prev) => now.saturating_sub(prev) >= self.min_interval.as_millis() as u64,
        };
        if should_emit {
            *last = Some(now);
            drop(last);
            self.emit(now, processed, total);
        }
    }

    /// Emit a terminal `LearningComplete` event unconditionally, bypassing
    /// the throttle gate.
    pub fn finish(&self, affected: u64) {
        let now = self.time_source.now_millis();
        let event = GraphEvent::new(
            self.source.clone(),
            now,
            EventPayload::LearningComplete {
                operation: self.operation.clone(),
                affected,
            },
        );
        self.bus.publish(event);
    }

    fn emit(&self, now: u64, processed: u64, total: Option<u64>) {
        let event = GraphEvent::new(
            self.source.clone(),
            now,
            EventPayload::LearningProgress {
                operation: self.operation.clone(),
                processed,
                total,
            },
        );
        self.bus.publish(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventFilter;
    use crate::publisher::InMemoryEventBus;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct FakeClock(AtomicU64);
    impl TimeSource for FakeClock {
        fn now_millis(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn first_tick_always_emits() {
        let bus: Arc<dyn EventPublisher> = Arc::new(InMemoryEventBus::default());
        let clock: Arc<dyn TimeSource> = Arc::new(FakeClock(AtomicU64::new(0)));
        let mut sub = bus.subscribe(EventFilter::all());
        let tracker = ProgressTracker::new(bus.clone(), clock, "ingest", "ingest_batch", Duration::from_millis(100));
        tracker.tick(1, Some(10));
        assert!(sub.try_recv().unwrap().is_some());
    }

    #[tokio::test]
    async fn tick_within_interval_is_suppressed() {
        let bus: Arc<dyn EventPublisher> = Arc::new(InMemoryEventBus::default());
        let clock = Arc::new(FakeClock(AtomicU64::new(0)));
        let time_source: Arc<dyn TimeSource> = clock.clone();
        let mut sub = bus.subscribe(EventFilter::all());
        let tracker = ProgressTracker::new(bus.clone(), time_source, "ingest", "ingest_batch", Duration::from_millis(1000));
        tracker.tick(1, Some(10));
        sub.try_recv().unwrap();
        clock.0.store(500, Ordering::SeqCst);
        tracker.tick(2, Some(10));
        assert!(sub.try_recv().unwrap().is_none());
    }

    #[tokio::test]
    async fn finish_always_emits_regardless_of_throttle() {
        let bus: Arc<dyn EventPublisher> = Arc::new(InMemoryEventBus::default());
        let clock: Arc<dyn TimeSource> = Arc::new(FakeClock(AtomicU64::new(0)));
        let mut sub = bus.subscribe(EventFilter::all());
        let tracker = ProgressTracker::new(bus.clone(), clock, "ingest", "ingest_batch", Duration::from_millis(1000));
        tracker.tick(1, Some(10));
        sub.try_recv().unwrap();
        tracker.finish(10);
        let event = sub.try_recv().unwrap().unwrap();
        assert!(matches!(event.payload, EventPayload::LearningComplete { .. }));
    }
}
