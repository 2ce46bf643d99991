//! State sync manager: vector-clock bookkeeping, diffing against peers,
//! and applying remote changes with conflict resolution.
//!
//! Grounded on the teacher's `domain::conflicts` module: that code pairs
//! up transactions and flags a conflict when their read/write sets
//! overlap on the same storage slot. Here the "slot" is an `entity_id`
//! and overlap is generalized from set intersection to vector-clock
//! concurrency (`VectorClock::is_concurrent_with`) between a local
//! journal entry and an incoming remote one.

use crate::domain::{ApplyReport, ConflictResolutionStrategy, LocalSyncState, PeerDescriptor, PendingChange, StateDiff};
use sg_09_journal::{ChangeEntry, ChangeJournal, NewChangeEntry};
use sg_bus::{EventPayload, EventPublisher, GraphEvent};
use sg_types::{GraphError, TimeSource};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use uuid::Uuid;

pub struct StateSyncManager {
    state: LocalSyncState,
    journal: ChangeJournal,
    bus: Arc<dyn EventPublisher>,
    time: Arc<dyn TimeSource>,
    resolver: ConflictResolutionStrategy,
    peers: HashMap<String, PeerDescriptor>,
}

impl StateSyncManager {
    #[must_use]
    pub fn new(
        node_id: impl Into<String>,
        journal: ChangeJournal,
        bus: Arc<dyn EventPublisher>,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            state: LocalSyncState::new(node_id),
            journal,
            bus,
            time,
            resolver: ConflictResolutionStrategy::default(),
            peers: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: ConflictResolutionStrategy) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn set_resolver(&mut self, resolver: ConflictResolutionStrategy) {
        self.resolver = resolver;
    }

    #[must_use]
    pub fn state(&self) -> &LocalSyncState {
        &self.state
    }

    #[must_use]
    pub fn journal(&self) -> &ChangeJournal {
        &self.journal
    }

    pub fn upsert_peer(&mut self, peer: PeerDescriptor) {
        self.peers.insert(peer.peer_id.clone(), peer);
    }

    #[must_use]
    pub fn peer(&self, peer_id: &str) -> Option<&PeerDescriptor> {
        self.peers.get(peer_id)
    }

    #[must_use]
    pub fn peers(&self) -> impl Iterator<Item = &PeerDescriptor> {
        self.peers.values()
    }

    /// Tick the local clock, stamp `change`, append it to the journal, and
    /// emit `sync:state_changed`. Rolls the clock back if the append fails.
    pub fn record_change(&mut self, change: PendingChange) -> Result<ChangeEntry, GraphError> {
        let mut stamped = self.record_changes(vec![change])?;
        stamped.pop().ok_or_else(|| GraphError::StorageFailure("record_change produced no entry".into()))
    }

    /// Batch variant: ticks the local clock once per change, then appends
    /// every stamped entry as a single atomic write. If the append fails,
    /// every tick performed for this batch is rolled back so the node's
    /// vector clock still matches what's actually on disk.
    pub fn record_changes(&mut self, changes: Vec<PendingChange>) -> Result<Vec<ChangeEntry>, GraphError> {
        if changes.is_empty() {
            return Ok(Vec::new());
        }

        let snapshot = self.state.vector_clock.clone();
        let now = self.time.now_millis();
        let mut entries = Vec::with_capacity(changes.len());
        for change in changes {
            self.state.vector_clock.tick(&self.state.node_id);
            entries.push(NewChangeEntry {
                entity_type: change.entity_type,
                operation: change.operation,
                entity_id: change.entity_id,
                data: change.data,
                vector_clock: self.state.vector_clock.clone(),
                timestamp: now,
                node_id: self.state.node_id.clone(),
            });
        }

        match self.journal.append_batch(entries) {
            Ok(stamped) => {
                self.bus.publish(GraphEvent::new(
                    "sg-10-sync",
                    now,
                    EventPayload::SyncStateChanged {
                        node_id: self.state.node_id.clone(),
                        sequence: self.journal.get_latest_sequence(),
                    },
                ));
                Ok(stamped)
            }
            Err(err) => {
                self.state.vector_clock = snapshot;
                Err(err)
            }
        }
    }

    /// Compare local state against `peer`'s last known clock.
    pub fn compute_state_diff(&self, peer: &PeerDescriptor) -> Result<StateDiff, GraphError> {
        use sg_types::ClockOrdering;
        match self.state.vector_clock.compare(&peer.vector_clock) {
            ClockOrdering::Equal => Ok(StateDiff::Equal),
            ClockOrdering::After => Ok(StateDiff::LocalAhead {
                entries: self.journal.get_after_sequence(peer.last_sequence)?,
            }),
            ClockOrdering::Before => Ok(StateDiff::RemoteAhead { since_sequence: peer.last_sequence }),
            ClockOrdering::Concurrent => Ok(StateDiff::Concurrent {
                local_entries: self.journal.get_after_sequence(peer.last_sequence)?,
                since_sequence: peer.last_sequence,
            }),
        }
    }

    /// Apply a batch of remote journal entries: merge clocks, detect and
    /// resolve conflicts against local history, and append the outcome.
    /// A resolver panic is caught, reported as an `error` event, and skips
    /// only the offending entry rather than the whole batch.
    pub fn apply_remote_changes(&mut self, remote: Vec<ChangeEntry>) -> Result<ApplyReport, GraphError> {
        let mut report = ApplyReport::default();

        for remote_entry in remote {
            let clock_snapshot = self.state.vector_clock.clone();
            self.state.vector_clock.merge(&remote_entry.vector_clock);

            let local_history = self.journal.get_by_entity(remote_entry.entity_id)?;
            let conflicting = local_history
                .iter()
                .rev()
                .find(|local| local.vector_clock.is_concurrent_with(&remote_entry.vector_clock));

            let resolved = if let Some(local_entry) = conflicting {
                let resolver = self.resolver.clone();
                let local_entry = local_entry.clone();
                let remote_for_resolver = remote_entry.clone();
                match catch_unwind(AssertUnwindSafe(|| resolver.resolve(&local_entry, &remote_for_resolver))) {
                    Ok(resolved) => {
                        self.bus.publish(GraphEvent::new(
                            "sg-10-sync",
                            self.time.now_millis(),
                            EventPayload::SyncConflict {
                                entity_id: remote_entry.entity_id.to_string(),
                                resolution: resolution_label(&self.resolver),
                            },
                        ));
                        report.conflicts_resolved += 1;
                        resolved
                    }
                    Err(_) => {
                        self.state.vector_clock = clock_snapshot;
                        self.bus.publish(GraphEvent::new(
                            "sg-10-sync",
                            self.time.now_millis(),
                            EventPayload::Error {
                                message: format!("resolver panicked on entity {}", remote_entry.entity_id),
                                source_kind: "sg-10-sync".into(),
                            },
                        ));
                        report.skipped.push((remote_entry.entity_id, "resolver panicked".into()));
                        continue;
                    }
                }
            } else {
                remote_entry.clone()
            };

            self.state.vector_clock.tick(&self.state.node_id);
            let new_entry = NewChangeEntry {
                entity_type: resolved.entity_type,
                operation: resolved.operation,
                entity_id: resolved.entity_id,
                data: resolved.data,
                vector_clock: self.state.vector_clock.clone(),
                timestamp: resolved.timestamp,
                node_id: self.state.node_id.clone(),
            };

            match self.journal.append(new_entry) {
                Ok(stamped) => report.applied.push(stamped),
                Err(err) => {
                    self.state.vector_clock = clock_snapshot;
                    return Err(err);
                }
            }
        }

        Ok(report)
    }
}

fn resolution_label(strategy: &ConflictResolutionStrategy) -> String {
    match strategy {
        ConflictResolutionStrategy::LastWriteWins => "last-write-wins".into(),
        ConflictResolutionStrategy::Merge(_) => "merge".into(),
        ConflictResolutionStrategy::LocalWins => "local-wins".into(),
        ConflictResolutionStrategy::RemoteWins => "remote-wins".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sg_09_journal::{ChangeOperation, EntityType};
    use sg_types::{InMemoryKVStore, SystemTimeSource, VectorClock};

    struct FixedTime(std::sync::atomic::AtomicU64);
    impl TimeSource for FixedTime {
        fn now_millis(&self) -> u64 {
            self.0.load(std::sync::atomic::Ordering::Relaxed)
        }
    }

    fn manager(node_id: &str) -> StateSyncManager {
        let journal = ChangeJournal::new(Box::new(InMemoryKVStore::new())).unwrap();
        let bus: Arc<dyn EventPublisher> = Arc::new(sg_bus::InMemoryEventBus::default());
        let time: Arc<dyn TimeSource> = Arc::new(SystemTimeSource);
        StateSyncManager::new(node_id, journal, bus, time)
    }

    fn pending(entity_id: Uuid) -> PendingChange {
        PendingChange {
            entity_type: EntityType::Neuron,
            operation: ChangeOperation::Update,
            entity_id,
            data: serde_json::json!({ "v": 1 }),
        }
    }

    #[test]
    fn record_change_ticks_clock_and_appends_to_journal() {
        let mut mgr = manager("n1");
        let entry = mgr.record_change(pending(Uuid::new_v4())).unwrap();
        assert_eq!(entry.vector_clock.get("n1"), 1);
        assert_eq!(mgr.journal().get_latest_sequence(), 1);
    }

    #[test]
    fn record_changes_ticks_once_per_entry() {
        let mut mgr = manager("n1");
        let entries = mgr
            .record_changes(vec![pending(Uuid::new_v4()), pending(Uuid::new_v4())])
            .unwrap();
        assert_eq!(entries[0].vector_clock.get("n1"), 1);
        assert_eq!(entries[1].vector_clock.get("n1"), 2);
    }

    #[test]
    fn compute_state_diff_reports_equal_when_clocks_match() {
        let mgr = manager("n1");
        let peer = PeerDescriptor::new("n2", "tcp://n2");
        assert!(matches!(mgr.compute_state_diff(&peer).unwrap(), StateDiff::Equal));
    }

    #[test]
    fn compute_state_diff_reports_local_ahead() {
        let mut mgr = manager("n1");
        mgr.record_change(pending(Uuid::new_v4())).unwrap();
        let peer = PeerDescriptor::new("n2", "tcp://n2");
        match mgr.compute_state_diff(&peer).unwrap() {
            StateDiff::LocalAhead { entries } => assert_eq!(entries.len(), 1),
            other => panic!("expected LocalAhead, got {other:?}"),
        }
    }

    #[test]
    fn compute_state_diff_reports_remote_ahead() {
        let mgr = manager("n1");
        let mut peer = PeerDescriptor::new("n2", "tcp://n2");
        peer.vector_clock.tick("n2");
        match mgr.compute_state_diff(&peer).unwrap() {
            StateDiff::RemoteAhead { since_sequence } => assert_eq!(since_sequence, 0),
            other => panic!("expected RemoteAhead, got {other:?}"),
        }
    }

    #[test]
    fn concurrent_updates_resolve_to_combined_clock_under_last_write_wins() {
        // Scenario: node-1 records an update to shared-neuron at t=1000
        // with clock {n1:1}; node-2 applies a remote update to the same
        // entity at t=2000 with clock {n2:1}. The diff is concurrent;
        // last-write-wins picks the later (remote) value, and the
        // resulting vector clock covers both nodes.
        let shared = Uuid::new_v4();
        let mut node1 = manager("n1");
        let local_entry = node1
            .journal
            .append(NewChangeEntry {
                entity_type: EntityType::Neuron,
                operation: ChangeOperation::Update,
                entity_id: shared,
                data: serde_json::json!({ "value": "local" }),
                vector_clock: {
                    let mut c = VectorClock::new();
                    c.tick("n1");
                    c
                },
                timestamp: 1000,
                node_id: "n1".into(),
            })
            .unwrap();
        node1.state.vector_clock = local_entry.vector_clock.clone();

        let mut remote_clock = VectorClock::new();
        remote_clock.tick("n2");
        let remote_entry = ChangeEntry {
            sequence: 1,
            entity_type: EntityType::Neuron,
            operation: ChangeOperation::Update,
            entity_id: shared,
            data: serde_json::json!({ "value": "remote" }),
            vector_clock: remote_clock,
            timestamp: 2000,
            node_id: "n2".into(),
        };

        assert!(local_entry.vector_clock.is_concurrent_with(&remote_entry.vector_clock));

        let report = node1.apply_remote_changes(vec![remote_entry]).unwrap();
        assert_eq!(report.conflicts_resolved, 1);
        let applied = &report.applied[0];
        assert_eq!(applied.data, serde_json::json!({ "value": "remote" }));
        assert_eq!(applied.vector_clock.get("n1"), 1);
        assert_eq!(applied.vector_clock.get("n2"), 1);
    }

    #[test]
    fn concurrent_updates_resolve_via_custom_merge_resolver() {
        let shared = Uuid::new_v4();
        let mut node1 = manager("n1").with_resolver(ConflictResolutionStrategy::Merge(Arc::new(
            |local: &ChangeEntry, remote: &ChangeEntry| {
                let mut merged = remote.clone();
                merged.data = serde_json::json!({
                    "merged": true,
                    "localValue": local.data,
                    "remoteValue": remote.data,
                });
                merged
            },
        )));

        let local_entry = node1
            .journal
            .append(NewChangeEntry {
                entity_type: EntityType::Neuron,
                operation: ChangeOperation::Update,
                entity_id: shared,
                data: serde_json::json!({ "value": "local" }),
                vector_clock: {
                    let mut c = VectorClock::new();
                    c.tick("n1");
                    c
                },
                timestamp: 1000,
                node_id: "n1".into(),
            })
            .unwrap();
        node1.state.vector_clock = local_entry.vector_clock.clone();

        let mut remote_clock = VectorClock::new();
        remote_clock.tick("n2");
        let remote_entry = ChangeEntry {
            sequence: 1,
            entity_type: EntityType::Neuron,
            operation: ChangeOperation::Update,
            entity_id: shared,
            data: serde_json::json!({ "value": "remote" }),
            vector_clock: remote_clock,
            timestamp: 2000,
            node_id: "n2".into(),
        };

        let report = node1.apply_remote_changes(vec![remote_entry]).unwrap();
        let applied = &report.applied[0];
        assert_eq!(applied.data["merged"], serde_json::json!(true));
        assert_eq!(applied.vector_clock.get("n1"), 1);
        assert_eq!(applied.vector_clock.get("n2"), 1);
    }

    #[test]
    fn resolver_panic_skips_entry_and_keeps_clock_rolled_back() {
        let shared = Uuid::new_v4();
        let mut node1 =
            manager("n1").with_resolver(ConflictResolutionStrategy::Merge(Arc::new(|_, _| panic!("boom"))));

        let local_entry = node1
            .journal
            .append(NewChangeEntry {
                entity_type: EntityType::Neuron,
                operation: ChangeOperation::Update,
                entity_id: shared,
                data: serde_json::json!({ "value": "local" }),
                vector_clock: {
                    let mut c = VectorClock::new();
                    c.tick("n1");
                    c
                },
                timestamp: 1000,
                node_id: "n1".into(),
            })
            .unwrap();
        node1.state.vector_clock = local_entry.vector_clock.clone();
        let snapshot = node1.state.vector_clock.clone();

        let mut remote_clock = VectorClock::new();
        remote_clock.tick("n2");
        let remote_entry = ChangeEntry {
            sequence: 1,
            entity_type: EntityType::Neuron,
            operation: ChangeOperation::Update,
            entity_id: shared,
            data: serde_json::json!({ "value": "remote" }),
            vector_clock: remote_clock,
            timestamp: 2000,
            node_id: "n2".into(),
        };

        let report = node1.apply_remote_changes(vec![remote_entry]).unwrap();
        assert!(report.applied.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(node1.state.vector_clock, snapshot);
    }

    #[test]
    fn non_conflicting_remote_change_is_appended_without_resolver() {
        let mut mgr = manager("n1");
        let mut remote_clock = VectorClock::new();
        remote_clock.tick("n2");
        let remote_entry = ChangeEntry {
            sequence: 1,
            entity_type: EntityType::Neuron,
            operation: ChangeOperation::Create,
            entity_id: Uuid::new_v4(),
            data: serde_json::json!({}),
            vector_clock: remote_clock,
            timestamp: 500,
            node_id: "n2".into(),
        };
        let report = mgr.apply_remote_changes(vec![remote_entry]).unwrap();
        assert_eq!(report.conflicts_resolved, 0);
        assert_eq!(report.applied.len(), 1);
    }
}
