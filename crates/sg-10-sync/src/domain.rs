//! State sync manager types: peer roster, state diffs, and pluggable
//! conflict resolution strategies.

use sg_09_journal::ChangeEntry;
use std::fmt;
use std::sync::Arc;

/// Liveness of a tracked peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeerStatus {
    #[default]
    Disconnected,
    Connected,
    Syncing,
}

/// What the sync manager knows about one remote node, keyed by `peer_id`
/// in `StateSyncManager`'s roster.
#[derive(Debug, Clone)]
pub struct PeerDescriptor {
    pub peer_id: String,
    pub endpoint: String,
    pub last_seen: u64,
    /// Highest local journal sequence already known to have reached this
    /// peer (or been pulled from it). The sync manager's high-water mark
    /// for deciding what range a diff still needs to cover.
    pub last_sequence: u64,
    pub vector_clock: sg_types::VectorClock,
    pub status: PeerStatus,
}

impl PeerDescriptor {
    #[must_use]
    pub fn new(peer_id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            peer_id: peer_id.into(),
            endpoint: endpoint.into(),
            last_seen: 0,
            last_sequence: 0,
            vector_clock: sg_types::VectorClock::new(),
            status: PeerStatus::default(),
        }
    }
}

/// Result of comparing local state against one peer's reported state.
#[derive(Debug, Clone)]
pub enum StateDiff {
    /// Vector clocks are identical; nothing to sync.
    Equal,
    /// Local is strictly ahead: these entries need to be pushed.
    LocalAhead { entries: Vec<ChangeEntry> },
    /// Remote is strictly ahead: pull everything after `since_sequence`.
    RemoteAhead { since_sequence: u64 },
    /// Neither side is a strict ancestor of the other; both directions
    /// need syncing and overlapping entities may need conflict
    /// resolution once the remote entries are known.
    Concurrent { local_entries: Vec<ChangeEntry>, since_sequence: u64 },
}

/// How `apply_remote_changes` picks a winner when a local change and a
/// remote change touch the same entity with concurrent vector clocks.
#[derive(Clone)]
pub enum ConflictResolutionStrategy {
    /// Later `timestamp` wins; ties broken by `node_id` (default).
    LastWriteWins,
    /// Caller-supplied resolver: given the local and remote entries,
    /// returns the single entry to keep.
    Merge(Arc<dyn Fn(&ChangeEntry, &ChangeEntry) -> ChangeEntry + Send + Sync>),
    /// Always keep the local entry.
    LocalWins,
    /// Always keep the remote entry.
    RemoteWins,
}

impl Default for ConflictResolutionStrategy {
    fn default() -> Self {
        Self::LastWriteWins
    }
}

impl fmt::Debug for ConflictResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LastWriteWins => write!(f, "LastWriteWins"),
            Self::Merge(_) => write!(f, "Merge(..)"),
            Self::LocalWins => write!(f, "LocalWins"),
            Self::RemoteWins => write!(f, "RemoteWins"),
        }
    }
}

impl ConflictResolutionStrategy {
    /// Resolve one conflicting pair down to the entry that gets appended.
    #[must_use]
    pub fn resolve(&self, local: &ChangeEntry, remote: &ChangeEntry) -> ChangeEntry {
        match self {
            Self::LastWriteWins => {
                if remote.timestamp > local.timestamp {
                    remote.clone()
                } else if local.timestamp > remote.timestamp {
                    local.clone()
                } else if remote.node_id > local.node_id {
                    remote.clone()
                } else {
                    local.clone()
                }
            }
            Self::Merge(resolver) => resolver(local, remote),
            Self::LocalWins => local.clone(),
            Self::RemoteWins => remote.clone(),
        }
    }
}

/// The local node's own sync-relevant state, mirroring spec.md's
/// `{ nodeId, vectorClock, lastMerkleRoot, lastSync }`.
#[derive(Debug, Clone)]
pub struct LocalSyncState {
    pub node_id: String,
    pub vector_clock: sg_types::VectorClock,
    pub last_merkle_root: Option<sg_types::Hash>,
    pub last_sync: Option<u64>,
}

impl LocalSyncState {
    #[must_use]
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            vector_clock: sg_types::VectorClock::new(),
            last_merkle_root: None,
            last_sync: None,
        }
    }
}

/// Outcome of `apply_remote_changes`: what landed, and what was skipped
/// because its resolver panicked.
#[derive(Debug, Clone, Default)]
pub struct ApplyReport {
    pub applied: Vec<ChangeEntry>,
    pub conflicts_resolved: usize,
    pub skipped: Vec<(uuid::Uuid, String)>,
}

/// One change a caller wants recorded through `record_change`/`record_changes`,
/// before the manager stamps it with sequence, clock, timestamp and node id.
#[derive(Debug, Clone)]
pub struct PendingChange {
    pub entity_type: sg_09_journal::EntityType,
    pub operation: sg_09_journal::ChangeOperation,
    pub entity_id: uuid::Uuid,
    pub data: serde_json::Value,
}
