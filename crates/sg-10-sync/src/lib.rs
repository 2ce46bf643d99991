//! # State Sync Manager
//!
//! Tracks a local vector clock against a roster of peers, diffs state to
//! decide what needs pushing or pulling, and applies remote changes with
//! pluggable conflict resolution when two nodes touch the same entity
//! concurrently.

mod domain;
mod service;

pub use domain::{ApplyReport, ConflictResolutionStrategy, LocalSyncState, PeerDescriptor, PeerStatus, PendingChange, StateDiff};
pub use service::StateSyncManager;
