//! Compaction scheduler configuration and report types.

use std::time::Duration;

/// How often the scheduler runs, and how much journal history it keeps.
#[derive(Debug, Clone)]
pub struct CompactionConfig {
    pub interval: Duration,
    /// Journal entries are kept once their sequence is within this many
    /// of the latest sequence; everything older is compacted away.
    pub journal_retain_count: u64,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self { interval: Duration::from_secs(300), journal_retain_count: 10_000 }
    }
}

/// What one compaction pass reclaimed. Mirrors `sg_bus::EventPayload::MemoryCleared`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactionReport {
    /// `false` when this pass was skipped because a previous one was
    /// still in flight.
    pub ran: bool,
    pub chunks_removed: u64,
    pub tombstones_removed: u64,
    pub journal_entries_removed: u64,
}
