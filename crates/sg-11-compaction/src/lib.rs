//! # Compaction Scheduler
//!
//! Periodically sweeps HNSW tombstones, garbage-collects unreferenced
//! chunks, and prunes old journal entries, publishing `memory:cleared`
//! with the counts reclaimed. A single-in-flight guard means an
//! overlapping tick is skipped rather than queued or run concurrently.

mod domain;
mod service;

pub use domain::{CompactionConfig, CompactionReport};
pub use service::{CompactionScheduler, EVENT_SOURCE};
