//! # Ingestion Pipeline
//!
//! Turns raw text into a persisted, indexed, auto-connected neuron: chunk,
//! store, embed, merkle-root, dedupe-check, create, journal, publish.

mod domain;
mod service;

pub use domain::{BatchIngestReport, IngestOptions, IngestOutcome, DEFAULT_BATCH_SIZE, MAX_BATCH_ERRORS};
pub use service::{IngestPipeline, EVENT_SOURCE};
