//! # Telemetry
//!
//! Structured logging via `tracing` and Prometheus metrics, shared by
//! every subsystem and wired up once from `sg-node`'s entry point.

#![allow(dead_code)]

mod config;
mod logging;
mod metrics;

pub use config::TelemetryConfig;
pub use logging::LoggingGuard;
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, MetricsHandle, CHUNKS_GC_RECLAIMED,
    CHUNKS_STORED, COMPACTION_RUNS, EVENT_BUS_MESSAGES_PUBLISHED, HNSW_SEARCH_DURATION,
    HNSW_VECTORS_INDEXED, INGEST_DURATION, JOURNAL_ENTRIES_APPENDED, LEARNING_UPDATES,
    MERKLE_PROOFS_GENERATED, MERKLE_VERIFY_DURATION, NEURONS_CREATED, QUERY_DURATION,
    SUBSYSTEM_ERRORS, SYNAPSES_FORMED, SYNC_CONFLICTS,
};

use thiserror::Error;

/// Telemetry initialization errors.
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("failed to initialize metrics: {0}")]
    MetricsInit(String),

    #[error("invalid telemetry configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics. Returns a guard that must be held for
/// the lifetime of the process.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics_handle = register_metrics()?;
    let logging_guard = logging::init_logging(&config)?;

    Ok(TelemetryGuard {
        _logging: logging_guard,
        _metrics: metrics_handle,
    })
}

/// Guard that keeps telemetry active. Dropping it is a no-op; it exists to
/// anchor telemetry lifetime to the caller's `main`.
pub struct TelemetryGuard {
    _logging: LoggingGuard,
    _metrics: MetricsHandle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_env_has_sane_defaults() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "synaptic-graph");
    }
}
