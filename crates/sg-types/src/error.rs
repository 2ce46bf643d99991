//! # Error Kinds
//!
//! The closed set of error kinds every subsystem funnels its failures
//! through, per spec.md §7. Each subsystem crate keeps its own local
//! `thiserror` enum for the specifics it can surface, and implements
//! `From<LocalError> for GraphError` so the CLI has one place to turn a
//! failure into an exit code and a one-line stderr diagnostic.

use thiserror::Error;

/// The closed enumeration of error kinds from spec.md §7.
#[derive(Debug, Clone, Error)]
pub enum GraphError {
    /// The requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An insert targeted an id that already exists (a programmer error,
    /// always surfaced per spec.md §7).
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// An index or range argument fell outside its valid domain.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// A caller-supplied argument was structurally invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A Merkle mismatch, chunk hash mismatch, or embedding magnitude out
    /// of tolerance. Never auto-corrected.
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),

    /// An I/O failure against a persistent store.
    #[error("storage failure: {0}")]
    StorageFailure(String),

    /// A sync conflict the configured resolver could not resolve, or chose
    /// not to.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A suspending operation was cancelled before completion.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// A dimension or store limit was exceeded.
    #[error("capacity exceeded: {0}")]
    Capacity(String),

    /// An operation that requires at least one input received none.
    #[error("empty input: {0}")]
    EmptyInput(String),
}

impl GraphError {
    /// Maps this error to the CLI's process exit code (spec.md §6: `0`
    /// success, `1` invocation error or operation failure — every
    /// surfaced `GraphError` is a `1`).
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_distinct_message_prefix() {
        let errs: Vec<GraphError> = vec![
            GraphError::NotFound("x".into()),
            GraphError::Duplicate("x".into()),
            GraphError::OutOfRange("x".into()),
            GraphError::InvalidArgument("x".into()),
            GraphError::IntegrityViolation("x".into()),
            GraphError::StorageFailure("x".into()),
            GraphError::Conflict("x".into()),
            GraphError::Cancelled("x".into()),
            GraphError::Capacity("x".into()),
            GraphError::EmptyInput("x".into()),
        ];
        let mut prefixes: Vec<String> = errs
            .iter()
            .map(|e| e.to_string().split(':').next().unwrap().to_string())
            .collect();
        prefixes.sort();
        prefixes.dedup();
        assert_eq!(prefixes.len(), errs.len());
    }

    #[test]
    fn exit_code_is_always_one() {
        assert_eq!(GraphError::NotFound("x".into()).exit_code(), 1);
    }
}
