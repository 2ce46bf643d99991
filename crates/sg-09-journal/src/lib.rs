//! # Change Journal
//!
//! Append-only, sequence-ordered log of every mutation applied to the
//! graph. Every other subsystem that needs replay, audit, or
//! cross-node sync reads it rather than re-deriving history from the
//! neuron store directly.

mod domain;
mod service;

pub use domain::{ChangeEntry, ChangeOperation, EntityType, NewChangeEntry};
pub use service::ChangeJournal;
