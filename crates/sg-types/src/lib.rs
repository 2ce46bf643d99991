//! # Shared Types
//!
//! Core domain types and capability traits shared across every subsystem
//! crate in the workspace.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: `Hash`, `VectorClock`, and `GraphError` are
//!   defined once here; every subsystem's local error type converts into
//!   `GraphError` at its crate boundary.
//! - **Capabilities, not concretions**: `KeyValueStore` and `TimeSource` are
//!   the only two interfaces a persistence-backed subsystem depends on. They
//!   are injected at construction; there is no reflection-based wiring.

pub mod clock;
pub mod error;
pub mod hash;
pub mod kv;

pub use clock::{ClockOrdering, VectorClock};
pub use error::GraphError;
pub use hash::Hash;
pub use kv::{BatchOperation, FileBackedKVStore, InMemoryKVStore, KeyValueStore, SystemTimeSource, TimeSource};
