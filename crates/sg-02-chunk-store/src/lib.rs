//! # Chunk Store
//!
//! Content-addressed storage for immutable byte chunks, deduplicated by
//! hash and garbage-collected by reference count.

mod domain;
mod service;

pub use domain::{chunk_text, Chunk};
pub use service::ChunkStore;
