//! Embedding-provider capability.
//!
//! The core never embeds a model: ingestion and query consume whatever
//! `EmbeddingProvider` is wired in at construction, per spec.md §9's
//! "no runtime reflection" design note. A real model is a drop-in
//! replacement behind the same trait.

use crate::similarity::Embedding;
use sg_types::GraphError;

/// Converts text to an `EMBEDDING_DIM`-wide, L2-normalized vector.
pub trait EmbeddingProvider: Send + Sync {
    /// # Errors
    /// `InvalidArgument` on empty text; `IntegrityViolation` if the
    /// resulting vector's magnitude falls outside tolerance.
    fn embed(&self, text: &str) -> Result<Embedding, GraphError>;
}
