//! # Hasher / Similarity Primitives
//!
//! Content hashing, pair hashing, and embedding similarity math. Kept
//! scalar and dependency-light since every one of these functions sits on
//! the hot path of a proof check or an ANN search.

mod hash;
mod provider;
mod similarity;

pub use hash::{content_hash, pair_hash};
pub use provider::EmbeddingProvider;
pub use similarity::{assert_unit_magnitude, cosine_similarity, l2_normalize, magnitude, Embedding, EMBEDDING_DIM};
