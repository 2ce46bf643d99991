//! Deterministic embedding provider backed by SHA-256 in counter mode.
//!
//! No model is wired into this workspace; per spec.md §9's "no runtime
//! reflection" note, a real model provider is a drop-in replacement
//! behind `EmbeddingProvider`. This one exists so ingestion and query are
//! exercisable end to end: same text always yields the same vector.

use sg_01_hasher::{l2_normalize, Embedding, EmbeddingProvider, EMBEDDING_DIM};
use sg_types::GraphError;
use sha2::{Digest, Sha256};

pub struct HashingEmbeddingProvider;

impl EmbeddingProvider for HashingEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Embedding, GraphError> {
        if text.is_empty() {
            return Err(GraphError::InvalidArgument("embed: empty text".into()));
        }

        let mut values: Vec<f32> = Vec::with_capacity(EMBEDDING_DIM);
        let mut counter: u32 = 0;
        while values.len() < EMBEDDING_DIM {
            let mut hasher = Sha256::new();
            hasher.update(text.as_bytes());
            hasher.update(counter.to_le_bytes());
            let digest = hasher.finalize();
            for word in digest.chunks_exact(4) {
                if values.len() == EMBEDDING_DIM {
                    break;
                }
                let bits = u32::from_le_bytes(word.try_into().unwrap());
                let unit = f64::from(bits) / f64::from(u32::MAX);
                values.push((unit * 2.0 - 1.0) as f32);
            }
            counter += 1;
        }

        l2_normalize(&mut values)?;
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embed_is_deterministic_and_right_sized() {
        let provider = HashingEmbeddingProvider;
        let a = provider.embed("hello world").unwrap();
        let b = provider.embed("hello world").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), EMBEDDING_DIM);
    }

    #[test]
    fn embed_is_l2_normalized() {
        let provider = HashingEmbeddingProvider;
        let v = provider.embed("some text").unwrap();
        let magnitude: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-4);
    }

    #[test]
    fn embed_rejects_empty_text() {
        let provider = HashingEmbeddingProvider;
        assert!(matches!(provider.embed(""), Err(GraphError::InvalidArgument(_))));
    }

    #[test]
    fn distinct_texts_yield_distinct_embeddings() {
        let provider = HashingEmbeddingProvider;
        let a = provider.embed("alpha").unwrap();
        let b = provider.embed("beta").unwrap();
        assert_ne!(a, b);
    }
}
