//! Content and pair hashing.
//!
//! These two functions are the Merkle engine's only hashing primitives —
//! swapping the digest algorithm touches only this file.

use sg_types::Hash;
use sha2::{Digest, Sha256};

/// SHA-256 digest of `bytes`.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Hash::from_bytes(out)
}

/// SHA-256 of `left || right`, in that order.
#[must_use]
pub fn pair_hash(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Hash::from_bytes(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_deterministic() {
        assert_eq!(content_hash(b"hello"), content_hash(b"hello"));
        assert_ne!(content_hash(b"hello"), content_hash(b"world"));
    }

    #[test]
    fn pair_hash_is_order_sensitive() {
        let a = content_hash(b"a");
        let b = content_hash(b"b");
        assert_ne!(pair_hash(&a, &b), pair_hash(&b, &a));
    }
}
