//! Chunk entity and the text-splitting helper that feeds the ingestion
//! pipeline.

use serde::{Deserialize, Serialize};
use sg_types::Hash;

/// An immutable content-addressed chunk. Identity is its own hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub hash: Hash,
    pub data: Vec<u8>,
    pub size: usize,
    pub created_at: u64,
}

/// Split `text` into overlapping windows of at most `size` UTF-8 scalar
/// values, advancing by `size - overlap` each step. `overlap` is clamped
/// to `size - 1` so the window always advances.
///
/// # Panics
/// Never panics; `size == 0` yields a single empty chunk.
#[must_use]
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    if size == 0 {
        return vec![String::new()];
    }

    let chars: Vec<char> = text.chars().collect();
    let overlap = overlap.min(size.saturating_sub(1));
    let stride = size - overlap;

    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < chars.len() {
        let end = (start + size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += stride;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_text_covers_whole_input_with_overlap() {
        let chunks = chunk_text("abcdefghij", 4, 2);
        assert_eq!(chunks, vec!["abcd", "cdef", "efgh", "ghij"]);
    }

    #[test]
    fn chunk_text_short_input_is_one_chunk() {
        let chunks = chunk_text("ab", 10, 2);
        assert_eq!(chunks, vec!["ab"]);
    }

    #[test]
    fn chunk_text_empty_input_is_empty() {
        assert!(chunk_text("", 10, 2).is_empty());
    }

    #[test]
    fn chunk_text_no_overlap_partitions_exactly() {
        let chunks = chunk_text("abcdef", 2, 0);
        assert_eq!(chunks, vec!["ab", "cd", "ef"]);
    }
}
