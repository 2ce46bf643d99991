//! Tree construction.

use crate::domain::MerkleTree;
use sg_01_hasher::pair_hash;
use sg_types::{GraphError, Hash};

fn next_power_of_two(n: usize) -> usize {
    if n <= 1 {
        1
    } else {
        n.next_power_of_two()
    }
}

/// Build a Merkle tree over `leaf_hashes`. Pads to a power of two by
/// duplicating the last leaf; a single leaf yields a one-level tree whose
/// root equals that leaf.
pub fn build_tree(leaf_hashes: &[Hash]) -> Result<MerkleTree, GraphError> {
    if leaf_hashes.is_empty() {
        return Err(GraphError::EmptyInput("buildTree: no leaf hashes".into()));
    }

    let original_leaves = leaf_hashes.to_vec();
    let padded_len = next_power_of_two(leaf_hashes.len());

    let mut padded = leaf_hashes.to_vec();
    let last = *leaf_hashes.last().unwrap();
    padded.resize(padded_len, last);

    let mut levels: Vec<Vec<Hash>> = vec![padded];
    while levels.last().unwrap().len() > 1 {
        let current = levels.last().unwrap();
        let mut next = Vec::with_capacity(current.len() / 2);
        for pair in current.chunks(2) {
            next.push(pair_hash(&pair[0], &pair[1]));
        }
        levels.push(next);
    }

    let root = levels.last().unwrap()[0];

    Ok(MerkleTree {
        root,
        levels,
        leaf_count: leaf_hashes.len(),
        original_leaves,
    })
}
