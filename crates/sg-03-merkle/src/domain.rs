//! Merkle tree and proof shapes.

use serde::{Deserialize, Serialize};
use sg_types::Hash;

/// A binary Merkle tree over content hashes. Construction pads the leaf
/// set to a power of two by duplicating the last leaf; `original_leaves`
/// keeps the unpadded view for diffing and reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerkleTree {
    pub root: Hash,
    /// `levels[0]` is the padded leaves, `levels[top]` is `[root]`.
    pub levels: Vec<Vec<Hash>>,
    pub leaf_count: usize,
    pub original_leaves: Vec<Hash>,
}

/// An inclusion proof for a single leaf.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InclusionProof {
    pub leaf: Hash,
    pub leaf_index: usize,
    pub siblings: Vec<Hash>,
    /// `directions[i] == true` means the node at that level is a left child.
    pub directions: Vec<bool>,
    pub root: Hash,
}

/// A single leaf entry inside a batch proof.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchLeaf {
    pub index: usize,
    pub hash: Hash,
}

/// A proof of inclusion for several leaves at once, with siblings
/// deduplicated across the proven set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchProof {
    pub leaves: Vec<BatchLeaf>,
    /// Keyed by `"level:index"`.
    pub siblings: std::collections::BTreeMap<String, Hash>,
    pub root: Hash,
}

/// A proof that the contiguous range `[start_index, end_index)` holds the
/// given leaves, anchored to the root by boundary proofs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeProof {
    pub start_index: usize,
    pub end_index: usize,
    pub leaves: Vec<Hash>,
    pub left_proof: Option<InclusionProof>,
    pub right_proof: Option<InclusionProof>,
    pub root: Hash,
}

/// The result of comparing two trees' unpadded leaf sets by aligned index.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TreeDiff {
    /// Indices present in the new tree beyond the old tree's length.
    pub added: Vec<usize>,
    /// Indices present in the old tree beyond the new tree's length.
    pub removed: Vec<usize>,
    /// Indices present in both but whose hash differs.
    pub modified: Vec<usize>,
    pub old_root: Hash,
    pub new_root: Hash,
}

/// A tree tagged with lineage: its version number, parent root (if any),
/// creation time, and the diff against that parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionedTree {
    pub tree: MerkleTree,
    pub version: u64,
    pub parent_root: Option<Hash>,
    pub timestamp: u64,
    pub diff: Option<TreeDiff>,
}
