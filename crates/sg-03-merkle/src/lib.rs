//! # Merkle Engine
//!
//! Tree construction, inclusion/batch/range proofs, diffs and versioned
//! trees over 32-byte content hashes. Every operation here is in-memory
//! and non-suspending: no store I/O happens in this crate.

mod diff;
mod domain;
mod proofs;
mod tree;
mod version;

pub use diff::compute_diff;
pub use domain::{BatchLeaf, BatchProof, InclusionProof, MerkleTree, RangeProof, TreeDiff, VersionedTree};
pub use proofs::{
    generate_batch_proof, generate_proof, generate_range_proof, verify_batch_proof, verify_proof,
    verify_range_proof,
};
pub use tree::build_tree;
pub use version::{create_new_version, create_version};
