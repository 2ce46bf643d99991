//! Inclusion, batch and range proof generation and verification.

use crate::domain::{BatchLeaf, BatchProof, InclusionProof, MerkleTree, RangeProof};
use sg_01_hasher::pair_hash;
use sg_types::{GraphError, Hash};
use std::collections::{BTreeMap, BTreeSet};

/// Generate an inclusion proof for `index`.
///
/// `index` ranges over the padded level (`[0, paddedLen)`), not just the
/// original leaf count: requesting an index that fell into a padded slot
/// is accepted and the proof's `leaf` field is substituted with the last
/// real leaf, since that is the value actually stored at that slot. This
/// is the padding-aware convention chosen for this engine (see DESIGN.md);
/// callers that want the strict `[0, leafCount)` contract should check
/// `index < tree.leaf_count` themselves before calling.
pub fn generate_proof(tree: &MerkleTree, index: usize) -> Result<InclusionProof, GraphError> {
    let padded_len = tree.levels[0].len();
    if index >= padded_len {
        return Err(GraphError::OutOfRange(format!(
            "generateProof: index {index} out of range [0, {padded_len})"
        )));
    }

    let mut siblings = Vec::with_capacity(tree.levels.len() - 1);
    let mut directions = Vec::with_capacity(tree.levels.len() - 1);
    let mut idx = index;
    for level in &tree.levels[..tree.levels.len() - 1] {
        let sibling_idx = idx ^ 1;
        let is_left = idx % 2 == 0;
        siblings.push(level[sibling_idx]);
        directions.push(is_left);
        idx /= 2;
    }

    let leaf = if index < tree.leaf_count {
        tree.levels[0][index]
    } else {
        *tree.original_leaves.last().unwrap()
    };

    Ok(InclusionProof {
        leaf,
        leaf_index: index,
        siblings,
        directions,
        root: tree.root,
    })
}

/// Recompute the root from `proof.leaf` following `proof.directions` and
/// check it equals `proof.root`.
#[must_use]
pub fn verify_proof(proof: &InclusionProof) -> bool {
    if proof.siblings.len() != proof.directions.len() {
        return false;
    }
    let mut current = proof.leaf;
    for (sibling, &is_left) in proof.siblings.iter().zip(proof.directions.iter()) {
        current = if is_left {
            pair_hash(&current, sibling)
        } else {
            pair_hash(sibling, &current)
        };
    }
    current == proof.root
}

/// Generate a proof of inclusion for several indices at once. Siblings are
/// deduplicated by `"level:index"`: a node needed by more than one proof,
/// or computable from another proven node, is recorded only once.
pub fn generate_batch_proof(
    tree: &MerkleTree,
    indices: &[usize],
) -> Result<BatchProof, GraphError> {
    if indices.is_empty() {
        return Err(GraphError::EmptyInput(
            "generateBatchProof: no indices".into(),
        ));
    }
    let padded_len = tree.levels[0].len();
    for &i in indices {
        if i >= padded_len {
            return Err(GraphError::OutOfRange(format!(
                "generateBatchProof: index {i} out of range [0, {padded_len})"
            )));
        }
    }

    let mut leaves: Vec<BatchLeaf> = indices
        .iter()
        .map(|&i| BatchLeaf {
            index: i,
            hash: if i < tree.leaf_count {
                tree.levels[0][i]
            } else {
                *tree.original_leaves.last().unwrap()
            },
        })
        .collect();
    leaves.sort_by_key(|l| l.index);
    leaves.dedup_by_key(|l| l.index);

    let mut known: BTreeSet<usize> = leaves.iter().map(|l| l.index).collect();
    let mut siblings: BTreeMap<String, Hash> = BTreeMap::new();

    for (level, level_nodes) in tree.levels[..tree.levels.len() - 1].iter().enumerate() {
        let mut next_known = BTreeSet::new();
        for &idx in &known {
            let sibling_idx = idx ^ 1;
            if !known.contains(&sibling_idx) {
                siblings
                    .entry(format!("{level}:{sibling_idx}"))
                    .or_insert(level_nodes[sibling_idx]);
            }
            next_known.insert(idx / 2);
        }
        known = next_known;
    }

    Ok(BatchProof {
        leaves,
        siblings,
        root: tree.root,
    })
}

/// Verify a batch proof by reconstructing upward level by level. Only the
/// node that survives to the single-node top level is compared against
/// `proof.root` — a match at any other position is rejected, closing the
/// adversarial-crafting gap of a looser "first `":0"`-suffixed match"
/// check. Returns `false` for an empty leaf set or a malformed proof
/// missing a required sibling.
#[must_use]
pub fn verify_batch_proof(proof: &BatchProof) -> bool {
    if proof.leaves.is_empty() {
        return false;
    }

    let mut known: BTreeMap<usize, Hash> =
        proof.leaves.iter().map(|l| (l.index, l.hash)).collect();
    let mut level = 0usize;

    while known.len() > 1 || !known.contains_key(&0) {
        let mut next: BTreeMap<usize, Hash> = BTreeMap::new();
        for (&idx, &hash) in &known {
            let sibling_idx = idx ^ 1;
            let sibling_hash = if let Some(&h) = known.get(&sibling_idx) {
                h
            } else if let Some(&h) = proof.siblings.get(&format!("{level}:{sibling_idx}")) {
                h
            } else {
                return false;
            };
            let parent = if idx % 2 == 0 {
                pair_hash(&hash, &sibling_hash)
            } else {
                pair_hash(&sibling_hash, &hash)
            };
            next.insert(idx / 2, parent);
        }
        known = next;
        level += 1;
        if level > 256 {
            return false;
        }
    }

    known.get(&0).copied() == Some(proof.root)
}

/// Generate a proof that `[start, end)` holds `leaves`. Boundary proofs
/// are omitted when the range is anchored at an edge of the tree (`start
/// == 0` or `end == leafCount`).
pub fn generate_range_proof(
    tree: &MerkleTree,
    start: usize,
    end: usize,
) -> Result<RangeProof, GraphError> {
    if start >= end || end > tree.leaf_count {
        return Err(GraphError::OutOfRange(format!(
            "generateRangeProof: range [{start}, {end}) invalid for {} leaves",
            tree.leaf_count
        )));
    }

    let leaves = tree.original_leaves[start..end].to_vec();
    let left_proof = if start == 0 {
        None
    } else {
        Some(generate_proof(tree, start)?)
    };
    let right_proof = if end == tree.leaf_count {
        None
    } else {
        Some(generate_proof(tree, end - 1)?)
    };

    Ok(RangeProof {
        start_index: start,
        end_index: end,
        leaves,
        left_proof,
        right_proof,
        root: tree.root,
    })
}

/// Validate boundary proofs against `proof.root`, check the boundary
/// leaves match the first/last entries of `proof.leaves`, and check
/// `end - start == leaves.len()`.
#[must_use]
pub fn verify_range_proof(proof: &RangeProof) -> bool {
    if proof.end_index <= proof.start_index {
        return false;
    }
    if proof.end_index - proof.start_index != proof.leaves.len() {
        return false;
    }

    if let Some(lp) = &proof.left_proof {
        if lp.root != proof.root || !verify_proof(lp) {
            return false;
        }
        if lp.leaf_index != proof.start_index || lp.leaf != proof.leaves[0] {
            return false;
        }
    }
    if let Some(rp) = &proof.right_proof {
        if rp.root != proof.root || !verify_proof(rp) {
            return false;
        }
        if rp.leaf_index != proof.end_index - 1 || rp.leaf != *proof.leaves.last().unwrap() {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::build_tree;
    use sg_01_hasher::content_hash;

    fn leaves4() -> Vec<Hash> {
        ["a", "b", "c", "d"].iter().map(|s| content_hash(s.as_bytes())).collect()
    }

    #[test]
    fn merkle_integrity_scenario() {
        let tree = build_tree(&leaves4()).unwrap();
        let proof = generate_proof(&tree, 2).unwrap();
        assert_eq!(proof.siblings.len(), 2);
        assert!(verify_proof(&proof));

        let mut tampered = proof.clone();
        tampered.leaf = content_hash(b"tampered_hash_aaaa");
        assert!(!verify_proof(&tampered));

        assert!(matches!(
            build_tree(&[]),
            Err(GraphError::EmptyInput(_))
        ));
    }

    #[test]
    fn mutating_sibling_or_direction_breaks_verification() {
        let tree = build_tree(&leaves4()).unwrap();
        let proof = generate_proof(&tree, 1).unwrap();
        assert!(verify_proof(&proof));

        let mut bad_sibling = proof.clone();
        bad_sibling.siblings[0] = content_hash(b"nope");
        assert!(!verify_proof(&bad_sibling));

        let mut bad_direction = proof.clone();
        bad_direction.directions[0] = !bad_direction.directions[0];
        assert!(!verify_proof(&bad_direction));
    }

    #[test]
    fn every_leaf_index_verifies() {
        let tree = build_tree(&leaves4()).unwrap();
        for i in 0..tree.leaf_count {
            let proof = generate_proof(&tree, i).unwrap();
            assert!(verify_proof(&proof));
        }
    }

    #[test]
    fn index_out_of_padded_range_is_rejected() {
        let tree = build_tree(&leaves4()).unwrap();
        assert!(matches!(
            generate_proof(&tree, 99),
            Err(GraphError::OutOfRange(_))
        ));
    }

    #[test]
    fn padded_slot_index_substitutes_last_real_leaf() {
        let leaves: Vec<Hash> = ["a", "b", "c"].iter().map(|s| content_hash(s.as_bytes())).collect();
        let tree = build_tree(&leaves).unwrap();
        // leaf_count == 3, padded_len == 4; index 3 is the padded slot.
        let proof = generate_proof(&tree, 3).unwrap();
        assert_eq!(proof.leaf, *tree.original_leaves.last().unwrap());
        assert!(verify_proof(&proof));
    }

    #[test]
    fn batch_proof_deduplication_scenario() {
        let tree = build_tree(&leaves4()).unwrap();
        let batch = generate_batch_proof(&tree, &[0, 1]).unwrap();
        assert!(batch.siblings.len() <= 2);
        assert!(verify_batch_proof(&batch));
    }

    #[test]
    fn batch_proof_sibling_set_is_subset_of_individual_proofs() {
        let tree = build_tree(&leaves4()).unwrap();
        let batch = generate_batch_proof(&tree, &[0, 1]).unwrap();

        let mut individual: BTreeSet<Hash> = BTreeSet::new();
        for &i in &[0usize, 1] {
            let p = generate_proof(&tree, i).unwrap();
            individual.extend(p.siblings);
        }
        for h in batch.siblings.values() {
            assert!(individual.contains(h));
        }
    }

    #[test]
    fn verify_batch_proof_rejects_empty_leaf_set() {
        let tree = build_tree(&leaves4()).unwrap();
        let mut batch = generate_batch_proof(&tree, &[0]).unwrap();
        batch.leaves.clear();
        assert!(!verify_batch_proof(&batch));
    }

    #[test]
    fn verify_batch_proof_rejects_non_top_level_match() {
        // A proof crafted so an intermediate node happens to equal the root
        // must not verify; only the index-0 top-level node may match root.
        let tree = build_tree(&leaves4()).unwrap();
        let mut batch = generate_batch_proof(&tree, &[0, 1]).unwrap();
        batch.root = Hash::from_bytes([0xEE; 32]);
        assert!(!verify_batch_proof(&batch));
    }

    #[test]
    fn range_proof_full_range_omits_both_boundaries() {
        let tree = build_tree(&leaves4()).unwrap();
        let proof = generate_range_proof(&tree, 0, 4).unwrap();
        assert!(proof.left_proof.is_none());
        assert!(proof.right_proof.is_none());
        assert!(verify_range_proof(&proof));
    }

    #[test]
    fn range_proof_interior_range_has_both_boundaries() {
        let tree = build_tree(&leaves4()).unwrap();
        let proof = generate_range_proof(&tree, 1, 3).unwrap();
        assert!(proof.left_proof.is_some());
        assert!(proof.right_proof.is_some());
        assert!(verify_range_proof(&proof));
        assert_eq!(proof.leaves.len(), 2);
    }

    #[test]
    fn range_proof_rejects_invalid_bounds() {
        let tree = build_tree(&leaves4()).unwrap();
        assert!(generate_range_proof(&tree, 2, 1).is_err());
        assert!(generate_range_proof(&tree, 0, 5).is_err());
    }
}
