//! Diffing two trees by aligned index over their unpadded leaf sets.

use crate::domain::{MerkleTree, TreeDiff};

/// Compare `old` and `new` by aligned index of `original_leaves`.
#[must_use]
pub fn compute_diff(old: &MerkleTree, new: &MerkleTree) -> TreeDiff {
    let mut diff = TreeDiff {
        old_root: old.root,
        new_root: new.root,
        ..Default::default()
    };

    let common = old.original_leaves.len().min(new.original_leaves.len());
    for i in 0..common {
        if old.original_leaves[i] != new.original_leaves[i] {
            diff.modified.push(i);
        }
    }
    for i in common..new.original_leaves.len() {
        diff.added.push(i);
    }
    for i in common..old.original_leaves.len() {
        diff.removed.push(i);
    }

    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::build_tree;
    use sg_01_hasher::content_hash;
    use sg_types::Hash;

    fn leaves(strs: &[&str]) -> Vec<Hash> {
        strs.iter().map(|s| content_hash(s.as_bytes())).collect()
    }

    #[test]
    fn identical_trees_have_empty_diff() {
        let tree = build_tree(&leaves(&["a", "b", "c"])).unwrap();
        let diff = compute_diff(&tree, &tree);
        assert!(diff.added.is_empty());
        assert!(diff.removed.is_empty());
        assert!(diff.modified.is_empty());
    }

    #[test]
    fn appended_leaf_is_added() {
        let old = build_tree(&leaves(&["a", "b"])).unwrap();
        let new = build_tree(&leaves(&["a", "b", "c"])).unwrap();
        let diff = compute_diff(&old, &new);
        assert_eq!(diff.added, vec![2]);
        assert!(diff.removed.is_empty());
        assert!(diff.modified.is_empty());
    }

    #[test]
    fn truncated_leaf_is_removed() {
        let old = build_tree(&leaves(&["a", "b", "c"])).unwrap();
        let new = build_tree(&leaves(&["a", "b"])).unwrap();
        let diff = compute_diff(&old, &new);
        assert_eq!(diff.removed, vec![2]);
        assert!(diff.added.is_empty());
    }

    #[test]
    fn changed_leaf_at_same_index_is_modified() {
        let old = build_tree(&leaves(&["a", "b", "c"])).unwrap();
        let new = build_tree(&leaves(&["a", "x", "c"])).unwrap();
        let diff = compute_diff(&old, &new);
        assert_eq!(diff.modified, vec![1]);
    }
}
