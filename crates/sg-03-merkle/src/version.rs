//! Versioned trees: lineage and an embedded diff against the parent.

use crate::diff::compute_diff;
use crate::domain::{MerkleTree, VersionedTree};

/// Wrap `tree` as version 0 with no parent.
#[must_use]
pub fn create_version(tree: MerkleTree, timestamp: u64) -> VersionedTree {
    VersionedTree {
        tree,
        version: 0,
        parent_root: None,
        timestamp,
        diff: None,
    }
}

/// Wrap `tree` as the next version after `parent`, with a diff against it.
#[must_use]
pub fn create_new_version(parent: &VersionedTree, tree: MerkleTree, timestamp: u64) -> VersionedTree {
    let diff = compute_diff(&parent.tree, &tree);
    VersionedTree {
        parent_root: Some(parent.tree.root),
        version: parent.version + 1,
        diff: Some(diff),
        tree,
        timestamp,
    }
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
    fn first_version_has_no_parent_or_diff() {
        let tree = build_tree(&leaves(&["a", "b"])).unwrap();
        let v0 = create_version(tree, 1_000);
        assert_eq!(v0.version, 0);
        assert!(v0.parent_root.is_none());
        assert!(v0.diff.is_none());
    }

    #[test]
    fn new_version_links_to_parent_and_carries_diff() {
        let v0 = create_version(build_tree(&leaves(&["a", "b"])).unwrap(), 1_000);
        let tree1 = build_tree(&leaves(&["a", "b", "c"])).unwrap();
        let v1 = create_new_version(&v0, tree1, 2_000);

        assert_eq!(v1.version, 1);
        assert_eq!(v1.parent_root, Some(v0.tree.root));
        let diff = v1.diff.unwrap();
        assert_eq!(diff.added, vec![2]);
        assert_eq!(diff.old_root, v0.tree.root);
        assert_eq!(diff.new_root, v1.tree.root);
    }
}
