use qms_types::Digest;
use serde::{Deserialize, Serialize};

/// Position of a sibling relative to the running hash in a proof path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// Binary Merkle tree over fingerprint item digests.
///
/// Leaf order is significant: the fingerprint engine feeds leaves in arrival
/// order for order-dependent fingerprints and in sorted order for
/// order-independent ones. An odd node at any level is paired with itself,
/// so the root alone does not pin the leaf count; callers that care about
/// multiplicity must commit to `leaf_count` separately.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    /// `levels[0]` holds the leaves, the last level holds the root.
    levels: Vec<Vec<Digest>>,
}

impl MerkleTree {
    pub fn from_leaves(leaves: Vec<Digest>) -> Self {
        if leaves.is_empty() {
            return Self { levels: vec![] };
        }

        let mut levels = vec![leaves];
        while let Some(current) = levels.last().filter(|level| level.len() > 1) {
            let next: Vec<Digest> = current
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hash_pair(left, right),
                    [single] => hash_pair(single, single),
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                })
                .collect();
            levels.push(next);
        }
        Self { levels }
    }

    /// Root digest, or the null digest for an empty tree.
    pub fn root(&self) -> Digest {
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or_else(Digest::null)
    }

    pub fn leaf_count(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    pub fn leaves(&self) -> &[Digest] {
        self.levels.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Inclusion proof for the leaf at `index`, if it exists.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        let leaf = *self.leaves().get(index)?;
        let mut path = Vec::with_capacity(self.levels.len().saturating_sub(1));
        let mut idx = index;

        for level in &self.levels[..self.levels.len() - 1] {
            let (sibling_idx, side) = if idx % 2 == 0 {
                (idx + 1, Side::Right)
            } else {
                (idx - 1, Side::Left)
            };
            let sibling = level.get(sibling_idx).copied().unwrap_or(level[idx]);
            path.push((sibling, side));
            idx /= 2;
        }

        Some(MerkleProof {
            leaf,
            path,
            root: self.root(),
        })
    }
}

/// Proof that one item digest is covered by a Merkle root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf: Digest,
    pub path: Vec<(Digest, Side)>,
    pub root: Digest,
}

impl MerkleProof {
    pub fn verify(&self) -> bool {
        let computed = self
            .path
            .iter()
            .fold(self.leaf, |current, (sibling, side)| match side {
                Side::Left => hash_pair(sibling, &current),
                Side::Right => hash_pair(&current, sibling),
            });
        computed == self.root
    }
}

fn hash_pair(left: &Digest, right: &Digest) -> Digest {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"qms-merkle-v1:");
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    Digest::from_hash(*hasher.finalize().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(seed: u8) -> Digest {
        Digest::of(&[seed])
    }

    #[test]
    fn empty_tree_has_null_root() {
        let tree = MerkleTree::from_leaves(vec![]);
        assert!(tree.root().is_null());
        assert_eq!(tree.leaf_count(), 0);
        assert!(tree.proof(0).is_none());
    }

    #[test]
    fn single_leaf_is_root() {
        let tree = MerkleTree::from_leaves(vec![leaf(1)]);
        assert_eq!(tree.root(), leaf(1));
        assert!(tree.proof(0).unwrap().verify());
    }

    #[test]
    fn leaf_order_changes_root() {
        let ab = MerkleTree::from_leaves(vec![leaf(1), leaf(2)]);
        let ba = MerkleTree::from_leaves(vec![leaf(2), leaf(1)]);
        assert_ne!(ab.root(), ba.root());
    }

    #[test]
    fn proofs_verify_for_odd_sized_trees() {
        let leaves: Vec<Digest> = (0..7).map(leaf).collect();
        let tree = MerkleTree::from_leaves(leaves.clone());
        for (i, expected) in leaves.iter().enumerate() {
            let proof = tree.proof(i).unwrap();
            assert_eq!(&proof.leaf, expected);
            assert_eq!(proof.path.len(), 3);
            assert!(proof.verify(), "proof for leaf {i} should verify");
        }
    }

    #[test]
    fn tampered_proof_fails() {
        let tree = MerkleTree::from_leaves((0..4).map(leaf).collect());
        let mut proof = tree.proof(1).unwrap();
        proof.leaf = leaf(99);
        assert!(!proof.verify());

        let mut proof = tree.proof(2).unwrap();
        proof.path[0].1 = Side::Left;
        assert!(!proof.verify());
    }

    #[test]
    fn odd_duplication_hides_count_from_root() {
        // Documents why fingerprints commit to the leaf count separately.
        let three = MerkleTree::from_leaves(vec![leaf(1), leaf(2), leaf(3)]);
        let four = MerkleTree::from_leaves(vec![leaf(1), leaf(2), leaf(3), leaf(3)]);
        assert_eq!(three.root(), four.root());
        assert_ne!(three.leaf_count(), four.leaf_count());
    }

    #[test]
    fn proof_survives_json() {
        let tree = MerkleTree::from_leaves((0..5).map(leaf).collect());
        let proof = tree.proof(4).unwrap();
        let json = serde_json::to_string(&proof).unwrap();
        let parsed: MerkleProof = serde_json::from_str(&json).unwrap();
        assert!(parsed.verify());
    }
}
