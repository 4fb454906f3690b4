//! Dual-mode content fingerprints.
//!
//! Concurrent auditors may append events in different relative orders, so a
//! record has two fingerprints:
//!
//! - **order-dependent**: Merkle root over item digests in arrival order.
//!   Catches content tampering and any reordering.
//! - **order-independent**: Merkle root over the same digests sorted
//!   byte-lexicographically. Catches content tampering, membership and
//!   multiplicity changes, but tolerates reordering.
//!
//! Both roots are wrapped with the mode, scope, and item count under the
//! `qms-fingerprint-v1` domain. The item encoding lives in
//! [`crate::canonical`] and is versioned through the domain tags; changing
//! either requires a new tag so previously published fingerprints stay
//! verifiable.

use qms_types::{Digest, Fingerprint, FingerprintMode, FingerprintScope};

use crate::canonical::{CanonicalItem, Fingerprintable};
use crate::hasher::ContentHasher;
use crate::merkle::{MerkleProof, MerkleTree};

/// Computes and verifies fingerprints. Stateless.
pub struct FingerprintEngine;

impl FingerprintEngine {
    pub fn compute<T: Fingerprintable + ?Sized>(
        target: &T,
        scope: FingerprintScope,
        mode: FingerprintMode,
    ) -> Fingerprint {
        Self::compute_items(&target.canonical_items(scope), scope, mode)
    }

    /// Fingerprint an explicit item list.
    pub fn compute_items(
        items: &[CanonicalItem],
        scope: FingerprintScope,
        mode: FingerprintMode,
    ) -> Fingerprint {
        let tree = Self::tree(items, mode);
        Fingerprint {
            digest: seal(&tree, scope, mode),
            mode,
            scope,
        }
    }

    /// Recompute with the expected fingerprint's scope and mode and compare.
    pub fn verify<T: Fingerprintable + ?Sized>(target: &T, expected: &Fingerprint) -> bool {
        let actual = Self::compute(target, expected.scope, expected.mode);
        if actual.digest != expected.digest {
            tracing::debug!(
                scope = %expected.scope,
                mode = %expected.mode,
                expected = %expected.digest.short_hex(),
                actual = %actual.digest.short_hex(),
                "fingerprint mismatch"
            );
            return false;
        }
        true
    }

    /// Merkle proof that item `index` (in the target's own order) is covered
    /// by the fingerprint's root. For order-independent fingerprints the
    /// proof path follows the item's sorted position.
    pub fn inclusion_proof<T: Fingerprintable + ?Sized>(
        target: &T,
        scope: FingerprintScope,
        mode: FingerprintMode,
        index: usize,
    ) -> Option<MerkleProof> {
        let items = target.canonical_items(scope);
        let leaf = ContentHasher::ITEM.hash(items.get(index)?.as_bytes());
        let tree = Self::tree(&items, mode);
        let position = match mode {
            FingerprintMode::OrderDependent => index,
            FingerprintMode::OrderIndependent => tree.leaves().iter().position(|d| *d == leaf)?,
        };
        tree.proof(position)
    }

    /// Merkle root a published fingerprint commits to, for checking proofs.
    pub fn root<T: Fingerprintable + ?Sized>(
        target: &T,
        scope: FingerprintScope,
        mode: FingerprintMode,
    ) -> Digest {
        Self::tree(&target.canonical_items(scope), mode).root()
    }

    fn tree(items: &[CanonicalItem], mode: FingerprintMode) -> MerkleTree {
        let mut leaves: Vec<Digest> = items
            .iter()
            .map(|item| ContentHasher::ITEM.hash(item.as_bytes()))
            .collect();
        if mode == FingerprintMode::OrderIndependent {
            leaves.sort_unstable();
        }
        MerkleTree::from_leaves(leaves)
    }
}

fn seal(tree: &MerkleTree, scope: FingerprintScope, mode: FingerprintMode) -> Digest {
    let envelope = CanonicalItem::new(mode.as_str())
        .field(scope.as_str())
        .field(&tree.leaf_count().to_string())
        .field(&tree.root().to_hex());
    ContentHasher::FINGERPRINT.hash(envelope.as_bytes())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use qms_types::{parse_calendar_date, BatchKey, BatchRecord, QcTest, ReleaseStatus};

    use super::*;

    use qms_types::FingerprintMode::{OrderDependent, OrderIndependent};

    fn qc(name: &str) -> QcTest {
        QcTest {
            test_name: name.into(),
            test_result: "Pass".into(),
            test_hash: format!("hash-{name}"),
        }
    }

    fn record(tests: &[&str]) -> BatchRecord {
        let mut r = BatchRecord::created(
            BatchKey::new("BATCH123").unwrap(),
            parse_calendar_date("2023-10-01").unwrap(),
            parse_calendar_date("2025-10-01").unwrap(),
        );
        r.qc_tests = tests.iter().map(|n| qc(n)).collect();
        r
    }

    #[test]
    fn reordered_qc_tests_split_the_modes() {
        let ab = record(&["A", "B"]);
        let ba = record(&["B", "A"]);
        for scope in [FingerprintScope::QcTests, FingerprintScope::Record] {
            assert_eq!(
                FingerprintEngine::compute(&ab, scope, OrderIndependent),
                FingerprintEngine::compute(&ba, scope, OrderIndependent)
            );
            assert_ne!(
                FingerprintEngine::compute(&ab, scope, OrderDependent),
                FingerprintEngine::compute(&ba, scope, OrderDependent)
            );
        }
    }

    #[test]
    fn modes_and_scopes_never_share_digests() {
        let r = record(&[]);
        let dep = FingerprintEngine::compute(&r, FingerprintScope::Capa, OrderDependent);
        let indep = FingerprintEngine::compute(&r, FingerprintScope::Capa, OrderIndependent);
        let dev = FingerprintEngine::compute(&r, FingerprintScope::Deviations, OrderDependent);
        assert_ne!(dep.digest, indep.digest);
        assert_ne!(dep.digest, dev.digest);
    }

    #[test]
    fn multiplicity_matters_in_both_modes() {
        let once = record(&["A", "B", "C"]);
        let twice = record(&["A", "B", "C", "C"]);
        for mode in FingerprintMode::ALL {
            assert_ne!(
                FingerprintEngine::compute(&once, FingerprintScope::QcTests, mode),
                FingerprintEngine::compute(&twice, FingerprintScope::QcTests, mode)
            );
        }
    }

    #[test]
    fn verify_fails_after_any_single_field_change() {
        let original = {
            let mut r = record(&["Sterility Test", "Endotoxin"]);
            r.deviations.push("DEV-1".into());
            r.capa.push("CAPA-1".into());
            r.oos_investigations.push("OOS-1".into());
            r
        };
        let tamperings: Vec<Box<dyn Fn(&mut BatchRecord)>> = vec![
            Box::new(|r: &mut BatchRecord| r.batch_number = BatchKey::new("BATCH124").unwrap()),
            Box::new(|r: &mut BatchRecord| r.manufacture_date = parse_calendar_date("2023-10-02").unwrap()),
            Box::new(|r: &mut BatchRecord| r.expiration_date = parse_calendar_date("2026-10-01").unwrap()),
            Box::new(|r: &mut BatchRecord| r.release_status = ReleaseStatus::Released),
            Box::new(|r: &mut BatchRecord| r.qc_tests[0].test_result = "Fail".into()),
            Box::new(|r: &mut BatchRecord| r.qc_tests[1].test_hash = "forged".into()),
            Box::new(|r: &mut BatchRecord| r.deviations[0] = "DEV-2".into()),
            Box::new(|r: &mut BatchRecord| r.capa.clear()),
            Box::new(|r: &mut BatchRecord| r.oos_investigations.push("OOS-2".into())),
        ];

        for mode in FingerprintMode::ALL {
            let expected = FingerprintEngine::compute(&original, FingerprintScope::Record, mode);
            assert!(FingerprintEngine::verify(&original, &expected));
            for (i, tamper) in tamperings.iter().enumerate() {
                let mut copy = original.clone();
                tamper(&mut copy);
                assert!(
                    !FingerprintEngine::verify(&copy, &expected),
                    "tampering #{i} went unnoticed in {mode} mode"
                );
            }
        }
    }

    #[test]
    fn empty_collections_fingerprint_stably() {
        let a = FingerprintEngine::compute(&record(&[]), FingerprintScope::QcTests, OrderDependent);
        let b = FingerprintEngine::compute(&record(&[]), FingerprintScope::QcTests, OrderDependent);
        assert_eq!(a, b);
    }

    #[test]
    fn inclusion_proofs_bind_to_the_fingerprint_root() {
        let r = record(&["A", "B", "C"]);
        for mode in FingerprintMode::ALL {
            let root = FingerprintEngine::root(&r, FingerprintScope::QcTests, mode);
            for i in 0..3 {
                let proof =
                    FingerprintEngine::inclusion_proof(&r, FingerprintScope::QcTests, mode, i)
                        .unwrap();
                assert_eq!(proof.root, root);
                assert!(proof.verify());
            }
            assert!(
                FingerprintEngine::inclusion_proof(&r, FingerprintScope::QcTests, mode, 3).is_none()
            );
        }
    }

    fn names_with_permutation() -> impl Strategy<Value = (Vec<String>, Vec<String>)> {
        prop::collection::vec("[a-z]{1,6}", 0..12).prop_flat_map(|names| {
            let shuffled = Just(names.clone()).prop_shuffle();
            (Just(names), shuffled)
        })
    }

    proptest! {
        #[test]
        fn order_independent_ignores_permutation((names, shuffled) in names_with_permutation()) {
            let a: Vec<&str> = names.iter().map(String::as_str).collect();
            let b: Vec<&str> = shuffled.iter().map(String::as_str).collect();
            prop_assert_eq!(
                FingerprintEngine::compute(&record(&a), FingerprintScope::Record, OrderIndependent),
                FingerprintEngine::compute(&record(&b), FingerprintScope::Record, OrderIndependent)
            );
        }

        #[test]
        fn order_dependent_detects_distinct_reorderings(
            names in prop::collection::hash_set("[a-z]{1,6}", 2..8),
        ) {
            let forward: Vec<&str> = names.iter().map(String::as_str).collect();
            let mut reversed = forward.clone();
            reversed.reverse();
            prop_assert_ne!(
                FingerprintEngine::compute(&record(&forward), FingerprintScope::QcTests, OrderDependent),
                FingerprintEngine::compute(&record(&reversed), FingerprintScope::QcTests, OrderDependent)
            );
        }
    }
}
