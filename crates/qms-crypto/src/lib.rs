//! Hashing and fingerprinting for batch record ledgers.
//!
//! Provides domain-separated BLAKE3 hashing, streaming file digests for QC
//! data, a canonical item encoding, binary Merkle trees with inclusion
//! proofs, and the dual-mode [`FingerprintEngine`].
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.

pub mod canonical;
pub mod fingerprint;
pub mod hasher;
pub mod merkle;

pub use canonical::{CanonicalItem, Fingerprintable};
pub use fingerprint::FingerprintEngine;
pub use hasher::{ContentHasher, HasherError};
pub use merkle::{MerkleProof, MerkleTree, Side};
