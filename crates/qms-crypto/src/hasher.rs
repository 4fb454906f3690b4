use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use qms_types::Digest;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag that is prepended to every hash
/// computation, so a fingerprint item and a Merkle node with identical bytes
/// never collide.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for individual canonical fingerprint items.
    pub const ITEM: Self = Self {
        domain: "qms-fp-item-v1",
    };
    /// Hasher for the final fingerprint envelope.
    pub const FINGERPRINT: Self = Self {
        domain: "qms-fingerprint-v1",
    };

    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> Digest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        Digest::from_hash(*hasher.finalize().as_bytes())
    }

    pub fn verify(&self, data: &[u8], expected: &Digest) -> bool {
        self.hash(data) == *expected
    }

    pub fn domain(&self) -> &str {
        self.domain
    }

    /// Plain BLAKE3 over everything `reader` yields.
    ///
    /// No domain tag: QC data digests must match what `b3sum` reports for
    /// the same file.
    pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<Digest> {
        let mut hasher = blake3::Hasher::new();
        io::copy(&mut reader, &mut hasher)?;
        Ok(Digest::from_hash(*hasher.finalize().as_bytes()))
    }

    /// Stream a file through BLAKE3. The handle is dropped on every path.
    pub fn hash_file(path: impl AsRef<Path>) -> Result<Digest, HasherError> {
        let path = path.as_ref();
        let io_err = |e: io::Error| HasherError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        };
        let file = File::open(path).map_err(io_err)?;
        let digest = Self::hash_reader(file).map_err(io_err)?;
        tracing::debug!(path = %path.display(), digest = %digest.short_hex(), "hashed QC data file");
        Ok(digest)
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum HasherError {
    #[error("cannot read '{path}': {reason}")]
    Io { path: String, reason: String },
}
