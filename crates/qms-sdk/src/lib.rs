//! High-level SDK for the batch record ledger.
//!
//! [`BatchRegistry`] is the entry point for applications: it validates and
//! publishes write operations, answers record queries by reconstruction, and
//! computes or verifies fingerprints.

pub mod error;
pub mod receipt;
pub mod registry;

pub use error::{SdkError, SdkResult};
pub use receipt::{FingerprintCheck, FingerprintReceipt, WriteReceipt};
pub use registry::BatchRegistry;

// Re-export key types
pub use qms_ledger::{
    ErrorKind, InMemoryLedger, LedgerError, LedgerReader, LedgerWriter, Reconstruction, RpcConfig,
    RpcLedger, TransitionPolicy, VersionDiff,
};
pub use qms_types::{
    BatchKey, BatchRecord, Fingerprint, FingerprintMode, FingerprintScope, QcTest, ReleaseStatus,
    TypeError, VersionHistory,
};
