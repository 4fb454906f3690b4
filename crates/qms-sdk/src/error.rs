use qms_ledger::{ErrorKind, LedgerError};
use qms_types::{Fingerprint, TypeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("fingerprint mismatch for batch {key}: expected {expected}, computed {actual}")]
    FingerprintMismatch {
        key: String,
        expected: Fingerprint,
        actual: Fingerprint,
    },
}

impl SdkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Ledger(err) => err.kind(),
            Self::FingerprintMismatch { .. } => ErrorKind::FingerprintMismatch,
        }
    }
}

impl From<TypeError> for SdkError {
    fn from(err: TypeError) -> Self {
        Self::Ledger(err.into())
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
