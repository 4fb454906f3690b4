use std::fmt;
use std::time::Duration;

use qms_crypto::HasherError;
use qms_types::TypeError;

/// Errors produced by encoding, ledger access, and reconstruction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("batch {0} already has a creation event")]
    DuplicateCreation(String),

    #[error("cannot reach ledger node: {0}")]
    Connection(String),

    #[error("ledger node rejected credentials: {0}")]
    Authentication(String),

    #[error("ledger call timed out after {0:?}")]
    Timeout(Duration),

    #[error("ledger node returned error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed ledger data: {0}")]
    Decode(String),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::DuplicateCreation(_) => ErrorKind::DuplicateCreation,
            Self::Connection(_) | Self::Rpc { .. } => ErrorKind::Connection,
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Decode(_) => ErrorKind::Decode,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<TypeError> for LedgerError {
    fn from(err: TypeError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<HasherError> for LedgerError {
    fn from(err: HasherError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Stable, user-visible classification of every failure in the system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    DuplicateCreation,
    Connection,
    Authentication,
    Timeout,
    FingerprintMismatch,
    Decode,
    Config,
    /// Local failure outside the ledger, such as writing command output.
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "ValidationError",
            Self::NotFound => "NotFoundError",
            Self::DuplicateCreation => "DuplicateCreationError",
            Self::Connection => "ConnectionError",
            Self::Authentication => "AuthenticationError",
            Self::Timeout => "TimeoutError",
            Self::FingerprintMismatch => "FingerprintMismatchError",
            Self::Decode => "DecodeError",
            Self::Config => "ConfigError",
            Self::Io => "IoError",
        }
    }

    /// Process exit code reported by the CLI for this kind.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Validation => 2,
            Self::NotFound => 3,
            Self::DuplicateCreation => 4,
            Self::Connection => 5,
            Self::Authentication => 6,
            Self::Timeout => 7,
            Self::FingerprintMismatch => 8,
            Self::Decode => 9,
            Self::Config => 10,
            Self::Io => 1,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_errors_classify_as_connection() {
        let err = LedgerError::Rpc {
            code: -1,
            message: "boom".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[test]
    fn type_errors_become_validation() {
        let err: LedgerError = TypeError::EmptyBatchKey.into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "batch key must not be empty");
    }

    #[test]
    fn exit_codes_are_distinct_and_nonzero() {
        let kinds = [
            ErrorKind::Validation,
            ErrorKind::NotFound,
            ErrorKind::DuplicateCreation,
            ErrorKind::Connection,
            ErrorKind::Authentication,
            ErrorKind::Timeout,
            ErrorKind::FingerprintMismatch,
            ErrorKind::Decode,
            ErrorKind::Config,
            ErrorKind::Io,
        ];
        let mut codes: Vec<u8> = kinds.iter().map(ErrorKind::exit_code).collect();
        assert!(codes.iter().all(|c| *c != 0));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }
}
