use thiserror::Error;

/// Errors produced while constructing or parsing foundation types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("batch key must not be empty")]
    EmptyBatchKey,

    #[error("invalid date '{input}': expected {expected}")]
    InvalidDate { input: String, expected: &'static str },

    #[error("unknown release status '{0}': expected pending, released, or hold")]
    InvalidStatus(String),

    #[error("unknown fingerprint {what} '{input}'")]
    UnknownVariant { what: &'static str, input: String },

    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}
