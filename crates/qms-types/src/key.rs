use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Unique, immutable identifier of one manufacturing batch.
///
/// The key doubles as the ledger stream key under which every event for the
/// batch is published. Surrounding whitespace is stripped; an empty key is
/// rejected.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BatchKey(String);

impl BatchKey {
    /// Validate a batch key. Surrounding whitespace is trimmed and the
    /// remainder must be non-empty.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, TypeError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TypeError::EmptyBatchKey);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The key as published on the stream.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BatchKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for BatchKey {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for BatchKey {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BatchKey> for String {
    fn from(key: BatchKey) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_whitespace() {
        let key = BatchKey::new("  BATCH123 ").unwrap();
        assert_eq!(key.as_str(), "BATCH123");
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(BatchKey::new("").unwrap_err(), TypeError::EmptyBatchKey);
        assert_eq!(BatchKey::new(" \t").unwrap_err(), TypeError::EmptyBatchKey);
    }

    #[test]
    fn deserialization_validates() {
        assert!(serde_json::from_str::<BatchKey>("\"\"").is_err());
        let key: BatchKey = serde_json::from_str("\"LOT-7\"").unwrap();
        assert_eq!(key.to_string(), "LOT-7");
    }
}
