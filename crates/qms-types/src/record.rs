use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::key::BatchKey;

/// Release disposition of a batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseStatus {
    #[default]
    Pending,
    Released,
    Hold,
}

impl ReleaseStatus {
    /// Lowercase name as written to the ledger.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Released => "released",
            Self::Hold => "hold",
        }
    }
}

impl fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReleaseStatus {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "released" => Ok(Self::Released),
            "hold" => Ok(Self::Hold),
            _ => Err(TypeError::InvalidStatus(s.to_string())),
        }
    }
}

/// One quality-control test result attached to a batch.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QcTest {
    pub test_name: String,
    pub test_result: String,
    /// Hex digest of the raw test data, supplied or computed from a file.
    pub test_hash: String,
}

/// Materialized current state of one batch.
///
/// Never persisted on its own; always derived by folding the batch's event
/// stream. The serialized field names are the contract consumed by record
/// renderers and must not change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub batch_number: BatchKey,
    pub manufacture_date: NaiveDate,
    pub expiration_date: NaiveDate,
    pub release_status: ReleaseStatus,
    pub qc_tests: Vec<QcTest>,
    pub deviations: Vec<String>,
    #[serde(rename = "CAPA")]
    pub capa: Vec<String>,
    #[serde(rename = "OOS_investigations")]
    pub oos_investigations: Vec<String>,
}

impl BatchRecord {
    /// Initial state produced by a batch's creation event.
    pub fn created(
        batch_number: BatchKey,
        manufacture_date: NaiveDate,
        expiration_date: NaiveDate,
    ) -> Self {
        Self {
            batch_number,
            manufacture_date,
            expiration_date,
            release_status: ReleaseStatus::Pending,
            qc_tests: Vec::new(),
            deviations: Vec::new(),
            capa: Vec::new(),
            oos_investigations: Vec::new(),
        }
    }
}
