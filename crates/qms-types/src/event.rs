use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fingerprint::Fingerprint;
use crate::record::ReleaseStatus;

/// A single immutable operation recorded against a batch.
///
/// Events are published once and never modified. The set of kinds is closed:
/// reconstruction matches on every variant, so adding a kind forces every
/// fold to handle it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatchEvent {
    Created {
        manufacture_date: NaiveDate,
        expiration_date: NaiveDate,
    },
    QcTestAppended {
        name: String,
        result: String,
        hash: String,
    },
    DeviationAppended {
        id: String,
    },
    CapaAppended {
        id: String,
    },
    OosAppended {
        id: String,
    },
    StatusUpdated {
        status: ReleaseStatus,
    },
    ExpirationUpdated {
        date: NaiveDate,
    },
    /// A fingerprint published for later comparison. Does not alter the record.
    FingerprintRecorded {
        fingerprint: Fingerprint,
    },
}

impl BatchEvent {
    /// Discriminant of this event, without its payload.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Created { .. } => EventKind::Created,
            Self::QcTestAppended { .. } => EventKind::QcTestAppended,
            Self::DeviationAppended { .. } => EventKind::DeviationAppended,
            Self::CapaAppended { .. } => EventKind::CapaAppended,
            Self::OosAppended { .. } => EventKind::OosAppended,
            Self::StatusUpdated { .. } => EventKind::StatusUpdated,
            Self::ExpirationUpdated { .. } => EventKind::ExpirationUpdated,
            Self::FingerprintRecorded { .. } => EventKind::FingerprintRecorded,
        }
    }
}

/// Classification of batch events, for logs and summaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Created,
    QcTestAppended,
    DeviationAppended,
    CapaAppended,
    OosAppended,
    StatusUpdated,
    ExpirationUpdated,
    FingerprintRecorded,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "Created",
            Self::QcTestAppended => "QcTestAppended",
            Self::DeviationAppended => "DeviationAppended",
            Self::CapaAppended => "CapaAppended",
            Self::OosAppended => "OosAppended",
            Self::StatusUpdated => "StatusUpdated",
            Self::ExpirationUpdated => "ExpirationUpdated",
            Self::FingerprintRecorded => "FingerprintRecorded",
        };
        write!(f, "{s}")
    }
}

/// An event as retrieved from the ledger, with its acceptance position.
///
/// `seq` is an ordering key assigned by the ledger, not wall-clock time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencedEvent {
    pub seq: u64,
    pub event: BatchEvent,
}

impl SequencedEvent {
    /// Pair an event with the sequence marker the ledger assigned it.
    pub fn new(seq: u64, event: BatchEvent) -> Self {
        Self { seq, event }
    }
}
