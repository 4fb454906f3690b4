//! Foundation types for tamper-evident batch records.
//!
//! Every other `qms-*` crate depends on `qms-types`. A batch record is never
//! stored directly: the ledger holds an append-only stream of [`BatchEvent`]s
//! per [`BatchKey`], and the current [`BatchRecord`] plus its
//! [`VersionHistory`] are derived from that stream on demand.
//!
//! # Key Types
//!
//! - [`BatchKey`]: Immutable, non-empty batch identifier
//! - [`BatchEvent`]: Closed set of operations recorded on the ledger
//! - [`SequencedEvent`]: An event paired with its ledger sequence marker
//! - [`BatchRecord`]: Materialized current state of one batch
//! - [`VersionHistory`]: Scalar overwrites observed while folding events
//! - [`Fingerprint`]: Order-dependent or order-independent content digest
//! - [`DateQuery`]: Partial date (`YYYY`, `YYYY-MM`, `YYYY-MM-DD`) filter

pub mod date;
pub mod digest;
pub mod error;
pub mod event;
pub mod fingerprint;
pub mod history;
pub mod key;
pub mod record;

pub use date::{parse_calendar_date, DateQuery};
pub use digest::Digest;
pub use error::TypeError;
pub use event::{BatchEvent, EventKind, SequencedEvent};
pub use fingerprint::{Fingerprint, FingerprintMode, FingerprintScope};
pub use history::{HistoryField, VersionChange, VersionHistory};
pub use key::BatchKey;
pub use record::{BatchRecord, QcTest, ReleaseStatus};
