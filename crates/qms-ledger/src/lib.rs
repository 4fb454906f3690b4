//! Event-sourced batch record ledger.
//!
//! This crate is the core of the QMS ledger. It provides:
//! - `EventEncoder` validating write operations into `BatchEvent`s
//! - `LedgerWriter` / `LedgerReader` trait boundaries to the external ledger
//! - `InMemoryLedger` for tests and embedding, `RpcLedger` for a live node
//! - The versioned hex envelope codec used on the wire
//! - Deterministic reconstruction of records and their version history
//! - `BatchQueries` read views over reconstructed batches

pub mod codec;
pub mod encode;
pub mod error;
pub mod memory;
pub mod projection;
pub mod replay;
pub mod rpc;
pub mod traits;

pub use codec::{decode_event, encode_event, ENVELOPE_VERSION};
pub use encode::{EncodedEvent, EventEncoder, Operation, QcHashSource};
pub use error::{ErrorKind, LedgerError};
pub use memory::InMemoryLedger;
pub use projection::BatchQueries;
pub use replay::{
    Anomaly, AnomalyKind, FieldDiff, RecordVersion, RecordedFingerprint, Reconstruction,
    Reconstructor, TransitionPolicy, VersionDiff,
};
pub use rpc::{RpcConfig, RpcLedger};
pub use traits::{LedgerReader, LedgerWriter};
