use std::collections::BTreeSet;

use qms_types::{BatchEvent, BatchKey, SequencedEvent};

use crate::error::LedgerError;

/// Write boundary to the external ledger.
///
/// Publishing is not idempotent: publishing the same event twice yields two
/// distinct entries.
pub trait LedgerWriter: Send + Sync {
    /// Append one event under `key`, returning its sequence marker.
    ///
    /// An `Err` means the event was not written. A writer that cannot read
    /// back the position of an accepted event returns `0` instead.
    fn publish(&self, key: &BatchKey, event: &BatchEvent) -> Result<u64, LedgerError>;
}

/// Read boundary to the external ledger.
///
/// Implementations must return a key's events in ascending acceptance order
/// and never drop an entry that was visible to an earlier read.
pub trait LedgerReader: Send + Sync {
    fn retrieve_all(&self, key: &BatchKey) -> Result<Vec<SequencedEvent>, LedgerError>;

    fn list_keys(&self) -> Result<BTreeSet<BatchKey>, LedgerError>;
}

impl<T: LedgerWriter + ?Sized> LedgerWriter for &T {
    fn publish(&self, key: &BatchKey, event: &BatchEvent) -> Result<u64, LedgerError> {
        (**self).publish(key, event)
    }
}

impl<T: LedgerReader + ?Sized> LedgerReader for &T {
    fn retrieve_all(&self, key: &BatchKey) -> Result<Vec<SequencedEvent>, LedgerError> {
        (**self).retrieve_all(key)
    }

    fn list_keys(&self) -> Result<BTreeSet<BatchKey>, LedgerError> {
        (**self).list_keys()
    }
}
