use std::collections::BTreeSet;

use chrono::NaiveDate;
use qms_types::{BatchKey, BatchRecord, DateQuery, QcTest, ReleaseStatus, VersionHistory};

use crate::error::LedgerError;
use crate::replay::{Reconstruction, Reconstructor};
use crate::traits::LedgerReader;

/// Read-only views over reconstructed batches.
///
/// Every per-batch query reconstructs from the ledger on each call and fails
/// with [`LedgerError::NotFound`] when the key has no creation event.
pub struct BatchQueries<'a, R: LedgerReader + ?Sized> {
    reader: &'a R,
    reconstructor: Reconstructor,
}

impl<'a, R: LedgerReader + ?Sized> BatchQueries<'a, R> {
    pub fn new(reader: &'a R, reconstructor: Reconstructor) -> Self {
        Self {
            reader,
            reconstructor,
        }
    }

    pub fn reconstruct(&self, key: &BatchKey) -> Result<Reconstruction, LedgerError> {
        self.reconstructor.reconstruct(self.reader, key)
    }

    /// Every key present on the stream, batch or not.
    pub fn list_keys(&self) -> Result<BTreeSet<BatchKey>, LedgerError> {
        self.reader.list_keys()
    }

    /// Keys whose events reconstruct as a batch. Foreign or corrupt keys
    /// on the same stream are left out.
    pub fn batch_keys(&self) -> Result<BTreeSet<BatchKey>, LedgerError> {
        self.reconstructor.batch_keys(self.reader)
    }

    pub fn full_record(&self, key: &BatchKey) -> Result<BatchRecord, LedgerError> {
        Ok(self.reconstruct(key)?.record)
    }

    pub fn history(&self, key: &BatchKey) -> Result<VersionHistory, LedgerError> {
        Ok(self.reconstruct(key)?.history)
    }

    pub fn release_status(&self, key: &BatchKey) -> Result<ReleaseStatus, LedgerError> {
        Ok(self.full_record(key)?.release_status)
    }

    pub fn expiration_date(&self, key: &BatchKey) -> Result<NaiveDate, LedgerError> {
        Ok(self.full_record(key)?.expiration_date)
    }

    pub fn manufacture_date(&self, key: &BatchKey) -> Result<NaiveDate, LedgerError> {
        Ok(self.full_record(key)?.manufacture_date)
    }

    pub fn qc_tests(&self, key: &BatchKey) -> Result<Vec<QcTest>, LedgerError> {
        Ok(self.full_record(key)?.qc_tests)
    }

    pub fn deviations(&self, key: &BatchKey) -> Result<Vec<String>, LedgerError> {
        Ok(self.full_record(key)?.deviations)
    }

    pub fn capa(&self, key: &BatchKey) -> Result<Vec<String>, LedgerError> {
        Ok(self.full_record(key)?.capa)
    }

    pub fn oos_investigations(&self, key: &BatchKey) -> Result<Vec<String>, LedgerError> {
        Ok(self.full_record(key)?.oos_investigations)
    }

    pub fn batches_by_expiration(&self, query: &DateQuery) -> Result<Vec<BatchRecord>, LedgerError> {
        self.reconstructor.batches_by_expiration(self.reader, query)
    }
}

#[cfg(test)]
mod tests {
    use qms_types::{parse_calendar_date, BatchEvent};

    use super::*;
    use crate::memory::InMemoryLedger;
    use crate::traits::LedgerWriter;

    fn seeded() -> (InMemoryLedger, BatchKey) {
        let ledger = InMemoryLedger::new();
        let key = BatchKey::new("LOT-42").unwrap();
        let events = [
            BatchEvent::Created {
                manufacture_date: parse_calendar_date("2024-03-01").unwrap(),
                expiration_date: parse_calendar_date("2026-03-01").unwrap(),
            },
            BatchEvent::OosAppended { id: "OOS-1".into() },
            BatchEvent::CapaAppended { id: "CAPA-9".into() },
            BatchEvent::StatusUpdated {
                status: ReleaseStatus::Hold,
            },
            BatchEvent::ExpirationUpdated {
                date: parse_calendar_date("2026-09-01").unwrap(),
            },
        ];
        for event in &events {
            ledger.publish(&key, event).unwrap();
        }
        (ledger, key)
    }

    #[test]
    fn getters_read_current_state() {
        let (ledger, key) = seeded();
        let queries = BatchQueries::new(&ledger, Reconstructor::default());

        assert_eq!(queries.release_status(&key).unwrap(), ReleaseStatus::Hold);
        assert_eq!(
            queries.expiration_date(&key).unwrap(),
            parse_calendar_date("2026-09-01").unwrap()
        );
        assert_eq!(
            queries.manufacture_date(&key).unwrap(),
            parse_calendar_date("2024-03-01").unwrap()
        );
        assert_eq!(queries.oos_investigations(&key).unwrap(), ["OOS-1"]);
        assert_eq!(queries.capa(&key).unwrap(), ["CAPA-9"]);
        assert!(queries.deviations(&key).unwrap().is_empty());
        assert!(queries.qc_tests(&key).unwrap().is_empty());
        assert_eq!(queries.history(&key).unwrap().len(), 2);
        assert_eq!(queries.list_keys().unwrap().len(), 1);
    }

    #[test]
    fn batch_keys_leave_out_foreign_items() {
        let (ledger, key) = seeded();
        let testing = BatchKey::new("Testing").unwrap();
        ledger.publish_raw(&testing, "0badc0de").unwrap();
        let queries = BatchQueries::new(&ledger, Reconstructor::default());

        assert_eq!(queries.list_keys().unwrap().len(), 2);
        assert_eq!(queries.batch_keys().unwrap().into_iter().collect::<Vec<_>>(), [key]);
    }

    #[test]
    fn unknown_batch_is_not_found_for_every_getter() {
        let (ledger, _) = seeded();
        let queries = BatchQueries::new(&ledger, Reconstructor::default());
        let ghost = BatchKey::new("GHOST").unwrap();

        assert!(matches!(queries.full_record(&ghost), Err(LedgerError::NotFound(_))));
        assert!(matches!(queries.release_status(&ghost), Err(LedgerError::NotFound(_))));
        assert!(matches!(queries.qc_tests(&ghost), Err(LedgerError::NotFound(_))));
        assert!(matches!(queries.history(&ghost), Err(LedgerError::NotFound(_))));
    }

    #[test]
    fn works_through_trait_objects() {
        let (ledger, key) = seeded();
        let reader: &dyn LedgerReader = &ledger;
        let queries = BatchQueries::new(reader, Reconstructor::default());
        assert_eq!(queries.full_record(&key).unwrap().batch_number, key);
        let query = DateQuery::parse("2026-09").unwrap();
        assert_eq!(queries.batches_by_expiration(&query).unwrap().len(), 1);
    }
}
