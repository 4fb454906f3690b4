use std::collections::BTreeSet;
use std::path::Path;

use chrono::NaiveDate;
use qms_crypto::FingerprintEngine;
use qms_ledger::{
    BatchQueries, EncodedEvent, EventEncoder, LedgerError, LedgerReader, LedgerWriter, Operation,
    QcHashSource, Reconstruction, Reconstructor, TransitionPolicy, VersionDiff,
};
use qms_types::{
    BatchEvent, BatchKey, BatchRecord, DateQuery, Fingerprint, FingerprintMode, FingerprintScope,
    QcTest, ReleaseStatus, VersionHistory,
};

use crate::error::{SdkError, SdkResult};
use crate::receipt::{FingerprintCheck, FingerprintReceipt, WriteReceipt};

/// High-level batch record API over any ledger adapter.
pub struct BatchRegistry<L> {
    ledger: L,
    reconstructor: Reconstructor,
}

impl<L: LedgerReader + LedgerWriter> BatchRegistry<L> {
    pub fn new(ledger: L) -> Self {
        Self::with_policy(ledger, TransitionPolicy::default())
    }

    pub fn with_policy(ledger: L, policy: TransitionPolicy) -> Self {
        Self {
            ledger,
            reconstructor: Reconstructor::new(policy),
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.reconstructor.policy()
    }

    pub fn queries(&self) -> BatchQueries<'_, L> {
        BatchQueries::new(&self.ledger, self.reconstructor)
    }

    // ---- Write operations ----

    pub fn create_batch(
        &self,
        key: &str,
        manufacture_date: &str,
        expiration_date: &str,
    ) -> SdkResult<WriteReceipt> {
        self.write(Operation::CreateBatch {
            key: key.into(),
            manufacture_date: manufacture_date.into(),
            expiration_date: expiration_date.into(),
        })
    }

    pub fn append_qc_test_with_hash(
        &self,
        key: &str,
        name: &str,
        result: &str,
        hash: &str,
    ) -> SdkResult<WriteReceipt> {
        self.write(Operation::AppendQcTest {
            key: key.into(),
            name: name.into(),
            result: result.into(),
            hash: QcHashSource::Supplied(hash.into()),
        })
    }

    /// Append a QC test whose hash is the BLAKE3 digest of `path`.
    pub fn append_qc_test_with_file(
        &self,
        key: &str,
        name: &str,
        result: &str,
        path: impl AsRef<Path>,
    ) -> SdkResult<WriteReceipt> {
        self.write(Operation::AppendQcTest {
            key: key.into(),
            name: name.into(),
            result: result.into(),
            hash: QcHashSource::File(path.as_ref().to_path_buf()),
        })
    }

    pub fn append_deviation(&self, key: &str, id: &str) -> SdkResult<WriteReceipt> {
        self.write(Operation::AppendDeviation {
            key: key.into(),
            id: id.into(),
        })
    }

    pub fn append_capa(&self, key: &str, id: &str) -> SdkResult<WriteReceipt> {
        self.write(Operation::AppendCapa {
            key: key.into(),
            id: id.into(),
        })
    }

    pub fn append_oos(&self, key: &str, id: &str) -> SdkResult<WriteReceipt> {
        self.write(Operation::AppendOos {
            key: key.into(),
            id: id.into(),
        })
    }

    pub fn update_release_status(&self, key: &str, status: &str) -> SdkResult<WriteReceipt> {
        self.write(Operation::UpdateReleaseStatus {
            key: key.into(),
            status: status.into(),
        })
    }

    pub fn update_expiration_date(&self, key: &str, date: &str) -> SdkResult<WriteReceipt> {
        self.write(Operation::UpdateExpirationDate {
            key: key.into(),
            date: date.into(),
        })
    }

    /// Fingerprint the current state and publish it for later comparison.
    pub fn record_fingerprint(
        &self,
        key: &str,
        scope: FingerprintScope,
        mode: FingerprintMode,
    ) -> SdkResult<FingerprintReceipt> {
        let fingerprint = self.fingerprint(key, scope, mode)?;
        let encoded = EventEncoder::encode(Operation::RecordFingerprint {
            key: key.into(),
            fingerprint: fingerprint.to_string(),
        })?;
        let receipt = self.publish(encoded)?;
        Ok(FingerprintReceipt {
            receipt,
            fingerprint,
        })
    }

    fn write(&self, operation: Operation) -> SdkResult<WriteReceipt> {
        let encoded = EventEncoder::encode(operation)?;
        self.check_preconditions(&encoded)?;
        self.publish(encoded)
    }

    fn check_preconditions(&self, encoded: &EncodedEvent) -> SdkResult<()> {
        let key = &encoded.key;
        if let BatchEvent::Created { .. } = encoded.event {
            let existing = self.ledger.retrieve_all(key)?;
            if existing
                .iter()
                .any(|e| matches!(e.event, BatchEvent::Created { .. }))
            {
                return Err(LedgerError::DuplicateCreation(key.to_string()).into());
            }
            return Ok(());
        }

        let current = self.reconstruct(key)?.record;
        match encoded.event {
            BatchEvent::StatusUpdated { status } => {
                let from = current.release_status;
                if !self.policy().allows(from, status) {
                    return Err(LedgerError::validation(format!(
                        "batch {key}: status change {from} -> {status} is not permitted"
                    ))
                    .into());
                }
            }
            BatchEvent::ExpirationUpdated { date } if date < current.manufacture_date => {
                return Err(LedgerError::validation(format!(
                    "batch {key}: expiration date {date} precedes manufacture date {}",
                    current.manufacture_date
                ))
                .into());
            }
            _ => {}
        }
        Ok(())
    }

    fn publish(&self, encoded: EncodedEvent) -> SdkResult<WriteReceipt> {
        let EncodedEvent { key, event } = encoded;
        let seq = self.ledger.publish(&key, &event)?;
        let kind = event.kind();
        tracing::info!(key = %key, seq, %kind, "event published");
        Ok(WriteReceipt { key, seq, kind })
    }

    // ---- Read operations ----

    pub fn reconstruct(&self, key: &BatchKey) -> SdkResult<Reconstruction> {
        Ok(self.reconstructor.reconstruct(&self.ledger, key)?)
    }

    pub fn list_all_batches(&self) -> SdkResult<BTreeSet<BatchKey>> {
        Ok(self.queries().batch_keys()?)
    }

    pub fn full_record(&self, key: &str) -> SdkResult<BatchRecord> {
        Ok(self.queries().full_record(&BatchKey::new(key)?)?)
    }

    pub fn history(&self, key: &str) -> SdkResult<VersionHistory> {
        Ok(self.queries().history(&BatchKey::new(key)?)?)
    }

    pub fn changes(&self, key: &str) -> SdkResult<Vec<VersionDiff>> {
        Ok(self.reconstruct(&BatchKey::new(key)?)?.changes())
    }

    pub fn release_status(&self, key: &str) -> SdkResult<ReleaseStatus> {
        Ok(self.queries().release_status(&BatchKey::new(key)?)?)
    }

    pub fn expiration_date(&self, key: &str) -> SdkResult<NaiveDate> {
        Ok(self.queries().expiration_date(&BatchKey::new(key)?)?)
    }

    pub fn manufacture_date(&self, key: &str) -> SdkResult<NaiveDate> {
        Ok(self.queries().manufacture_date(&BatchKey::new(key)?)?)
    }

    pub fn qc_tests(&self, key: &str) -> SdkResult<Vec<QcTest>> {
        Ok(self.queries().qc_tests(&BatchKey::new(key)?)?)
    }

    pub fn deviations(&self, key: &str) -> SdkResult<Vec<String>> {
        Ok(self.queries().deviations(&BatchKey::new(key)?)?)
    }

    pub fn capa(&self, key: &str) -> SdkResult<Vec<String>> {
        Ok(self.queries().capa(&BatchKey::new(key)?)?)
    }

    pub fn oos_investigations(&self, key: &str) -> SdkResult<Vec<String>> {
        Ok(self.queries().oos_investigations(&BatchKey::new(key)?)?)
    }

    /// Batches expiring in `query` (`YYYY`, `YYYY-MM`, or `YYYY-MM-DD`).
    pub fn batches_by_expiration(&self, query: &str) -> SdkResult<Vec<BatchRecord>> {
        let query = DateQuery::parse(query)?;
        Ok(self.queries().batches_by_expiration(&query)?)
    }

    // ---- Fingerprints ----

    pub fn fingerprint(
        &self,
        key: &str,
        scope: FingerprintScope,
        mode: FingerprintMode,
    ) -> SdkResult<Fingerprint> {
        let record = self.full_record(key)?;
        Ok(FingerprintEngine::compute(&record, scope, mode))
    }

    /// Whether the batch's current state still matches `expected`.
    pub fn verify(&self, key: &str, expected: &Fingerprint) -> SdkResult<bool> {
        let record = self.full_record(key)?;
        Ok(FingerprintEngine::verify(&record, expected))
    }

    /// Like [`Self::verify`], but a mismatch is an error.
    pub fn ensure_fingerprint(&self, key: &str, expected: &Fingerprint) -> SdkResult<()> {
        let actual = self.fingerprint(key, expected.scope, expected.mode)?;
        if actual != *expected {
            return Err(SdkError::FingerprintMismatch {
                key: key.trim().to_string(),
                expected: *expected,
                actual,
            });
        }
        Ok(())
    }

    /// Check every fingerprint published on the batch against its current
    /// state, in publication order.
    pub fn verify_recorded_fingerprints(&self, key: &str) -> SdkResult<Vec<FingerprintCheck>> {
        let reconstruction = self.reconstruct(&BatchKey::new(key)?)?;
        let checks = reconstruction
            .fingerprints
            .iter()
            .map(|recorded| FingerprintCheck {
                seq: recorded.seq,
                recorded: recorded.fingerprint,
                current: FingerprintEngine::compute(
                    &reconstruction.record,
                    recorded.fingerprint.scope,
                    recorded.fingerprint.mode,
                ),
            })
            .collect::<Vec<_>>();
        let stale = checks.iter().filter(|c| !c.matches()).count();
        if stale > 0 {
            tracing::warn!(key = %reconstruction.record.batch_number, stale, "recorded fingerprints no longer match");
        }
        Ok(checks)
    }
}
