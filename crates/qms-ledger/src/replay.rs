use std::collections::BTreeSet;
use std::fmt;

use qms_types::{
    BatchEvent, BatchKey, BatchRecord, DateQuery, EventKind, Fingerprint, HistoryField,
    ReleaseStatus, SequencedEvent, VersionHistory,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LedgerError;
use crate::traits::LedgerReader;

/// Which release status transitions reconstruction applies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Any status may follow any other.
    #[default]
    Unrestricted,
    /// `released` is terminal.
    ReleaseIsFinal,
}

impl TransitionPolicy {
    pub fn allows(&self, from: ReleaseStatus, to: ReleaseStatus) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::ReleaseIsFinal => from != ReleaseStatus::Released || to == ReleaseStatus::Released,
        }
    }
}

/// Why an event was skipped during reconstruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    DisallowedTransition,
    ExpirationBeforeManufacture,
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DisallowedTransition => f.write_str("disallowed status transition"),
            Self::ExpirationBeforeManufacture => f.write_str("expiration before manufacture"),
        }
    }
}

/// An event present on the ledger but not applied to the record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anomaly {
    pub seq: u64,
    pub kind: AnomalyKind,
    pub detail: String,
}

/// A fingerprint published on the batch's stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedFingerprint {
    pub seq: u64,
    pub fingerprint: Fingerprint,
}

/// Record state after one event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecordVersion {
    /// 1-based position in the batch's event stream.
    pub version: usize,
    pub seq: u64,
    pub kind: EventKind,
    pub record: BatchRecord,
}

/// One top-level record field that differs between two versions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldDiff {
    pub field: String,
    pub old: Value,
    pub new: Value,
}

/// Field differences between consecutive versions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VersionDiff {
    pub from_version: usize,
    pub to_version: usize,
    pub seq: u64,
    pub kind: EventKind,
    pub fields: Vec<FieldDiff>,
}

/// Output of folding a batch's events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reconstruction {
    pub record: BatchRecord,
    pub history: VersionHistory,
    pub fingerprints: Vec<RecordedFingerprint>,
    pub anomalies: Vec<Anomaly>,
    /// Events that took effect; excludes anomalies.
    pub applied_events: u64,
    policy: TransitionPolicy,
    events: Vec<SequencedEvent>,
}

impl Reconstruction {
    pub fn events(&self) -> &[SequencedEvent] {
        &self.events
    }

    /// The record as it stood after each event, oldest first.
    pub fn versions(&self) -> Vec<RecordVersion> {
        let Some((first, rest)) = self.events.split_first() else {
            return Vec::new();
        };
        let Ok(mut state) = FoldState::start(&self.record.batch_number, first) else {
            return Vec::new();
        };
        let mut versions = vec![RecordVersion {
            version: 1,
            seq: first.seq,
            kind: first.event.kind(),
            record: state.record.clone(),
        }];
        for (offset, event) in rest.iter().enumerate() {
            if state.apply(self.policy, event).is_err() {
                break;
            }
            versions.push(RecordVersion {
                version: offset + 2,
                seq: event.seq,
                kind: event.event.kind(),
                record: state.record.clone(),
            });
        }
        versions
    }

    /// Field-level differences between each pair of consecutive versions.
    pub fn changes(&self) -> Vec<VersionDiff> {
        let versions = self.versions();
        versions
            .windows(2)
            .map(|pair| VersionDiff {
                from_version: pair[0].version,
                to_version: pair[1].version,
                seq: pair[1].seq,
                kind: pair[1].kind,
                fields: diff_records(&pair[0].record, &pair[1].record),
            })
            .collect()
    }
}

fn diff_records(old: &BatchRecord, new: &BatchRecord) -> Vec<FieldDiff> {
    let (Ok(Value::Object(old)), Ok(Value::Object(new))) =
        (serde_json::to_value(old), serde_json::to_value(new))
    else {
        return Vec::new();
    };
    new.into_iter()
        .filter_map(|(field, new_value)| {
            let old_value = old.get(&field).cloned().unwrap_or(Value::Null);
            (old_value != new_value).then(|| FieldDiff {
                field,
                old: old_value,
                new: new_value,
            })
        })
        .collect()
}

struct FoldState {
    record: BatchRecord,
    history: VersionHistory,
    fingerprints: Vec<RecordedFingerprint>,
    anomalies: Vec<Anomaly>,
    applied: u64,
    last_seq: u64,
}

impl FoldState {
    fn start(key: &BatchKey, first: &SequencedEvent) -> Result<Self, LedgerError> {
        let BatchEvent::Created {
            manufacture_date,
            expiration_date,
        } = &first.event
        else {
            return Err(LedgerError::NotFound(format!(
                "batch {key} has no creation event (first event is {})",
                first.event.kind()
            )));
        };
        if expiration_date < manufacture_date {
            return Err(LedgerError::Decode(format!(
                "batch {key} created with expiration {expiration_date} before manufacture {manufacture_date}"
            )));
        }
        Ok(Self {
            record: BatchRecord::created(key.clone(), *manufacture_date, *expiration_date),
            history: VersionHistory::new(),
            fingerprints: Vec::new(),
            anomalies: Vec::new(),
            applied: 1,
            last_seq: first.seq,
        })
    }

    fn apply(&mut self, policy: TransitionPolicy, event: &SequencedEvent) -> Result<(), LedgerError> {
        let seq = event.seq;
        if seq <= self.last_seq {
            return Err(LedgerError::Decode(format!(
                "events for batch {} out of order: seq {seq} after {}",
                self.record.batch_number, self.last_seq
            )));
        }
        self.last_seq = seq;

        let record = &mut self.record;
        match &event.event {
            BatchEvent::Created { .. } => {
                return Err(LedgerError::DuplicateCreation(record.batch_number.to_string()));
            }
            BatchEvent::QcTestAppended { name, result, hash } => {
                record.qc_tests.push(qms_types::QcTest {
                    test_name: name.clone(),
                    test_result: result.clone(),
                    test_hash: hash.clone(),
                });
            }
            BatchEvent::DeviationAppended { id } => record.deviations.push(id.clone()),
            BatchEvent::CapaAppended { id } => record.capa.push(id.clone()),
            BatchEvent::OosAppended { id } => record.oos_investigations.push(id.clone()),
            BatchEvent::StatusUpdated { status } => {
                let current = record.release_status;
                if !policy.allows(current, *status) {
                    self.reject(
                        seq,
                        AnomalyKind::DisallowedTransition,
                        format!("{current} -> {status} not permitted"),
                    );
                    return Ok(());
                }
                record.release_status = *status;
                self.history
                    .record(seq, HistoryField::ReleaseStatus, current, status);
            }
            BatchEvent::ExpirationUpdated { date } => {
                let current = record.expiration_date;
                if *date < record.manufacture_date {
                    let detail = format!(
                        "{date} precedes manufacture date {}",
                        record.manufacture_date
                    );
                    self.reject(seq, AnomalyKind::ExpirationBeforeManufacture, detail);
                    return Ok(());
                }
                record.expiration_date = *date;
                self.history
                    .record(seq, HistoryField::ExpirationDate, current, date);
            }
            BatchEvent::FingerprintRecorded { fingerprint } => {
                self.fingerprints.push(RecordedFingerprint {
                    seq,
                    fingerprint: *fingerprint,
                });
            }
        }
        self.applied += 1;
        Ok(())
    }

    fn reject(&mut self, seq: u64, kind: AnomalyKind, detail: String) {
        tracing::warn!(
            key = %self.record.batch_number,
            seq,
            %kind,
            %detail,
            "event not applied"
        );
        self.anomalies.push(Anomaly { seq, kind, detail });
    }
}

/// Deterministic event folding. Holds only the transition policy.
#[derive(Clone, Copy, Debug, Default)]
pub struct Reconstructor {
    policy: TransitionPolicy,
}

impl Reconstructor {
    pub fn new(policy: TransitionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    pub fn reconstruct<R: LedgerReader + ?Sized>(
        &self,
        reader: &R,
        key: &BatchKey,
    ) -> Result<Reconstruction, LedgerError> {
        let events = reader.retrieve_all(key)?;
        self.fold(key, &events)
    }

    /// Fold `events` (ascending `seq`) into the batch's current state.
    pub fn fold(&self, key: &BatchKey, events: &[SequencedEvent]) -> Result<Reconstruction, LedgerError> {
        let Some((first, rest)) = events.split_first() else {
            return Err(LedgerError::NotFound(format!("no events recorded for batch {key}")));
        };
        let mut state = FoldState::start(key, first)?;
        for event in rest {
            state.apply(self.policy, event)?;
        }
        tracing::debug!(
            key = %key,
            events = events.len(),
            applied = state.applied,
            anomalies = state.anomalies.len(),
            "reconstructed batch"
        );
        Ok(Reconstruction {
            record: state.record,
            history: state.history,
            fingerprints: state.fingerprints,
            anomalies: state.anomalies,
            applied_events: state.applied,
            policy: self.policy,
            events: events.to_vec(),
        })
    }

    /// Keys on the stream that reconstruct as batches.
    pub fn batch_keys<R: LedgerReader + ?Sized>(
        &self,
        reader: &R,
    ) -> Result<BTreeSet<BatchKey>, LedgerError> {
        Ok(self
            .scan(reader)?
            .into_iter()
            .map(|r| r.record.batch_number)
            .collect())
    }

    /// Current records of every batch whose expiration falls in `query`,
    /// ordered by batch key.
    pub fn batches_by_expiration<R: LedgerReader + ?Sized>(
        &self,
        reader: &R,
        query: &DateQuery,
    ) -> Result<Vec<BatchRecord>, LedgerError> {
        Ok(self
            .scan(reader)?
            .into_iter()
            .map(|r| r.record)
            .filter(|record| query.matches(record.expiration_date))
            .collect())
    }

    /// Reconstruct every key, skipping keys that are not batches or whose
    /// items do not fold. Transport failures still abort the scan.
    fn scan<R: LedgerReader + ?Sized>(
        &self,
        reader: &R,
    ) -> Result<Vec<Reconstruction>, LedgerError> {
        let mut batches = Vec::new();
        for key in reader.list_keys()? {
            match self.reconstruct(reader, &key) {
                Ok(reconstruction) => batches.push(reconstruction),
                Err(LedgerError::NotFound(reason)) => {
                    tracing::debug!(key = %key, %reason, "skipping non-batch key");
                }
                Err(err @ (LedgerError::Decode(_) | LedgerError::DuplicateCreation(_))) => {
                    tracing::warn!(key = %key, error = %err, "skipping unreadable key");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(batches)
    }
}
