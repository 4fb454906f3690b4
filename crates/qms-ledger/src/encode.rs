//! Validation and translation of write requests into ledger events.
//!
//! The encoder is pure apart from reading QC data files: it never talks to
//! the ledger, so every rejection here happens before anything is published.

use std::path::PathBuf;

use qms_crypto::ContentHasher;
use qms_types::{parse_calendar_date, BatchEvent, BatchKey, Fingerprint, ReleaseStatus};

use crate::error::LedgerError;

/// Where a QC test's data digest comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QcHashSource {
    /// A digest computed elsewhere.
    Supplied(String),
    /// A data file hashed with BLAKE3 at encoding time.
    File(PathBuf),
}

/// A write request with its raw, unvalidated parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    CreateBatch {
        key: String,
        manufacture_date: String,
        expiration_date: String,
    },
    AppendQcTest {
        key: String,
        name: String,
        result: String,
        hash: QcHashSource,
    },
    AppendDeviation {
        key: String,
        id: String,
    },
    AppendCapa {
        key: String,
        id: String,
    },
    AppendOos {
        key: String,
        id: String,
    },
    UpdateReleaseStatus {
        key: String,
        status: String,
    },
    UpdateExpirationDate {
        key: String,
        date: String,
    },
    RecordFingerprint {
        key: String,
        fingerprint: String,
    },
}

impl Operation {
    pub fn key(&self) -> &str {
        match self {
            Self::CreateBatch { key, .. }
            | Self::AppendQcTest { key, .. }
            | Self::AppendDeviation { key, .. }
            | Self::AppendCapa { key, .. }
            | Self::AppendOos { key, .. }
            | Self::UpdateReleaseStatus { key, .. }
            | Self::UpdateExpirationDate { key, .. }
            | Self::RecordFingerprint { key, .. } => key,
        }
    }
}

/// A validated event ready to publish under its batch key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedEvent {
    pub key: BatchKey,
    pub event: BatchEvent,
}

/// Validates operations and produces their events. Stateless.
pub struct EventEncoder;

impl EventEncoder {
    pub fn encode(operation: Operation) -> Result<EncodedEvent, LedgerError> {
        let key = BatchKey::new(operation.key())?;
        let event = match operation {
            Operation::CreateBatch {
                manufacture_date,
                expiration_date,
                ..
            } => {
                let manufacture_date = parse_calendar_date(&manufacture_date)?;
                let expiration_date = parse_calendar_date(&expiration_date)?;
                if expiration_date < manufacture_date {
                    return Err(LedgerError::validation(format!(
                        "expiration date {expiration_date} precedes manufacture date {manufacture_date}"
                    )));
                }
                BatchEvent::Created {
                    manufacture_date,
                    expiration_date,
                }
            }
            Operation::AppendQcTest {
                name, result, hash, ..
            } => BatchEvent::QcTestAppended {
                name: required("QC test name", name)?,
                result: required("QC test result", result)?,
                hash: match hash {
                    QcHashSource::Supplied(hash) => required("QC test hash", hash)?,
                    QcHashSource::File(path) => ContentHasher::hash_file(&path)?.to_hex(),
                },
            },
            Operation::AppendDeviation { id, .. } => BatchEvent::DeviationAppended {
                id: required("deviation id", id)?,
            },
            Operation::AppendCapa { id, .. } => BatchEvent::CapaAppended {
                id: required("CAPA id", id)?,
            },
            Operation::AppendOos { id, .. } => BatchEvent::OosAppended {
                id: required("OOS investigation id", id)?,
            },
            Operation::UpdateReleaseStatus { status, .. } => BatchEvent::StatusUpdated {
                status: status.parse::<ReleaseStatus>()?,
            },
            Operation::UpdateExpirationDate { date, .. } => BatchEvent::ExpirationUpdated {
                date: parse_calendar_date(&date)?,
            },
            Operation::RecordFingerprint { fingerprint, .. } => BatchEvent::FingerprintRecorded {
                fingerprint: fingerprint.parse::<Fingerprint>()?,
            },
        };
        Ok(EncodedEvent { key, event })
    }
}

fn required(what: &str, value: String) -> Result<String, LedgerError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::validation(format!("{what} must not be empty")));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use qms_types::{FingerprintMode, FingerprintScope};

    use super::*;
    use crate::error::ErrorKind;

    fn create(m: &str, e: &str) -> Operation {
        Operation::CreateBatch {
            key: "BATCH123".into(),
            manufacture_date: m.into(),
            expiration_date: e.into(),
        }
    }

    #[test]
    fn create_batch_produces_created_event() {
        let encoded = EventEncoder::encode(create("2023-10-01", "2025-10-01")).unwrap();
        assert_eq!(encoded.key.as_str(), "BATCH123");
        assert_eq!(
            encoded.event,
            BatchEvent::Created {
                manufacture_date: parse_calendar_date("2023-10-01").unwrap(),
                expiration_date: parse_calendar_date("2025-10-01").unwrap(),
            }
        );
    }

    #[test]
    fn create_batch_rejects_bad_dates() {
        for (m, e) in [
            ("2023-13-01", "2025-10-01"),
            ("2023-10-01", "2025-10"),
            ("2023-10-01", "yesterday"),
            ("2025-10-02", "2025-10-01"),
        ] {
            let err = EventEncoder::encode(create(m, e)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{m} / {e}");
        }
    }

    #[test]
    fn same_day_expiration_is_allowed() {
        assert!(EventEncoder::encode(create("2024-01-01", "2024-01-01")).is_ok());
    }

    #[test]
    fn blank_key_is_rejected() {
        let err = EventEncoder::encode(Operation::AppendCapa {
            key: "   ".into(),
            id: "CAPA-1".into(),
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn blank_identifiers_are_rejected() {
        let ops = [
            Operation::AppendDeviation {
                key: "B".into(),
                id: "".into(),
            },
            Operation::AppendCapa {
                key: "B".into(),
                id: " ".into(),
            },
            Operation::AppendOos {
                key: "B".into(),
                id: "\t".into(),
            },
            Operation::AppendQcTest {
                key: "B".into(),
                name: "".into(),
                result: "Pass".into(),
                hash: QcHashSource::Supplied("abc".into()),
            },
            Operation::AppendQcTest {
                key: "B".into(),
                name: "Sterility Test".into(),
                result: "Pass".into(),
                hash: QcHashSource::Supplied("".into()),
            },
        ];
        for op in ops {
            let err = EventEncoder::encode(op.clone()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{op:?}");
        }
    }

    #[test]
    fn status_is_case_insensitive() {
        let encoded = EventEncoder::encode(Operation::UpdateReleaseStatus {
            key: "B".into(),
            status: "Released".into(),
        })
        .unwrap();
        assert_eq!(
            encoded.event,
            BatchEvent::StatusUpdated {
                status: ReleaseStatus::Released
            }
        );

        let err = EventEncoder::encode(Operation::UpdateReleaseStatus {
            key: "B".into(),
            status: "shipped".into(),
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn qc_file_is_hashed_with_plain_blake3() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"sterility raw data").unwrap();

        let encoded = EventEncoder::encode(Operation::AppendQcTest {
            key: "B".into(),
            name: "Sterility Test".into(),
            result: "Pass".into(),
            hash: QcHashSource::File(file.path().to_path_buf()),
        })
        .unwrap();

        let expected = ContentHasher::hash_reader(&b"sterility raw data"[..])
            .unwrap()
            .to_hex();
        assert_eq!(
            encoded.event,
            BatchEvent::QcTestAppended {
                name: "Sterility Test".into(),
                result: "Pass".into(),
                hash: expected,
            }
        );
    }

    #[test]
    fn unreadable_qc_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.csv");
        let err = EventEncoder::encode(Operation::AppendQcTest {
            key: "B".into(),
            name: "Assay".into(),
            result: "Pass".into(),
            hash: QcHashSource::File(missing.clone()),
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("missing.csv"));
    }

    #[test]
    fn fingerprint_text_is_parsed() {
        let digest = qms_types::Digest::of(b"x");
        let text = format!("record:order-independent:{}", digest.to_hex());
        let encoded = EventEncoder::encode(Operation::RecordFingerprint {
            key: "B".into(),
            fingerprint: text,
        })
        .unwrap();
        assert_eq!(
            encoded.event,
            BatchEvent::FingerprintRecorded {
                fingerprint: Fingerprint {
                    digest,
                    mode: FingerprintMode::OrderIndependent,
                    scope: FingerprintScope::Record,
                }
            }
        );
    }
}
