use qms_types::{BatchKey, EventKind, Fingerprint};
use serde::Serialize;

/// Acknowledgement of one published event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WriteReceipt {
    pub key: BatchKey,
    pub seq: u64,
    pub kind: EventKind,
}

/// A fingerprint computed from current state and published on the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FingerprintReceipt {
    pub receipt: WriteReceipt,
    pub fingerprint: Fingerprint,
}

/// Outcome of checking one previously recorded fingerprint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FingerprintCheck {
    /// Sequence marker of the recording event.
    pub seq: u64,
    pub recorded: Fingerprint,
    pub current: Fingerprint,
}

impl FingerprintCheck {
    pub fn matches(&self) -> bool {
        self.recorded == self.current
    }
}
