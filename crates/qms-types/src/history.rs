use std::fmt;

use serde::{Deserialize, Serialize};

/// Scalar record fields that can be overwritten after creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryField {
    ReleaseStatus,
    ExpirationDate,
}

impl fmt::Display for HistoryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReleaseStatus => f.write_str("release_status"),
            Self::ExpirationDate => f.write_str("expiration_date"),
        }
    }
}

/// One scalar overwrite observed during reconstruction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionChange {
    pub seq: u64,
    pub field: HistoryField,
    pub old_value: String,
    pub new_value: String,
}

/// Ordered audit trail of scalar overwrites, in fold order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionHistory {
    changes: Vec<VersionChange>,
}

impl VersionHistory {
    /// An empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one change accepted at `seq`. Values are stored in display form.
    pub fn record(
        &mut self,
        seq: u64,
        field: HistoryField,
        old_value: impl ToString,
        new_value: impl ToString,
    ) {
        self.changes.push(VersionChange {
            seq,
            field,
            old_value: old_value.to_string(),
            new_value: new_value.to_string(),
        });
    }

    /// Every change, oldest first.
    pub fn changes(&self) -> &[VersionChange] {
        &self.changes
    }

    /// Iterate over changes, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &VersionChange> {
        self.changes.iter()
    }

    /// Changes touching a single field, oldest first.
    pub fn for_field(&self, field: HistoryField) -> impl Iterator<Item = &VersionChange> {
        self.changes.iter().filter(move |c| c.field == field)
    }

    /// Number of recorded changes.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Whether no overwrite has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_order_and_filters() {
        let mut history = VersionHistory::new();
        history.record(2, HistoryField::ReleaseStatus, "pending", "hold");
        history.record(3, HistoryField::ExpirationDate, "2025-10-01", "2026-01-01");
        history.record(4, HistoryField::ReleaseStatus, "hold", "released");

        assert_eq!(history.len(), 3);
        let statuses: Vec<_> = history
            .for_field(HistoryField::ReleaseStatus)
            .map(|c| c.new_value.as_str())
            .collect();
        assert_eq!(statuses, ["hold", "released"]);
        assert_eq!(history.changes()[1].seq, 3);
    }
}
