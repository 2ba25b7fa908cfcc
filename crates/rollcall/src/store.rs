//! In-memory view of the check-in ledger.

use crate::record::CheckInRecord;

/// Ordered, append-only copy of the ledger for one dashboard session.
///
/// Entries keep their arrival order. Duplicates are kept: delivery is
/// at-least-once and the ledger owner is the only one who can tell two rows
/// apart. The only way to drop entries is a full [`reseed`](Self::reseed).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordStore {
    records: Vec<CheckInRecord>,
}

impl RecordStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole store with a fresh bulk fetch.
    pub fn reseed(&mut self, records: Vec<CheckInRecord>) {
        self.records = records;
    }

    /// Add a record at the end.
    pub fn append(&mut self, record: CheckInRecord) {
        self.records.push(record);
    }

    /// All records in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> &[CheckInRecord] {
        &self.records
    }

    /// Records most recent first, the order a dashboard shows them in.
    pub fn recent_first(&self) -> impl Iterator<Item = &CheckInRecord> {
        self.records.iter().rev()
    }

    /// Number of records held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
