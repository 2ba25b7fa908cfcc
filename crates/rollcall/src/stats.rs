//! Dashboard statistics derived from the record store.

use serde::Serialize;

use crate::record::CheckInRecord;

/// Attendance totals by category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Number of check-ins.
    pub total: usize,
    /// Number of guest check-ins.
    pub guest_count: usize,
    /// Number of member check-ins.
    pub member_count: usize,
}

/// Recompute statistics from a store snapshot.
///
/// Every record is exactly one of guest or member, so the member count is
/// the remainder after guests.
#[must_use]
pub fn recompute(records: &[CheckInRecord]) -> Stats {
    let total = records.len();
    let guest_count = records.iter().filter(|r| r.is_guest()).count();
    Stats {
        total,
        guest_count,
        member_count: total - guest_count,
    }
}

impl std::fmt::Display for Stats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "total {} | members {} | guests {}",
            self.total, self.member_count, self.guest_count
        )
    }
}
