//! Optimistic concurrency expectation for stored rows.

use crate::error::{LedgerError, LedgerResult};

/// Expected row version for an update.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Expected {
    /// Skip version checking (idempotent writes, seeding).
    Any,
    /// Require the row to be at an exact version.
    Exact(u64),
}

impl Expected {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            Expected::Any => true,
            Expected::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> LedgerResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(LedgerError::conflict(format!(
                "version check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}
