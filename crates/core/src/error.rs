//! Ledger error model.

use thiserror::Error;

/// Result type used across the ledger.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger-level error.
///
/// Keep this focused on deterministic business failures plus the small set of
/// storage-visible conditions the caller must distinguish (conflict vs.
/// exhausted retries). Nothing here is ever swallowed; every variant
/// propagates to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Input failed validation (unbalanced entry, duplicate code, empty
    /// reversal reason, ...). Reported before any mutation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A requested account/entry/rate does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An operation is illegal in the entity's current lifecycle state.
    /// Carries the current state so the caller can decide retry vs. abandon.
    #[error("{operation} is not allowed while status is {status}")]
    InvalidState { operation: String, status: String },

    /// No exchange rate is available for a required pair as of the
    /// requested date.
    #[error("no exchange rate available for {from} -> {to}")]
    UnsupportedCurrency { from: String, to: String },

    /// A recomputed balance disagrees with the cached balance beyond the
    /// currency tolerance. Indicates a missed invariant elsewhere; surfaced
    /// loudly, never corrected in place.
    #[error("consistency violation: {0}")]
    Consistency(String),

    /// A storage version check failed (stale read). Transient; eligible for
    /// bounded retry.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Retries on transient conflicts were exhausted.
    #[error("concurrency failure: {0}")]
    Concurrency(String),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_state(operation: impl Into<String>, status: impl Into<String>) -> Self {
        Self::InvalidState {
            operation: operation.into(),
            status: status.into(),
        }
    }

    pub fn unsupported_currency(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::UnsupportedCurrency {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn consistency(msg: impl Into<String>) -> Self {
        Self::Consistency(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn concurrency(msg: impl Into<String>) -> Self {
        Self::Concurrency(msg.into())
    }

    /// Whether the error is a transient storage conflict worth retrying.
    /// Business-rule failures must never be retried blindly.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}
