//! Bounded retry for transient version conflicts.
//!
//! Only `LedgerError::Conflict` is retried; business-rule failures pass
//! through untouched. Exhaustion surfaces as `Concurrency`.

use std::time::Duration;

use tallybook_core::{LedgerError, LedgerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Base sleep; attempt N waits N times this.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(10),
        }
    }
}

pub fn with_retry<T>(policy: &RetryPolicy, mut op: impl FnMut() -> LedgerResult<T>) -> LedgerResult<T> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op() {
            Err(err) if err.is_transient() => {
                if attempt >= policy.max_attempts.max(1) {
                    return Err(LedgerError::concurrency(format!(
                        "gave up after {attempt} attempts: {err}"
                    )));
                }
                std::thread::sleep(policy.backoff * attempt);
            }
            other => return other,
        }
    }
}
