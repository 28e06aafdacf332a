//! Service configuration.

use serde::{Deserialize, Serialize};

use tallybook_core::Currency;
use tallybook_reports::StatementConfig;
use tallybook_store::RetryPolicy;

/// Process-wide ledger configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Every cached balance and statement figure is in this currency.
    pub base_currency: Currency,
    pub statements: StatementConfig,
    #[serde(skip, default)]
    pub retry: RetryPolicy,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            base_currency: Currency::default(),
            statements: StatementConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}
