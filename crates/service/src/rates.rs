//! External rate providers.
//!
//! Providers are collaborators reached only through `sync_rates`; journal,
//! balance and statement code never talk to one.

use tallybook_core::{Currency, LedgerResult};
use tallybook_currency::NewRate;

pub trait RateProvider {
    fn name(&self) -> &str;

    /// Fetch current quotes against the given base currency.
    fn fetch(&self, base: &Currency) -> LedgerResult<Vec<NewRate>>;
}
