//! Service layer: the operations request handlers call.
//!
//! `LedgerService` wires the registry, journal engine, balance engine,
//! statement generator and currency converter to a `LedgerStore`. Every
//! write goes through one `transact` call; `post` and `reverse` are wrapped
//! in the retry policy for transient conflicts.

pub mod config;
pub mod ledger;
pub mod rates;
pub mod views;

pub use config::LedgerConfig;
pub use ledger::LedgerService;
pub use rates::RateProvider;
pub use views::{EntryView, LineView};

#[cfg(test)]
mod integration_tests;
