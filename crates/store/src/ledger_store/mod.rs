//! Ledger storage boundary.
//!
//! Defines a storage-agnostic abstraction over accounts, journal entries,
//! exchange rates and source-transaction flags. Writes happen only inside
//! `LedgerStore::transact`, which commits everything or nothing.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use r#trait::{LedgerStore, StoreError, StoreRead, StoreTx};
