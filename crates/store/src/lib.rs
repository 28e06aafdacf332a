//! Storage boundary: the `LedgerStore` trait, the in-memory implementation,
//! and the retry policy for transient conflicts.

pub mod ledger_store;
pub mod retry;

pub use ledger_store::in_memory::InMemoryLedgerStore;
pub use ledger_store::r#trait::{LedgerStore, StoreError, StoreRead, StoreTx};
pub use retry::{RetryPolicy, with_retry};
