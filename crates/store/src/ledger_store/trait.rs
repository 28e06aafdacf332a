use thiserror::Error;

use tallybook_accounts::Account;
use tallybook_core::{AccountId, EntryId, Expected, LedgerError};
use tallybook_currency::CurrencyRate;
use tallybook_journal::{JournalEntry, SourceStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate: {0}")]
    Duplicate(String),

    /// Optimistic version check failed; retryable.
    #[error("version conflict: {0}")]
    Conflict(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => LedgerError::not_found(what),
            StoreError::Duplicate(what) => LedgerError::validation(what),
            StoreError::Conflict(what) => LedgerError::conflict(what),
            StoreError::Storage(what) => LedgerError::consistency(what),
        }
    }
}

/// Read access to the ledger state. Object-safe; snapshots see committed
/// state, transactions see their own staged writes.
pub trait StoreRead {
    fn account(&self, id: AccountId) -> Result<Account, StoreError>;
    fn account_by_code(&self, code: &str) -> Result<Option<Account>, StoreError>;
    fn accounts(&self) -> Result<Vec<Account>, StoreError>;
    /// Whether any posted or reversed entry has a line on the account.
    fn has_postings(&self, account_id: AccountId) -> Result<bool, StoreError>;

    fn entry(&self, id: EntryId) -> Result<JournalEntry, StoreError>;
    fn entry_by_no(&self, journal_no: &str) -> Result<Option<JournalEntry>, StoreError>;
    fn entries(&self) -> Result<Vec<JournalEntry>, StoreError>;

    fn rates(&self) -> Result<Vec<CurrencyRate>, StoreError>;
    fn source_status(&self, source_id: &str) -> Result<Option<SourceStatus>, StoreError>;
}

/// Mutations staged inside one transaction.
pub trait StoreTx: StoreRead {
    fn insert_account(&mut self, account: Account) -> Result<(), StoreError>;
    fn update_account(&mut self, account: Account) -> Result<(), StoreError>;

    fn insert_entry(&mut self, entry: JournalEntry) -> Result<(), StoreError>;
    /// Replace the entry after an optimistic version check; the stored
    /// version is bumped and the new version returned.
    fn update_entry(&mut self, entry: JournalEntry, expected: Expected) -> Result<u64, StoreError>;

    /// Upsert by (from, to, rate_date); distinct dates accumulate history.
    fn upsert_rate(&mut self, rate: CurrencyRate) -> Result<(), StoreError>;
    fn set_source_status(&mut self, source_id: &str, status: SourceStatus)
    -> Result<(), StoreError>;

    /// Next value of the journal-number sequence, formatted `JE-NNNNNN`.
    fn next_journal_no(&mut self) -> Result<String, StoreError>;
}

/// The storage handle the service layer is built against.
///
/// `transact` runs the closure against staged state and commits only on
/// `Ok`; any `Err` rolls back every staged mutation. The error type is
/// generic so business errors and storage errors share one `?` path.
pub trait LedgerStore: Send + Sync {
    fn read<T>(&self, f: impl FnOnce(&dyn StoreRead) -> T) -> Result<T, StoreError>;

    fn transact<T, E>(&self, f: impl FnOnce(&mut dyn StoreTx) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>;
}
