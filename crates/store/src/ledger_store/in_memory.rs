use std::collections::HashMap;
use std::sync::RwLock;

use tallybook_accounts::Account;
use tallybook_core::{AccountId, EntryId, Expected};
use tallybook_currency::CurrencyRate;
use tallybook_journal::{EntryStatus, JournalEntry, SourceStatus};

use super::r#trait::{LedgerStore, StoreError, StoreRead, StoreTx};

#[derive(Debug, Clone, Default)]
struct State {
    accounts: HashMap<AccountId, Account>,
    accounts_by_code: HashMap<String, AccountId>,
    entries: HashMap<EntryId, JournalEntry>,
    entries_by_no: HashMap<String, EntryId>,
    rates: Vec<CurrencyRate>,
    sources: HashMap<String, SourceStatus>,
    journal_seq: u64,
}

/// In-memory ledger store.
///
/// Intended for tests/dev. `transact` stages mutations on a clone of the
/// state and swaps it in on success, so a failing closure leaves nothing
/// behind. The write lock makes transactions single-writer, which is what
/// keeps concurrent balance increments from being lost.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    state: RwLock<State>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreRead for State {
    fn account(&self, id: AccountId) -> Result<Account, StoreError> {
        self.accounts
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("account {id}")))
    }

    fn account_by_code(&self, code: &str) -> Result<Option<Account>, StoreError> {
        Ok(self
            .accounts_by_code
            .get(code)
            .and_then(|id| self.accounts.get(id))
            .cloned())
    }

    fn accounts(&self) -> Result<Vec<Account>, StoreError> {
        let mut all: Vec<Account> = self.accounts.values().cloned().collect();
        all.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(all)
    }

    fn has_postings(&self, account_id: AccountId) -> Result<bool, StoreError> {
        Ok(self.entries.values().any(|e| {
            matches!(e.status, EntryStatus::Posted | EntryStatus::Reversed)
                && e.lines.iter().any(|l| l.account_id == account_id)
        }))
    }

    fn entry(&self, id: EntryId) -> Result<JournalEntry, StoreError> {
        self.entries
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("journal entry {id}")))
    }

    fn entry_by_no(&self, journal_no: &str) -> Result<Option<JournalEntry>, StoreError> {
        Ok(self
            .entries_by_no
            .get(journal_no)
            .and_then(|id| self.entries.get(id))
            .cloned())
    }

    fn entries(&self) -> Result<Vec<JournalEntry>, StoreError> {
        let mut all: Vec<JournalEntry> = self.entries.values().cloned().collect();
        all.sort_by(|a, b| a.journal_no.cmp(&b.journal_no));
        Ok(all)
    }

    fn rates(&self) -> Result<Vec<CurrencyRate>, StoreError> {
        Ok(self.rates.clone())
    }

    fn source_status(&self, source_id: &str) -> Result<Option<SourceStatus>, StoreError> {
        Ok(self.sources.get(source_id).copied())
    }
}

impl StoreTx for State {
    fn insert_account(&mut self, account: Account) -> Result<(), StoreError> {
        if self.accounts_by_code.contains_key(&account.code) {
            return Err(StoreError::Duplicate(format!(
                "account code '{}' already exists",
                account.code
            )));
        }
        if self.accounts.contains_key(&account.id) {
            return Err(StoreError::Duplicate(format!("account {}", account.id)));
        }
        self.accounts_by_code
            .insert(account.code.clone(), account.id);
        self.accounts.insert(account.id, account);
        Ok(())
    }

    fn update_account(&mut self, account: Account) -> Result<(), StoreError> {
        let existing = self
            .accounts
            .get(&account.id)
            .ok_or_else(|| StoreError::NotFound(format!("account {}", account.id)))?;
        if existing.code != account.code {
            return Err(StoreError::Storage(format!(
                "account {} code is immutable",
                account.id
            )));
        }
        self.accounts.insert(account.id, account);
        Ok(())
    }

    fn insert_entry(&mut self, entry: JournalEntry) -> Result<(), StoreError> {
        if self.entries_by_no.contains_key(&entry.journal_no) {
            return Err(StoreError::Duplicate(format!(
                "journal number '{}' already exists",
                entry.journal_no
            )));
        }
        if self.entries.contains_key(&entry.id) {
            return Err(StoreError::Duplicate(format!("journal entry {}", entry.id)));
        }
        self.entries_by_no.insert(entry.journal_no.clone(), entry.id);
        self.entries.insert(entry.id, entry);
        Ok(())
    }

    fn update_entry(
        &mut self,
        mut entry: JournalEntry,
        expected: Expected,
    ) -> Result<u64, StoreError> {
        let current = self
            .entries
            .get(&entry.id)
            .ok_or_else(|| StoreError::NotFound(format!("journal entry {}", entry.id)))?
            .version;
        if !expected.matches(current) {
            return Err(StoreError::Conflict(format!(
                "entry {} expected version {expected:?}, found {current}",
                entry.journal_no
            )));
        }
        entry.version = current + 1;
        let version = entry.version;
        self.entries.insert(entry.id, entry);
        Ok(version)
    }

    fn upsert_rate(&mut self, rate: CurrencyRate) -> Result<(), StoreError> {
        self.rates.retain(|r| {
            !(r.from == rate.from && r.to == rate.to && r.rate_date == rate.rate_date)
        });
        self.rates.push(rate);
        Ok(())
    }

    fn set_source_status(
        &mut self,
        source_id: &str,
        status: SourceStatus,
    ) -> Result<(), StoreError> {
        self.sources.insert(source_id.to_string(), status);
        Ok(())
    }

    fn next_journal_no(&mut self) -> Result<String, StoreError> {
        self.journal_seq += 1;
        Ok(format!("JE-{:06}", self.journal_seq))
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn read<T>(&self, f: impl FnOnce(&dyn StoreRead) -> T) -> Result<T, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;
        Ok(f(&*state))
    }

    fn transact<T, E>(&self, f: impl FnOnce(&mut dyn StoreTx) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut state = self
            .state
            .write()
            .map_err(|_| E::from(StoreError::Storage("lock poisoned".to_string())))?;
        let mut staged = state.clone();
        let value = f(&mut staged)?;
        *state = staged;
        Ok(value)
    }
}
