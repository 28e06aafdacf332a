//! Read models returned to request handlers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tallybook_accounts::Account;
use tallybook_core::{AccountId, Currency};
use tallybook_journal::{JournalEntry, JournalLine};

/// A journal line resolved against the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineView {
    pub line_number: u32,
    pub account_id: AccountId,
    pub account_code: String,
    pub account_name: String,
    pub debit: Decimal,
    pub credit: Decimal,
    pub currency: Currency,
    pub debit_base: Decimal,
    pub credit_base: Decimal,
}

/// An entry with its lines resolved to account labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryView {
    pub entry: JournalEntry,
    pub lines: Vec<LineView>,
}

impl EntryView {
    /// `accounts` must contain every account the entry's lines reference.
    pub fn resolve(entry: JournalEntry, accounts: &[Account]) -> EntryView {
        let label = |id: AccountId| {
            accounts
                .iter()
                .find(|a| a.id == id)
                .map(|a| (a.code.clone(), a.name.clone()))
                .unwrap_or_default()
        };
        let lines = entry
            .lines
            .iter()
            .map(|l: &JournalLine| {
                let (account_code, account_name) = label(l.account_id);
                LineView {
                    line_number: l.line_number,
                    account_id: l.account_id,
                    account_code,
                    account_name,
                    debit: l.debit,
                    credit: l.credit,
                    currency: l.currency.clone(),
                    debit_base: l.debit_base,
                    credit_base: l.credit_base,
                }
            })
            .collect();
        EntryView { entry, lines }
    }
}
