//! Balance Engine: folds of posted lines, recomputation, reconciliation.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use tallybook_accounts::Account;
use tallybook_core::{AccountId, Currency, LedgerError, LedgerResult};
use tallybook_journal::{EntryStatus, JournalEntry};

/// A posted journal line flattened for folding.
#[derive(Debug, Clone, PartialEq)]
pub struct PostedLine {
    pub account_id: AccountId,
    pub transaction_date: NaiveDate,
    pub currency: Currency,
    pub debit: Decimal,
    pub credit: Decimal,
    pub debit_base: Decimal,
    pub credit_base: Decimal,
}

/// Flatten entries into posted lines.
///
/// Reversed entries are included: their effect was posted and is negated by
/// the reversal entry, which is itself Posted. Drafts and pending entries
/// never reach a fold.
pub fn posted_lines<'a>(entries: impl IntoIterator<Item = &'a JournalEntry>) -> Vec<PostedLine> {
    entries
        .into_iter()
        .filter(|e| matches!(e.status, EntryStatus::Posted | EntryStatus::Reversed))
        .flat_map(|e| {
            e.lines.iter().map(|l| PostedLine {
                account_id: l.account_id,
                transaction_date: e.transaction_date,
                currency: l.currency.clone(),
                debit: l.debit,
                credit: l.credit,
                debit_base: l.debit_base,
                credit_base: l.credit_base,
            })
        })
        .collect()
}

/// Account balance as of a date: fold from zero of every posted line dated
/// at or before `as_of`, base-currency amounts, the account type's sign
/// rule. Optionally restricted to lines denominated in one currency.
pub fn balance_as_of(
    account: &Account,
    lines: &[PostedLine],
    as_of: NaiveDate,
    currency: Option<&Currency>,
) -> Decimal {
    lines
        .iter()
        .filter(|l| l.account_id == account.id && l.transaction_date <= as_of)
        .filter(|l| currency.is_none_or(|c| &l.currency == c))
        .map(|l| account.account_type.signed_delta(l.debit_base, l.credit_base))
        .sum()
}

/// Recompute the account's full-history balance from posted lines.
pub fn recompute_balance(account: &Account, lines: &[PostedLine]) -> Decimal {
    lines
        .iter()
        .filter(|l| l.account_id == account.id)
        .map(|l| account.account_type.signed_delta(l.debit_base, l.credit_base))
        .sum()
}

/// Compare the cached balance against a fresh recomputation.
///
/// A disagreement beyond the account currency's tolerance is surfaced, not
/// silently corrected. Returns the recomputed balance.
pub fn reconcile(account: &Account, lines: &[PostedLine]) -> LedgerResult<Decimal> {
    let recomputed = recompute_balance(account, lines);
    let diff = (account.balance - recomputed).abs();
    if diff > account.currency.tolerance() {
        return Err(LedgerError::consistency(format!(
            "account {} cached balance {} disagrees with recomputed {}",
            account.code, account.balance, recomputed
        )));
    }
    Ok(recomputed)
}

/// Net income (revenue minus expenses) accumulated to `as_of`.
pub(crate) fn net_income_to(accounts: &[Account], lines: &[PostedLine], as_of: NaiveDate) -> Decimal {
    accounts
        .iter()
        .filter(|a| !a.account_type.is_balance_sheet())
        .map(|a| {
            let signed = balance_as_of(a, lines, as_of, None);
            match a.account_type {
                tallybook_accounts::AccountType::Revenue => signed,
                _ => -signed,
            }
        })
        .sum()
}
