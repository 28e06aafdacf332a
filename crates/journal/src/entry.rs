//! Journal entry entity and its status lifecycle.
//!
//! Transitions: Draft → PendingApproval → Posted → Reversed, with
//! Draft → Posted allowed directly. Posting and reversal return the
//! balance deltas the caller applies inside the same storage transaction;
//! the entity itself never touches storage.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tallybook_core::{AccountId, Currency, EntryId, LedgerError, LedgerResult, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Draft,
    PendingApproval,
    Posted,
    Reversed,
}

impl core::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            EntryStatus::Draft => "draft",
            EntryStatus::PendingApproval => "pending_approval",
            EntryStatus::Posted => "posted",
            EntryStatus::Reversed => "reversed",
        };
        f.write_str(s)
    }
}

/// What produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    Manual,
    Sales,
    Purchase,
    Payroll,
    Adjustment,
    Reversal,
}

/// Lifecycle of the external transaction an entry was generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Pending,
    Completed,
    Cancelled,
}

/// One side of a posting. Exactly one of debit/credit is non-zero.
///
/// Base-currency amounts are computed once at draft creation and persisted;
/// reversal reuses them instead of re-fetching historical rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalLine {
    pub line_number: u32,
    pub account_id: AccountId,
    pub debit: Decimal,
    pub credit: Decimal,
    pub currency: Currency,
    pub exchange_rate: Decimal,
    pub debit_base: Decimal,
    pub credit_base: Decimal,
    pub cost_center: Option<String>,
    pub project: Option<String>,
}

/// Base-currency debit/credit to apply to one account's cached balance.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceDelta {
    pub account_id: AccountId,
    pub debit_base: Decimal,
    pub credit_base: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: EntryId,
    pub journal_no: String,
    pub description: String,
    pub transaction_date: NaiveDate,
    pub posting_date: Option<NaiveDate>,
    pub currency: Currency,
    /// Entry-currency to base-currency rate captured at creation.
    pub exchange_rate: Decimal,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub status: EntryStatus,
    pub source: EntrySource,
    pub source_id: Option<String>,
    /// Set on a reversal entry; points at the entry it negates.
    pub reversal_of: Option<EntryId>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub approved_by: Option<UserId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub reversed_by: Option<UserId>,
    pub reversed_at: Option<DateTime<Utc>>,
    pub reversal_reason: Option<String>,
    /// Storage row version for optimistic concurrency.
    pub version: u64,
    pub lines: Vec<JournalLine>,
}

impl JournalEntry {
    /// Draft → PendingApproval.
    pub fn submit(&mut self) -> LedgerResult<()> {
        match self.status {
            EntryStatus::Draft => {
                self.status = EntryStatus::PendingApproval;
                Ok(())
            }
            status => Err(LedgerError::invalid_state("submit", status.to_string())),
        }
    }

    /// Draft/PendingApproval → Posted.
    ///
    /// Re-checks the balanced invariant before flipping status; returns the
    /// per-account deltas for the caller to apply atomically with the
    /// status change.
    pub fn post(&mut self, actor: UserId, now: DateTime<Utc>) -> LedgerResult<Vec<BalanceDelta>> {
        match self.status {
            EntryStatus::Draft | EntryStatus::PendingApproval => {}
            status => return Err(LedgerError::invalid_state("post", status.to_string())),
        }
        self.check_balanced()?;
        self.status = EntryStatus::Posted;
        self.approved_by = Some(actor);
        self.approved_at = Some(now);
        self.posting_date = Some(now.date_naive());
        Ok(self.balance_deltas())
    }

    /// Posted → Reversed. Builds and returns the reversal entry, already in
    /// Posted status with every line's sides swapped.
    pub fn reverse(
        &mut self,
        actor: UserId,
        reason: &str,
        reversal_id: EntryId,
        now: DateTime<Utc>,
    ) -> LedgerResult<JournalEntry> {
        if self.status != EntryStatus::Posted {
            return Err(LedgerError::invalid_state(
                "reverse",
                self.status.to_string(),
            ));
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LedgerError::validation("reversal reason must not be empty"));
        }

        let lines = self
            .lines
            .iter()
            .map(|l| JournalLine {
                line_number: l.line_number,
                account_id: l.account_id,
                debit: l.credit,
                credit: l.debit,
                currency: l.currency.clone(),
                exchange_rate: l.exchange_rate,
                debit_base: l.credit_base,
                credit_base: l.debit_base,
                cost_center: l.cost_center.clone(),
                project: l.project.clone(),
            })
            .collect();

        let reversal = JournalEntry {
            id: reversal_id,
            journal_no: format!("REV-{}", self.journal_no),
            description: format!("Reversal of {}: {reason}", self.journal_no),
            transaction_date: now.date_naive(),
            posting_date: Some(now.date_naive()),
            currency: self.currency.clone(),
            exchange_rate: self.exchange_rate,
            total_debit: self.total_credit,
            total_credit: self.total_debit,
            status: EntryStatus::Posted,
            source: EntrySource::Reversal,
            // The reversal carries no external source of its own; it points
            // at the original via `reversal_of`, whose source transaction
            // gets cancelled.
            source_id: None,
            reversal_of: Some(self.id),
            created_by: actor,
            created_at: now,
            approved_by: Some(actor),
            approved_at: Some(now),
            reversed_by: None,
            reversed_at: None,
            reversal_reason: None,
            version: 0,
            lines,
        };

        self.status = EntryStatus::Reversed;
        self.reversed_by = Some(actor);
        self.reversed_at = Some(now);
        self.reversal_reason = Some(reason.to_string());
        Ok(reversal)
    }

    /// Per-line base-currency deltas, one per line.
    pub fn balance_deltas(&self) -> Vec<BalanceDelta> {
        self.lines
            .iter()
            .map(|l| BalanceDelta {
                account_id: l.account_id,
                debit_base: l.debit_base,
                credit_base: l.credit_base,
            })
            .collect()
    }

    /// Debits equal credits, in the entry currency (within its tolerance)
    /// and in the persisted base amounts.
    ///
    /// Drafts are validated at creation, where the base sides are settled
    /// to tie out exactly; a mismatch found later means the stored entry
    /// was corrupted, hence `Consistency`.
    pub fn check_balanced(&self) -> LedgerResult<()> {
        let diff = (self.total_debit - self.total_credit).abs();
        if diff > self.currency.tolerance() {
            return Err(LedgerError::consistency(format!(
                "entry {} unbalanced: debits {} vs credits {} ({})",
                self.journal_no, self.total_debit, self.total_credit, self.currency
            )));
        }
        let base_debits: Decimal = self.lines.iter().map(|l| l.debit_base).sum();
        let base_credits: Decimal = self.lines.iter().map(|l| l.credit_base).sum();
        let base_diff = (base_debits - base_credits).abs();
        if base_diff > self.currency.tolerance() {
            return Err(LedgerError::consistency(format!(
                "entry {} base amounts unbalanced: debits {} vs credits {}",
                self.journal_no, base_debits, base_credits
            )));
        }
        Ok(())
    }
}
