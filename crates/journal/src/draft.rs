//! Draft validation: the balanced invariant is enforced here, at creation,
//! not only at posting time.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tallybook_core::{AccountId, Currency, EntryId, LedgerError, LedgerResult, UserId};

use crate::entry::{EntrySource, EntryStatus, JournalEntry, JournalLine};

/// One requested line. Exactly one of debit/credit must be a positive
/// amount; the other stays zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftLine {
    pub account_id: AccountId,
    #[serde(default)]
    pub debit: Decimal,
    #[serde(default)]
    pub credit: Decimal,
    #[serde(default)]
    pub cost_center: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
}

/// A requested journal entry, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftEntry {
    pub description: String,
    pub transaction_date: NaiveDate,
    pub currency: Currency,
    /// Entry-currency to base-currency rate.
    pub exchange_rate: Decimal,
    pub source: EntrySource,
    #[serde(default)]
    pub source_id: Option<String>,
    pub created_by: UserId,
    pub lines: Vec<DraftLine>,
}

impl DraftEntry {
    /// Validate and build the Draft entry.
    ///
    /// Checks: at least two lines, one-sided positive amounts, totals
    /// balanced within the entry currency's tolerance, positive exchange
    /// rate (exactly 1 for base-currency entries). Base amounts are
    /// computed per line, rounded to the base currency's minor units, and
    /// persisted on the entry; per-line rounding residue is settled onto
    /// each side's largest line so the base totals tie out exactly.
    pub fn build(
        self,
        id: EntryId,
        journal_no: String,
        base: &Currency,
        now: DateTime<Utc>,
    ) -> LedgerResult<JournalEntry> {
        if self.description.trim().is_empty() {
            return Err(LedgerError::validation("description must not be empty"));
        }
        if self.lines.len() < 2 {
            return Err(LedgerError::validation(format!(
                "entry needs at least 2 lines, got {}",
                self.lines.len()
            )));
        }
        if self.exchange_rate <= Decimal::ZERO {
            return Err(LedgerError::validation(format!(
                "exchange rate must be positive, got {}",
                self.exchange_rate
            )));
        }
        if self.currency == *base && self.exchange_rate != Decimal::ONE {
            return Err(LedgerError::validation(format!(
                "exchange rate must be 1 for {} entries, got {}",
                base, self.exchange_rate
            )));
        }

        let mut lines = Vec::with_capacity(self.lines.len());
        for (idx, l) in self.lines.iter().enumerate() {
            let line_number = idx as u32 + 1;
            if l.debit < Decimal::ZERO || l.credit < Decimal::ZERO {
                return Err(LedgerError::validation(format!(
                    "line {line_number}: amounts must not be negative"
                )));
            }
            let has_debit = !l.debit.is_zero();
            let has_credit = !l.credit.is_zero();
            if has_debit == has_credit {
                return Err(LedgerError::validation(format!(
                    "line {line_number}: exactly one of debit/credit must be set"
                )));
            }
            lines.push(JournalLine {
                line_number,
                account_id: l.account_id,
                debit: l.debit,
                credit: l.credit,
                currency: self.currency.clone(),
                exchange_rate: self.exchange_rate,
                debit_base: base.round(l.debit * self.exchange_rate),
                credit_base: base.round(l.credit * self.exchange_rate),
                cost_center: l.cost_center.clone(),
                project: l.project.clone(),
            });
        }

        let total_debit: Decimal = lines.iter().map(|l| l.debit).sum();
        let total_credit: Decimal = lines.iter().map(|l| l.credit).sum();
        let diff = (total_debit - total_credit).abs();
        if diff > self.currency.tolerance() {
            return Err(LedgerError::validation(format!(
                "entry unbalanced: debits {total_debit} vs credits {total_credit} \
                 (difference {diff} exceeds {} tolerance {})",
                self.currency,
                self.currency.tolerance()
            )));
        }

        // Per-line rounding can leave the summed base amounts a few minor
        // units apart even when the entry currency balances. Both sides are
        // settled against one entry-level target so the base books always
        // tie out exactly.
        let base_target = base.round(total_debit * self.exchange_rate);
        settle_base_residue(&mut lines, base_target, Side::Debit);
        settle_base_residue(&mut lines, base_target, Side::Credit);

        Ok(JournalEntry {
            id,
            journal_no,
            description: self.description,
            transaction_date: self.transaction_date,
            posting_date: None,
            currency: self.currency,
            exchange_rate: self.exchange_rate,
            total_debit,
            total_credit,
            status: EntryStatus::Draft,
            source: self.source,
            source_id: self.source_id,
            reversal_of: None,
            created_by: self.created_by,
            created_at: now,
            approved_by: None,
            approved_at: None,
            reversed_by: None,
            reversed_at: None,
            reversal_reason: None,
            version: 0,
            lines,
        })
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Side {
    Debit,
    Credit,
}

/// Tie one side's summed base amounts to the entry-level target by moving
/// the rounding residue onto that side's largest line.
fn settle_base_residue(lines: &mut [JournalLine], target: Decimal, side: Side) {
    let base_of = |l: &JournalLine| match side {
        Side::Debit => l.debit_base,
        Side::Credit => l.credit_base,
    };
    let residue = target - lines.iter().map(base_of).sum::<Decimal>();
    if residue.is_zero() {
        return;
    }
    let largest = lines
        .iter_mut()
        .filter(|l| match side {
            Side::Debit => !l.debit.is_zero(),
            Side::Credit => !l.credit.is_zero(),
        })
        .max_by_key(|l| match side {
            Side::Debit => l.debit,
            Side::Credit => l.credit,
        });
    if let Some(l) = largest {
        match side {
            Side::Debit => l.debit_base += residue,
            Side::Credit => l.credit_base += residue,
        }
    }
}
