use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tallybook_core::{AccountId, Currency, LedgerError, LedgerResult};

/// High-level account type (determines normal balance side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

impl AccountType {
    /// Signed balance delta for a (debit, credit) pair in base currency.
    ///
    /// Asset/Expense accounts grow with debits; Liability/Equity/Revenue
    /// accounts grow with credits.
    pub fn signed_delta(self, debit: Decimal, credit: Decimal) -> Decimal {
        match self {
            AccountType::Asset | AccountType::Expense => debit - credit,
            AccountType::Liability | AccountType::Equity | AccountType::Revenue => credit - debit,
        }
    }

    pub fn is_balance_sheet(self) -> bool {
        matches!(
            self,
            AccountType::Asset | AccountType::Liability | AccountType::Equity
        )
    }
}

impl core::fmt::Display for AccountType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            AccountType::Asset => "asset",
            AccountType::Liability => "liability",
            AccountType::Equity => "equity",
            AccountType::Revenue => "revenue",
            AccountType::Expense => "expense",
        };
        f.write_str(s)
    }
}

/// An account in the chart of accounts.
///
/// `balance` is a cached running total in base currency, written only by the
/// posting path; the balance engine can always recompute it from posted
/// lines (see the reconcile operation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub code: String,
    pub name: String,
    /// Secondary-language label, where the chart is bilingual.
    pub name_alt: Option<String>,
    pub account_type: AccountType,
    pub parent_id: Option<AccountId>,
    /// Control accounts group children and cannot receive postings.
    pub is_control: bool,
    pub allow_posting: bool,
    pub currency: Currency,
    pub balance: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn postable(&self) -> bool {
        self.active && self.allow_posting && !self.is_control
    }
}

/// Specification for creating an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAccount {
    pub code: String,
    pub name: String,
    pub name_alt: Option<String>,
    pub account_type: AccountType,
    pub parent_id: Option<AccountId>,
    pub is_control: bool,
    pub allow_posting: bool,
    pub currency: Currency,
}

impl NewAccount {
    /// Validate the spec against registry invariants.
    ///
    /// `parent` must be the resolved parent account when `parent_id` is set;
    /// code uniqueness is checked by the caller against the store.
    pub fn validate(&self, parent: Option<&Account>) -> LedgerResult<()> {
        if self.code.trim().is_empty() {
            return Err(LedgerError::validation("account code must not be empty"));
        }
        if !self.code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(LedgerError::validation(format!(
                "account code '{}' must be alphanumeric",
                self.code
            )));
        }
        if self.name.trim().is_empty() {
            return Err(LedgerError::validation("account name must not be empty"));
        }
        if self.is_control && self.allow_posting {
            return Err(LedgerError::validation(
                "control accounts cannot allow posting",
            ));
        }
        match (self.parent_id, parent) {
            (Some(id), None) => {
                return Err(LedgerError::not_found(format!("parent account {id}")));
            }
            (Some(_), Some(parent)) => {
                if parent.account_type != self.account_type {
                    return Err(LedgerError::validation(format!(
                        "account type {} does not match parent type {}",
                        self.account_type, parent.account_type
                    )));
                }
            }
            (None, _) => {}
        }
        Ok(())
    }

    pub fn into_account(self, id: AccountId, now: DateTime<Utc>) -> Account {
        Account {
            id,
            code: self.code,
            name: self.name,
            name_alt: self.name_alt,
            account_type: self.account_type,
            parent_id: self.parent_id,
            is_control: self.is_control,
            allow_posting: self.allow_posting,
            currency: self.currency,
            balance: Decimal::ZERO,
            active: true,
            created_at: now,
        }
    }
}

/// Partial update of an account. Fields left `None` are unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountPatch {
    pub name: Option<String>,
    pub name_alt: Option<String>,
    pub account_type: Option<AccountType>,
    pub parent_id: Option<AccountId>,
    pub allow_posting: Option<bool>,
    pub active: Option<bool>,
}

impl AccountPatch {
    /// Apply the patch to `account`, enforcing edit rules.
    ///
    /// A type change is rejected when the account already has posted lines
    /// (`has_postings`); parent checks (existence, type match, cycles) are
    /// the caller's job since they need registry-wide context.
    pub fn apply(&self, account: &mut Account, has_postings: bool) -> LedgerResult<()> {
        if let Some(ty) = self.account_type {
            if ty != account.account_type {
                if has_postings {
                    return Err(LedgerError::invalid_state(
                        "change account type",
                        "account has posted transactions",
                    ));
                }
                account.account_type = ty;
            }
        }
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(LedgerError::validation("account name must not be empty"));
            }
            account.name = name.clone();
        }
        if let Some(name_alt) = &self.name_alt {
            account.name_alt = Some(name_alt.clone());
        }
        if let Some(allow) = self.allow_posting {
            if allow && account.is_control {
                return Err(LedgerError::validation(
                    "control accounts cannot allow posting",
                ));
            }
            account.allow_posting = allow;
        }
        if let Some(active) = self.active {
            account.active = active;
        }
        if let Some(parent) = self.parent_id {
            account.parent_id = Some(parent);
        }
        Ok(())
    }
}
