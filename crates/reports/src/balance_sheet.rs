//! Balance Sheet: assets, liabilities and equity as of a date.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tallybook_accounts::{Account, AccountType};
use tallybook_core::{AccountId, Currency};

use crate::balance::{PostedLine, balance_as_of, net_income_to};
use crate::config::StatementConfig;

/// Change against the comparison period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variance {
    pub amount: Decimal,
    /// Percent change; absent when the comparison amount is zero.
    pub percent: Option<Decimal>,
}

impl Variance {
    pub(crate) fn between(current: Decimal, comparison: Decimal) -> Variance {
        let amount = current - comparison;
        let percent = if comparison.is_zero() {
            None
        } else {
            Some((amount / comparison.abs() * Decimal::ONE_HUNDRED).round_dp(2))
        };
        Variance { amount, percent }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementLine {
    /// Absent on synthetic lines (retained earnings).
    pub account_id: Option<AccountId>,
    pub code: String,
    pub name: String,
    pub amount: Decimal,
    pub comparison: Option<Decimal>,
    pub variance: Option<Variance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub lines: Vec<StatementLine>,
    pub total: Decimal,
    pub comparison_total: Option<Decimal>,
    pub variance: Option<Variance>,
}

impl Section {
    fn build(title: &str, mut lines: Vec<StatementLine>, compare: bool) -> Section {
        lines.sort_by(|a, b| a.code.cmp(&b.code));
        let total: Decimal = lines.iter().map(|l| l.amount).sum();
        let comparison_total = compare.then(|| lines.iter().filter_map(|l| l.comparison).sum());
        let variance = comparison_total.map(|c| Variance::between(total, c));
        Section {
            title: title.to_string(),
            lines,
            total,
            comparison_total,
            variance,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BalanceSheetParams {
    pub as_of: NaiveDate,
    pub comparison: Option<NaiveDate>,
    pub include_zero_balances: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub as_of: NaiveDate,
    pub comparison: Option<NaiveDate>,
    pub currency: Currency,
    pub current_assets: Section,
    pub fixed_assets: Section,
    pub other_assets: Section,
    pub current_liabilities: Section,
    pub long_term_liabilities: Section,
    pub other_liabilities: Section,
    pub equity: Section,
    pub total_assets: Decimal,
    pub total_liabilities: Decimal,
    pub total_equity: Decimal,
    pub is_balanced: bool,
}

/// Build the Balance Sheet from the registry and posted lines.
///
/// Control accounts are skipped (their children carry the amounts); equity
/// gets a synthetic retained-earnings line carrying net income accumulated
/// to `as_of`, which is what makes the sheet balance.
pub fn balance_sheet(
    accounts: &[Account],
    lines: &[PostedLine],
    params: &BalanceSheetParams,
    config: &StatementConfig,
    base: &Currency,
) -> BalanceSheet {
    let compare = params.comparison.is_some();
    let mut current_assets = Vec::new();
    let mut fixed_assets = Vec::new();
    let mut other_assets = Vec::new();
    let mut current_liabilities = Vec::new();
    let mut long_term_liabilities = Vec::new();
    let mut other_liabilities = Vec::new();
    let mut equity = Vec::new();

    for account in accounts {
        if account.is_control || !account.account_type.is_balance_sheet() {
            continue;
        }
        let amount = balance_as_of(account, lines, params.as_of, None);
        let comparison = params
            .comparison
            .map(|date| balance_as_of(account, lines, date, None));
        if !params.include_zero_balances
            && amount.is_zero()
            && comparison.is_none_or(|c| c.is_zero())
        {
            continue;
        }
        let line = StatementLine {
            account_id: Some(account.id),
            code: account.code.clone(),
            name: account.name.clone(),
            amount,
            comparison,
            variance: comparison.map(|c| Variance::between(amount, c)),
        };
        let bucket = match account.account_type {
            AccountType::Asset => {
                if StatementConfig::matches(&config.current_asset_prefixes, &account.code) {
                    &mut current_assets
                } else if StatementConfig::matches(&config.fixed_asset_prefixes, &account.code) {
                    &mut fixed_assets
                } else {
                    &mut other_assets
                }
            }
            AccountType::Liability => {
                if StatementConfig::matches(&config.current_liability_prefixes, &account.code) {
                    &mut current_liabilities
                } else if StatementConfig::matches(
                    &config.long_term_liability_prefixes,
                    &account.code,
                ) {
                    &mut long_term_liabilities
                } else {
                    &mut other_liabilities
                }
            }
            AccountType::Equity => &mut equity,
            AccountType::Revenue | AccountType::Expense => unreachable!(),
        };
        bucket.push(line);
    }

    let retained = net_income_to(accounts, lines, params.as_of);
    let retained_cmp = params
        .comparison
        .map(|date| net_income_to(accounts, lines, date));
    equity.push(StatementLine {
        account_id: None,
        code: "3999".to_string(),
        name: "Retained Earnings (accumulated)".to_string(),
        amount: retained,
        comparison: retained_cmp,
        variance: retained_cmp.map(|c| Variance::between(retained, c)),
    });

    let current_assets = Section::build("Current Assets", current_assets, compare);
    let fixed_assets = Section::build("Fixed Assets", fixed_assets, compare);
    let other_assets = Section::build("Other Assets", other_assets, compare);
    let current_liabilities = Section::build("Current Liabilities", current_liabilities, compare);
    let long_term_liabilities =
        Section::build("Long-term Liabilities", long_term_liabilities, compare);
    let other_liabilities = Section::build("Other Liabilities", other_liabilities, compare);
    let equity = Section::build("Equity", equity, compare);

    let total_assets = current_assets.total + fixed_assets.total + other_assets.total;
    let total_liabilities =
        current_liabilities.total + long_term_liabilities.total + other_liabilities.total;
    let total_equity = equity.total;
    let is_balanced =
        (total_assets - total_liabilities - total_equity).abs() <= base.tolerance();

    BalanceSheet {
        as_of: params.as_of,
        comparison: params.comparison,
        currency: base.clone(),
        current_assets,
        fixed_assets,
        other_assets,
        current_liabilities,
        long_term_liabilities,
        other_liabilities,
        equity,
        total_assets,
        total_liabilities,
        total_equity,
        is_balanced,
    }
}
