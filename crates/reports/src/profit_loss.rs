//! Profit & Loss: revenue and expense activity over a period.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tallybook_accounts::{Account, AccountType};
use tallybook_core::{AccountId, Currency};

use crate::balance::PostedLine;
use crate::balance_sheet::Variance;
use crate::config::StatementConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlLine {
    pub account_id: AccountId,
    pub code: String,
    pub name: String,
    pub amount: Decimal,
    /// Share of total revenue, in percent; absent when revenue is zero.
    pub percent_of_revenue: Option<Decimal>,
    pub comparison: Option<Decimal>,
    pub variance: Option<Variance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlSection {
    pub title: String,
    pub lines: Vec<PlLine>,
    pub total: Decimal,
    pub percent_of_revenue: Option<Decimal>,
    pub comparison_total: Option<Decimal>,
    pub variance: Option<Variance>,
}

/// A derived figure (gross profit, net income, ...) with its comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub amount: Decimal,
    pub percent_of_revenue: Option<Decimal>,
    pub comparison: Option<Decimal>,
    pub variance: Option<Variance>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfitLossParams {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub comparison: Option<(NaiveDate, NaiveDate)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitLoss {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub comparison: Option<(NaiveDate, NaiveDate)>,
    pub currency: Currency,
    pub revenue: PlSection,
    pub cogs: PlSection,
    pub operating_expenses: PlSection,
    pub other_income: PlSection,
    pub other_expenses: PlSection,
    pub gross_profit: Metric,
    pub operating_income: Metric,
    pub net_profit_before_tax: Metric,
    pub tax: Metric,
    pub net_profit_after_tax: Metric,
}

/// Activity of one account inside a date range, signed by account type.
fn period_balance(
    account: &Account,
    lines: &[PostedLine],
    start: NaiveDate,
    end: NaiveDate,
) -> Decimal {
    lines
        .iter()
        .filter(|l| {
            l.account_id == account.id && l.transaction_date >= start && l.transaction_date <= end
        })
        .map(|l| account.account_type.signed_delta(l.debit_base, l.credit_base))
        .sum()
}

fn percent_of(amount: Decimal, revenue: Decimal) -> Option<Decimal> {
    if revenue.is_zero() {
        None
    } else {
        Some((amount / revenue * Decimal::ONE_HUNDRED).round_dp(2))
    }
}

enum Band {
    Revenue,
    Cogs,
    Operating,
    OtherIncome,
    OtherExpense,
}

fn band_of(account: &Account, config: &StatementConfig) -> Option<Band> {
    match account.account_type {
        AccountType::Revenue => {
            if StatementConfig::matches(&config.other_income_prefixes, &account.code) {
                Some(Band::OtherIncome)
            } else {
                Some(Band::Revenue)
            }
        }
        AccountType::Expense => {
            if StatementConfig::matches(&config.cogs_prefixes, &account.code) {
                Some(Band::Cogs)
            } else if StatementConfig::matches(&config.other_expense_prefixes, &account.code) {
                Some(Band::OtherExpense)
            } else {
                // Operating is the default expense band, so expense codes
                // outside every configured prefix still appear.
                Some(Band::Operating)
            }
        }
        _ => None,
    }
}

/// Build the P&L from the registry and posted lines.
pub fn profit_loss(
    accounts: &[Account],
    lines: &[PostedLine],
    params: &ProfitLossParams,
    config: &StatementConfig,
    base: &Currency,
) -> ProfitLoss {
    struct Row<'a> {
        account: &'a Account,
        band: Band,
        amount: Decimal,
        comparison: Option<Decimal>,
    }

    let rows: Vec<Row> = accounts
        .iter()
        .filter(|a| !a.is_control)
        .filter_map(|a| band_of(a, config).map(|band| (a, band)))
        .map(|(account, band)| Row {
            account,
            band,
            amount: period_balance(account, lines, params.start, params.end),
            comparison: params
                .comparison
                .map(|(s, e)| period_balance(account, lines, s, e)),
        })
        .filter(|r| !r.amount.is_zero() || r.comparison.is_some_and(|c| !c.is_zero()))
        .collect();

    let revenue_total: Decimal = rows
        .iter()
        .filter(|r| matches!(r.band, Band::Revenue))
        .map(|r| r.amount)
        .sum();

    let section = |title: &str, want: fn(&Band) -> bool| -> PlSection {
        let mut section_lines: Vec<PlLine> = rows
            .iter()
            .filter(|r| want(&r.band))
            .map(|r| PlLine {
                account_id: r.account.id,
                code: r.account.code.clone(),
                name: r.account.name.clone(),
                amount: r.amount,
                percent_of_revenue: percent_of(r.amount, revenue_total),
                comparison: r.comparison,
                variance: r.comparison.map(|c| Variance::between(r.amount, c)),
            })
            .collect();
        section_lines.sort_by(|a, b| a.code.cmp(&b.code));
        let total: Decimal = section_lines.iter().map(|l| l.amount).sum();
        let comparison_total = params
            .comparison
            .map(|_| section_lines.iter().filter_map(|l| l.comparison).sum());
        PlSection {
            title: title.to_string(),
            percent_of_revenue: percent_of(total, revenue_total),
            variance: comparison_total.map(|c| Variance::between(total, c)),
            comparison_total,
            total,
            lines: section_lines,
        }
    };

    let revenue = section("Revenue", |b| matches!(b, Band::Revenue));
    let cogs = section("Cost of Goods Sold", |b| matches!(b, Band::Cogs));
    let operating_expenses = section("Operating Expenses", |b| matches!(b, Band::Operating));
    let other_income = section("Other Income", |b| matches!(b, Band::OtherIncome));
    let other_expenses = section("Other Expenses", |b| matches!(b, Band::OtherExpense));

    let derive = |revenue_t: Decimal, cogs_t, opex_t, oi_t, oe_t| {
        let gross = revenue_t - cogs_t;
        let operating = gross - opex_t;
        let before_tax = operating + oi_t - oe_t;
        let tax = if before_tax > Decimal::ZERO {
            base.round(before_tax * config.tax_rate)
        } else {
            Decimal::ZERO
        };
        (gross, operating, before_tax, tax, before_tax - tax)
    };

    let (gross, operating, before_tax, tax, after_tax) = derive(
        revenue.total,
        cogs.total,
        operating_expenses.total,
        other_income.total,
        other_expenses.total,
    );
    let cmp_derived = params.comparison.map(|_| {
        derive(
            revenue.comparison_total.unwrap_or_default(),
            cogs.comparison_total.unwrap_or_default(),
            operating_expenses.comparison_total.unwrap_or_default(),
            other_income.comparison_total.unwrap_or_default(),
            other_expenses.comparison_total.unwrap_or_default(),
        )
    });

    let metric = |amount: Decimal, comparison: Option<Decimal>| Metric {
        amount,
        percent_of_revenue: percent_of(amount, revenue_total),
        comparison,
        variance: comparison.map(|c| Variance::between(amount, c)),
    };

    ProfitLoss {
        start: params.start,
        end: params.end,
        comparison: params.comparison,
        currency: base.clone(),
        gross_profit: metric(gross, cmp_derived.map(|d| d.0)),
        operating_income: metric(operating, cmp_derived.map(|d| d.1)),
        net_profit_before_tax: metric(before_tax, cmp_derived.map(|d| d.2)),
        tax: metric(tax, cmp_derived.map(|d| d.3)),
        net_profit_after_tax: metric(after_tax, cmp_derived.map(|d| d.4)),
        revenue,
        cogs,
        operating_expenses,
        other_income,
        other_expenses,
    }
}
