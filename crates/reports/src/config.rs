//! Statement layout configuration: code-prefix bands and the tax rate.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which account-code prefixes land in which statement band, plus the
/// P&L tax rate. Defaults follow the standard chart's numbering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementConfig {
    pub current_asset_prefixes: Vec<String>,
    pub fixed_asset_prefixes: Vec<String>,
    pub current_liability_prefixes: Vec<String>,
    pub long_term_liability_prefixes: Vec<String>,
    pub cogs_prefixes: Vec<String>,
    pub operating_expense_prefixes: Vec<String>,
    pub other_income_prefixes: Vec<String>,
    pub other_expense_prefixes: Vec<String>,
    /// Fraction applied to positive pre-tax profit; 0 disables tax.
    pub tax_rate: Decimal,
}

impl Default for StatementConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            current_asset_prefixes: strings(&["11"]),
            fixed_asset_prefixes: strings(&["12"]),
            current_liability_prefixes: strings(&["21"]),
            long_term_liability_prefixes: strings(&["22"]),
            cogs_prefixes: strings(&["51"]),
            operating_expense_prefixes: strings(&["52", "6"]),
            other_income_prefixes: strings(&["81"]),
            other_expense_prefixes: strings(&["82"]),
            tax_rate: Decimal::ZERO,
        }
    }
}

impl StatementConfig {
    pub(crate) fn matches(prefixes: &[String], code: &str) -> bool {
        prefixes.iter().any(|p| code.starts_with(p.as_str()))
    }
}
