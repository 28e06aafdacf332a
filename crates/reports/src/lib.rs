//! Balance Engine and Statement Generator.
//!
//! Everything here is a pure function of posted lines plus the account
//! registry: balances and statements are recomputable at any time and never
//! mutate state.

pub mod balance;
pub mod balance_sheet;
pub mod config;
pub mod profit_loss;

pub use balance::{PostedLine, balance_as_of, posted_lines, reconcile, recompute_balance};
pub use balance_sheet::{BalanceSheet, BalanceSheetParams, Section, StatementLine, Variance, balance_sheet};
pub use config::StatementConfig;
pub use profit_loss::{PlLine, PlSection, ProfitLoss, ProfitLossParams, profit_loss};
