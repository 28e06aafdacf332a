//! Account Registry: chart of accounts, hierarchy, posting-eligibility rules.

pub mod account;
pub mod chart;

pub use account::{Account, AccountPatch, AccountType, NewAccount};
pub use chart::{
    AccountNode, HierarchyFilter, MAX_CHART_DEPTH, SeedAccount, build_hierarchy, level_of,
    standard_chart, would_create_cycle,
};
