//! Chart hierarchy: depth computation, cycle guards, tree building, seeding.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use tallybook_core::{AccountId, Currency, LedgerError, LedgerResult};

use crate::account::{Account, AccountType, NewAccount};

/// Hard cap on hierarchy depth. The standard chart uses 4 levels; the cap
/// also bounds parent walks so a corrupted link can never loop forever.
pub const MAX_CHART_DEPTH: u32 = 8;

/// A node in the rendered chart hierarchy (children sorted by code).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountNode {
    pub account: Account,
    pub level: u32,
    pub children: Vec<AccountNode>,
}

/// Filter for `build_hierarchy`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HierarchyFilter {
    pub account_type: Option<AccountType>,
    /// Root the tree at this account instead of at top-level accounts.
    pub parent_id: Option<AccountId>,
    pub include_inactive: bool,
}

/// Depth of an account: 0 for a root, +1 per parent link.
///
/// Walks are bounded by `MAX_CHART_DEPTH`; exceeding it means a cycle or a
/// chart deeper than supported, both rejected.
pub fn level_of(accounts: &[Account], id: AccountId) -> LedgerResult<u32> {
    let by_id: HashMap<AccountId, &Account> = accounts.iter().map(|a| (a.id, a)).collect();
    let mut current = *by_id
        .get(&id)
        .ok_or_else(|| LedgerError::not_found(format!("account {id}")))?;
    let mut level = 0u32;
    while let Some(parent_id) = current.parent_id {
        level += 1;
        if level > MAX_CHART_DEPTH {
            return Err(LedgerError::consistency(format!(
                "account {id} exceeds max chart depth {MAX_CHART_DEPTH} (cycle?)"
            )));
        }
        current = *by_id
            .get(&parent_id)
            .ok_or_else(|| LedgerError::not_found(format!("parent account {parent_id}")))?;
    }
    Ok(level)
}

/// Whether assigning `new_parent` as parent of `id` would create a cycle.
pub fn would_create_cycle(accounts: &[Account], id: AccountId, new_parent: AccountId) -> bool {
    if id == new_parent {
        return true;
    }
    let by_id: HashMap<AccountId, &Account> = accounts.iter().map(|a| (a.id, a)).collect();
    let mut cursor = Some(new_parent);
    let mut hops = 0u32;
    while let Some(pid) = cursor {
        if pid == id {
            return true;
        }
        hops += 1;
        if hops > MAX_CHART_DEPTH {
            return true;
        }
        cursor = by_id.get(&pid).and_then(|a| a.parent_id);
    }
    false
}

/// Build the hierarchy tree for the given filter.
pub fn build_hierarchy(accounts: &[Account], filter: &HierarchyFilter) -> Vec<AccountNode> {
    let visible: Vec<&Account> = accounts
        .iter()
        .filter(|a| filter.include_inactive || a.active)
        .filter(|a| filter.account_type.is_none_or(|t| a.account_type == t))
        .collect();

    let mut children_of: HashMap<Option<AccountId>, Vec<&Account>> = HashMap::new();
    for a in &visible {
        children_of.entry(a.parent_id).or_default().push(a);
    }
    for siblings in children_of.values_mut() {
        siblings.sort_by(|a, b| a.code.cmp(&b.code));
    }

    let roots: Vec<&Account> = match filter.parent_id {
        Some(root) => visible.iter().filter(|a| a.id == root).copied().collect(),
        None => children_of.get(&None).cloned().unwrap_or_default(),
    };

    roots
        .into_iter()
        .map(|a| build_node(a, 0, &children_of))
        .collect()
}

fn build_node(
    account: &Account,
    level: u32,
    children_of: &HashMap<Option<AccountId>, Vec<&Account>>,
) -> AccountNode {
    let children = if level >= MAX_CHART_DEPTH {
        Vec::new()
    } else {
        children_of
            .get(&Some(account.id))
            .map(|kids| {
                kids.iter()
                    .map(|c| build_node(c, level + 1, children_of))
                    .collect()
            })
            .unwrap_or_default()
    };
    AccountNode {
        account: account.clone(),
        level,
        children,
    }
}

/// One seed row: the account spec plus the code of its parent, resolved to
/// an id by the caller while inserting in order.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedAccount {
    pub spec: NewAccount,
    pub parent_code: Option<&'static str>,
}

/// Standard chart seed: control headers plus common postable accounts.
///
/// Codes follow the statement bands: 11xx current assets, 12xx fixed assets,
/// 21xx current liabilities, 22xx long-term liabilities, 3xxx equity,
/// 4xxx revenue, 51xx COGS, 52xx operating expenses, 81xx/82xx other
/// income/expense. Rows are ordered parents-first.
pub fn standard_chart(currency: &Currency) -> Vec<SeedAccount> {
    use AccountType::*;

    let row = |code: &str,
               name: &str,
               ty: AccountType,
               control: bool,
               parent_code: Option<&'static str>| SeedAccount {
        spec: NewAccount {
            code: code.to_string(),
            name: name.to_string(),
            name_alt: None,
            account_type: ty,
            parent_id: None,
            is_control: control,
            allow_posting: !control,
            currency: currency.clone(),
        },
        parent_code,
    };

    vec![
        row("1000", "Assets", Asset, true, None),
        row("1100", "Current Assets", Asset, true, Some("1000")),
        row("1110", "Cash", Asset, false, Some("1100")),
        row("1120", "Bank", Asset, false, Some("1100")),
        row("1130", "Accounts Receivable", Asset, false, Some("1100")),
        row("1140", "Inventory", Asset, false, Some("1100")),
        row("1200", "Fixed Assets", Asset, true, Some("1000")),
        row("1210", "Equipment", Asset, false, Some("1200")),
        row("2000", "Liabilities", Liability, true, None),
        row("2100", "Current Liabilities", Liability, true, Some("2000")),
        row("2110", "Accounts Payable", Liability, false, Some("2100")),
        row("2120", "Taxes Payable", Liability, false, Some("2100")),
        row("2200", "Long-term Liabilities", Liability, true, Some("2000")),
        row("2210", "Loans Payable", Liability, false, Some("2200")),
        row("3000", "Equity", Equity, true, None),
        row("3100", "Owner Capital", Equity, false, Some("3000")),
        row("3200", "Retained Earnings", Equity, false, Some("3000")),
        row("4000", "Revenue", Revenue, true, None),
        row("4100", "Sales Revenue", Revenue, false, Some("4000")),
        row("4200", "Service Revenue", Revenue, false, Some("4000")),
        row("5000", "Expenses", Expense, true, None),
        row("5110", "Cost of Goods Sold", Expense, false, Some("5000")),
        row("5210", "Salaries Expense", Expense, false, Some("5000")),
        row("5220", "Rent Expense", Expense, false, Some("5000")),
        row("5230", "Utilities Expense", Expense, false, Some("5000")),
        row("8100", "Other Income", Revenue, false, Some("4000")),
        row("8200", "Other Expenses", Expense, false, Some("5000")),
    ]
}
