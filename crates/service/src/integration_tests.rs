//! Integration tests for the full ledger pipeline.
//!
//! Tests: draft → post → balances → statements → reversal, plus the
//! concurrency guarantees (one winner on a double post, no lost balance
//! increments) against the in-memory store.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use tallybook_accounts::{Account, AccountPatch, AccountType, HierarchyFilter};
use tallybook_core::{Currency, LedgerError, LedgerResult, UserId};
use tallybook_currency::{NewRate, RateSource};
use tallybook_journal::{DraftEntry, DraftLine, EntrySource, EntryStatus};
use tallybook_reports::{BalanceSheetParams, ProfitLossParams};
use tallybook_store::InMemoryLedgerStore;

use crate::config::LedgerConfig;
use crate::ledger::LedgerService;
use crate::rates::RateProvider;

fn usd() -> Currency {
    Currency::new("USD").unwrap()
}

fn aed() -> Currency {
    Currency::new("AED").unwrap()
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn setup() -> (LedgerService<InMemoryLedgerStore>, Vec<Account>) {
    tallybook_observability::init();
    let service = LedgerService::new(InMemoryLedgerStore::new(), LedgerConfig::default());
    let chart = service.seed_chart().unwrap();
    (service, chart)
}

fn by_code<'a>(chart: &'a [Account], code: &str) -> &'a Account {
    chart.iter().find(|a| a.code == code).unwrap()
}

fn sale_draft(chart: &[Account], amount: Decimal) -> DraftEntry {
    DraftEntry {
        description: "cash sale".to_string(),
        transaction_date: day(2025, 1, 15),
        currency: usd(),
        exchange_rate: Decimal::ONE,
        source: EntrySource::Sales,
        source_id: Some("INV-1001".to_string()),
        created_by: UserId::new(),
        lines: vec![
            DraftLine {
                account_id: by_code(chart, "1110").id,
                debit: amount,
                credit: Decimal::ZERO,
                cost_center: None,
                project: None,
            },
            DraftLine {
                account_id: by_code(chart, "4100").id,
                debit: Decimal::ZERO,
                credit: amount,
                cost_center: None,
                project: None,
            },
        ],
    }
}

#[test]
fn draft_post_balances_and_statements() {
    let (service, chart) = setup();
    let cash = by_code(&chart, "1110").id;
    let sales = by_code(&chart, "4100").id;

    let entry = service.create_draft(sale_draft(&chart, dec!(500))).unwrap();
    assert_eq!(entry.status, EntryStatus::Draft);
    assert_eq!(entry.journal_no, "JE-000001");

    // Drafts do not move balances.
    assert_eq!(service.get_account(cash).unwrap().balance, dec!(0));

    let posted = service.post_entry(entry.id, UserId::new()).unwrap();
    assert_eq!(posted.status, EntryStatus::Posted);
    assert!(posted.posting_date.is_some());

    assert_eq!(service.get_account(cash).unwrap().balance, dec!(500));
    assert_eq!(service.get_account(sales).unwrap().balance, dec!(500));
    assert_eq!(
        service.balance_as_of(cash, day(2025, 12, 31), None).unwrap(),
        dec!(500)
    );
    // Cutoff before the transaction date sees nothing.
    assert_eq!(
        service.balance_as_of(cash, day(2025, 1, 1), None).unwrap(),
        dec!(0)
    );
    assert_eq!(service.reconcile_account(cash).unwrap(), dec!(500));

    let sheet = service
        .balance_sheet(&BalanceSheetParams {
            as_of: day(2025, 12, 31),
            comparison: None,
            include_zero_balances: false,
        })
        .unwrap();
    assert!(sheet.is_balanced);
    assert_eq!(sheet.total_assets, dec!(500));
    assert_eq!(sheet.total_equity, dec!(500));

    let pl = service
        .profit_loss(&ProfitLossParams {
            start: day(2025, 1, 1),
            end: day(2025, 12, 31),
            comparison: None,
        })
        .unwrap();
    assert_eq!(pl.revenue.total, dec!(500));
    assert_eq!(pl.net_profit_after_tax.amount, dec!(500));
}

#[test]
fn get_entry_resolves_account_labels() {
    let (service, chart) = setup();
    let entry = service.create_draft(sale_draft(&chart, dec!(100))).unwrap();

    let view = service.get_entry(entry.id).unwrap();
    assert_eq!(view.lines.len(), 2);
    assert_eq!(view.lines[0].account_code, "1110");
    assert_eq!(view.lines[0].account_name, "Cash");
    assert_eq!(view.lines[1].account_code, "4100");

    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["entry"]["status"], serde_json::json!("draft"));
}

#[test]
fn reversal_restores_balances_and_blocks_re_reversal() {
    let (service, chart) = setup();
    let cash = by_code(&chart, "1110").id;
    let sales = by_code(&chart, "4100").id;
    let actor = UserId::new();

    let entry = service.create_draft(sale_draft(&chart, dec!(250))).unwrap();
    service.post_entry(entry.id, actor).unwrap();

    let reversal = service
        .reverse_entry(entry.id, actor, "duplicate invoice")
        .unwrap();
    assert_eq!(reversal.journal_no, "REV-JE-000001");
    assert_eq!(reversal.status, EntryStatus::Posted);
    assert_eq!(reversal.reversal_of, Some(entry.id));

    assert_eq!(service.get_account(cash).unwrap().balance, dec!(0));
    assert_eq!(service.get_account(sales).unwrap().balance, dec!(0));
    assert_eq!(service.reconcile_account(cash).unwrap(), dec!(0));

    let original = service.get_entry(entry.id).unwrap().entry;
    assert_eq!(original.status, EntryStatus::Reversed);
    assert_eq!(original.reversal_reason.as_deref(), Some("duplicate invoice"));

    let err = service.reverse_entry(entry.id, actor, "again").unwrap_err();
    assert!(matches!(err, LedgerError::InvalidState { .. }));

    // History still balances after the round trip.
    let sheet = service
        .balance_sheet(&BalanceSheetParams {
            as_of: day(2025, 12, 31),
            comparison: None,
            include_zero_balances: true,
        })
        .unwrap();
    assert!(sheet.is_balanced);
}

#[test]
fn concurrent_double_post_has_one_winner() {
    let (service, chart) = setup();
    let entry = service.create_draft(sale_draft(&chart, dec!(100))).unwrap();
    let service = Arc::new(service);

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let service = service.clone();
            let id = entry.id;
            std::thread::spawn(move || service.post_entry(id, UserId::new()))
        })
        .collect();
    let results: Vec<LedgerResult<_>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(LedgerError::InvalidState { status, .. }) if status == "posted"
    )));

    // Deltas applied exactly once.
    let cash = by_code(&chart, "1110").id;
    assert_eq!(service.get_account(cash).unwrap().balance, dec!(100));
}

#[test]
fn concurrent_posts_to_same_account_lose_nothing() {
    let (service, chart) = setup();
    let cash = by_code(&chart, "1110").id;

    let entries: Vec<_> = (0..8)
        .map(|_| service.create_draft(sale_draft(&chart, dec!(10))).unwrap())
        .collect();
    let service = Arc::new(service);

    let handles: Vec<_> = entries
        .iter()
        .map(|e| {
            let service = service.clone();
            let id = e.id;
            std::thread::spawn(move || service.post_entry(id, UserId::new()))
        })
        .collect();
    for h in handles {
        h.join().unwrap().unwrap();
    }

    assert_eq!(service.get_account(cash).unwrap().balance, dec!(80));
    assert_eq!(service.reconcile_account(cash).unwrap(), dec!(80));
}

#[test]
fn failed_post_leaves_no_partial_state() {
    let (service, chart) = setup();
    let cash = by_code(&chart, "1110").id;
    let sales = by_code(&chart, "4100").id;

    let entry = service.create_draft(sale_draft(&chart, dec!(100))).unwrap();

    // Deactivate the credit-side account after drafting; the post must
    // fail atomically, with the debit side untouched as well.
    service
        .update_account(
            sales,
            AccountPatch {
                active: Some(false),
                ..AccountPatch::default()
            },
        )
        .unwrap();

    let err = service.post_entry(entry.id, UserId::new()).unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    assert_eq!(service.get_account(cash).unwrap().balance, dec!(0));
    assert_eq!(service.get_account(sales).unwrap().balance, dec!(0));
    assert_eq!(
        service.get_entry(entry.id).unwrap().entry.status,
        EntryStatus::Draft
    );
}

#[test]
fn submit_routes_through_pending_approval() {
    let (service, chart) = setup();
    let entry = service.create_draft(sale_draft(&chart, dec!(50))).unwrap();

    let pending = service.submit_entry(entry.id).unwrap();
    assert_eq!(pending.status, EntryStatus::PendingApproval);

    let posted = service.post_entry(entry.id, UserId::new()).unwrap();
    assert_eq!(posted.status, EntryStatus::Posted);
}

#[test]
fn account_type_change_blocked_once_posted() {
    let (service, chart) = setup();
    let cash = by_code(&chart, "1110").id;

    let entry = service.create_draft(sale_draft(&chart, dec!(10))).unwrap();
    service.post_entry(entry.id, UserId::new()).unwrap();

    let err = service
        .update_account(
            cash,
            AccountPatch {
                account_type: Some(AccountType::Expense),
                ..AccountPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidState { .. }));
}

#[test]
fn hierarchy_reflects_seeded_chart() {
    let (service, _) = setup();
    let tree = service.hierarchy(&HierarchyFilter::default()).unwrap();

    let roots: Vec<&str> = tree.iter().map(|n| n.account.code.as_str()).collect();
    assert_eq!(roots, vec!["1000", "2000", "3000", "4000", "5000"]);

    let assets = &tree[0];
    assert_eq!(assets.children[0].account.code, "1100");
    assert_eq!(assets.children[0].children[0].account.code, "1110");

    let cash = assets.children[0].children[0].account.id;
    assert_eq!(service.level_of(cash).unwrap(), 2);
    assert_eq!(service.level_of(assets.account.id).unwrap(), 0);
}

#[test]
fn rate_round_trip_and_margin() {
    let (service, _) = setup();
    service
        .upsert_rate(NewRate {
            from: aed(),
            to: usd(),
            rate: dec!(0.27),
            rate_date: day(2025, 1, 1),
            source: RateSource::CentralBank,
        })
        .unwrap();

    let as_of = day(2025, 6, 1);
    assert_eq!(service.convert(dec!(100), &aed(), &usd(), as_of).unwrap(), dec!(27.00));

    // The reciprocal was stored with the upsert.
    let back = service.convert(dec!(27), &usd(), &aed(), as_of).unwrap();
    assert!((back - dec!(100)).abs() <= aed().tolerance());

    let quoted = service
        .rate_with_margin(&aed(), &usd(), as_of, dec!(0.02))
        .unwrap();
    assert_eq!(quoted, dec!(0.27) * dec!(0.98));

    let err = service
        .convert(dec!(10), &Currency::new("GBP").unwrap(), &usd(), as_of)
        .unwrap_err();
    assert!(matches!(err, LedgerError::UnsupportedCurrency { .. }));
}

#[test]
fn get_rates_filters_and_picks_latest() {
    let (service, _) = setup();
    for (rate, date) in [(dec!(0.26), day(2025, 1, 1)), (dec!(0.27), day(2025, 2, 1))] {
        service
            .upsert_rate(NewRate {
                from: aed(),
                to: usd(),
                rate,
                rate_date: date,
                source: RateSource::Manual,
            })
            .unwrap();
    }

    let history = service.get_rates(&aed(), Some(&usd()), None).unwrap();
    assert_eq!(history.len(), 2);

    let latest = service
        .get_rates(&aed(), Some(&usd()), Some(day(2025, 6, 1)))
        .unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].rate, dec!(0.27));
}

#[test]
fn multicurrency_entry_persists_base_amounts() {
    let (service, chart) = setup();
    let cash = by_code(&chart, "1110").id;

    let mut draft = sale_draft(&chart, dec!(100));
    draft.currency = aed();
    draft.exchange_rate = dec!(0.27);
    let entry = service.create_draft(draft).unwrap();
    assert_eq!(entry.lines[0].debit_base, dec!(27.00));

    service.post_entry(entry.id, UserId::new()).unwrap();
    // Cached balance is in base currency.
    assert_eq!(service.get_account(cash).unwrap().balance, dec!(27.00));
    // Restricting the fold to AED lines still uses base amounts.
    assert_eq!(
        service
            .balance_as_of(cash, day(2025, 12, 31), Some(&aed()))
            .unwrap(),
        dec!(27.00)
    );
}

#[test]
fn many_line_foreign_entry_keeps_statements_balanced() {
    let (service, chart) = setup();
    let cash = by_code(&chart, "1110").id;
    let sales = by_code(&chart, "4100").id;

    // Ten AED debits of 1.00 against one credit of 10.00 at 0.2725: each
    // line rounds to 0.27 in base, so without residue settlement the sides
    // would post as 2.70 vs 2.72.
    let mut lines: Vec<DraftLine> = (0..10)
        .map(|_| DraftLine {
            account_id: cash,
            debit: dec!(1.00),
            credit: Decimal::ZERO,
            cost_center: None,
            project: None,
        })
        .collect();
    lines.push(DraftLine {
        account_id: sales,
        debit: Decimal::ZERO,
        credit: dec!(10.00),
        cost_center: None,
        project: None,
    });
    let draft = DraftEntry {
        description: "multi-line sale".to_string(),
        transaction_date: day(2025, 1, 15),
        currency: aed(),
        exchange_rate: dec!(0.2725),
        source: EntrySource::Sales,
        source_id: None,
        created_by: UserId::new(),
        lines,
    };

    let entry = service.create_draft(draft).unwrap();
    service.post_entry(entry.id, UserId::new()).unwrap();

    assert_eq!(service.get_account(cash).unwrap().balance, dec!(2.72));
    assert_eq!(service.get_account(sales).unwrap().balance, dec!(2.72));

    let sheet = service
        .balance_sheet(&BalanceSheetParams {
            as_of: day(2025, 12, 31),
            comparison: None,
            include_zero_balances: false,
        })
        .unwrap();
    assert!(sheet.is_balanced);
    assert_eq!(sheet.total_assets, dec!(2.72));
    assert_eq!(sheet.total_equity, dec!(2.72));
}

struct FixedProvider;

impl RateProvider for FixedProvider {
    fn name(&self) -> &str {
        "fixed"
    }

    fn fetch(&self, base: &Currency) -> LedgerResult<Vec<NewRate>> {
        Ok(vec![NewRate {
            from: Currency::new("EUR")?,
            to: base.clone(),
            rate: dec!(1.10),
            rate_date: day(2025, 3, 1),
            source: RateSource::Api,
        }])
    }
}

#[test]
fn sync_rates_pulls_from_provider() {
    let (service, _) = setup();
    let count = service.sync_rates(&FixedProvider).unwrap();
    assert_eq!(count, 1);

    let eur = Currency::new("EUR").unwrap();
    assert_eq!(
        service
            .convert(dec!(100), &eur, &usd(), day(2025, 6, 1))
            .unwrap(),
        dec!(110.00)
    );
    // Reciprocal direction is available too.
    assert!(service.convert(dec!(110), &usd(), &eur, day(2025, 6, 1)).is_ok());
}
