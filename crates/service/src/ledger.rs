//! `LedgerService`: every operation the ledger exposes.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use tallybook_accounts::{
    Account, AccountNode, AccountPatch, HierarchyFilter, NewAccount, build_hierarchy, level_of,
    standard_chart, would_create_cycle,
};
use tallybook_core::{
    AccountId, Currency, EntryId, Expected, LedgerError, LedgerResult, UserId,
};
use tallybook_currency::{CurrencyConverter, CurrencyRate, NewRate, latest_rate};
use tallybook_journal::{BalanceDelta, DraftEntry, JournalEntry, SourceStatus};
use tallybook_reports::{
    BalanceSheet, BalanceSheetParams, PostedLine, ProfitLoss, ProfitLossParams, posted_lines,
};
use tallybook_store::{LedgerStore, StoreTx, with_retry};

use crate::config::LedgerConfig;
use crate::rates::RateProvider;
use crate::views::EntryView;

type RateLookup = Box<dyn Fn(&Currency, &Currency, NaiveDate) -> Option<Decimal>>;

pub struct LedgerService<S: LedgerStore> {
    store: S,
    config: LedgerConfig,
}

impl<S: LedgerStore> LedgerService<S> {
    pub fn new(store: S, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn base_currency(&self) -> &Currency {
        &self.config.base_currency
    }

    // ---- Account Registry ----

    pub fn create_account(&self, spec: NewAccount) -> LedgerResult<Account> {
        let account = self.store.transact(|tx| {
            if tx.account_by_code(&spec.code)?.is_some() {
                return Err(LedgerError::validation(format!(
                    "account code '{}' already exists",
                    spec.code
                )));
            }
            let parent = match spec.parent_id {
                Some(id) => Some(tx.account(id).map_err(|_| {
                    LedgerError::not_found(format!("parent account {id}"))
                })?),
                None => None,
            };
            spec.validate(parent.as_ref())?;
            let account = spec.clone().into_account(AccountId::new(), Utc::now());
            tx.insert_account(account.clone())?;
            Ok(account)
        })?;
        tracing::info!(code = %account.code, id = %account.id, "account created");
        Ok(account)
    }

    pub fn update_account(&self, id: AccountId, patch: AccountPatch) -> LedgerResult<Account> {
        self.store.transact(|tx| {
            let mut account = tx.account(id)?;
            let has_postings = tx.has_postings(id)?;
            patch.apply(&mut account, has_postings)?;
            if let Some(parent_id) = patch.parent_id {
                let parent = tx.account(parent_id).map_err(|_| {
                    LedgerError::not_found(format!("parent account {parent_id}"))
                })?;
                if parent.account_type != account.account_type {
                    return Err(LedgerError::validation(format!(
                        "account type {} does not match parent type {}",
                        account.account_type, parent.account_type
                    )));
                }
                let accounts = tx.accounts()?;
                if would_create_cycle(&accounts, id, parent_id) {
                    return Err(LedgerError::validation(format!(
                        "parent {parent_id} would create a cycle"
                    )));
                }
            }
            tx.update_account(account.clone())?;
            Ok(account)
        })
    }

    pub fn get_account(&self, id: AccountId) -> LedgerResult<Account> {
        self.store.read(|r| r.account(id).map_err(LedgerError::from))?
    }

    pub fn hierarchy(&self, filter: &HierarchyFilter) -> LedgerResult<Vec<AccountNode>> {
        let accounts = self.store.read(|r| r.accounts())??;
        Ok(build_hierarchy(&accounts, filter))
    }

    /// Depth of an account in the chart (0 for a root).
    pub fn level_of(&self, id: AccountId) -> LedgerResult<u32> {
        let accounts = self.store.read(|r| r.accounts())??;
        level_of(&accounts, id)
    }

    /// Seed the standard chart of accounts. Fails if any seeded code
    /// already exists; nothing is written in that case.
    pub fn seed_chart(&self) -> LedgerResult<Vec<Account>> {
        let accounts = self.store.transact(|tx| {
            let mut by_code: Vec<(String, AccountId)> = Vec::new();
            let mut created = Vec::new();
            for row in standard_chart(&self.config.base_currency) {
                let mut spec = row.spec;
                let parent = match row.parent_code {
                    Some(code) => {
                        let id = by_code
                            .iter()
                            .find(|(c, _)| c == code)
                            .map(|(_, id)| *id)
                            .ok_or_else(|| {
                                LedgerError::consistency(format!(
                                    "seed parent '{code}' not seeded before its child"
                                ))
                            })?;
                        spec.parent_id = Some(id);
                        Some(tx.account(id)?)
                    }
                    None => None,
                };
                spec.validate(parent.as_ref())?;
                let account = spec.into_account(AccountId::new(), Utc::now());
                by_code.push((account.code.clone(), account.id));
                tx.insert_account(account.clone())?;
                created.push(account);
            }
            Ok::<_, LedgerError>(created)
        })?;
        tracing::info!(count = accounts.len(), "standard chart seeded");
        Ok(accounts)
    }

    // ---- Journal Engine ----

    pub fn create_draft(&self, draft: DraftEntry) -> LedgerResult<JournalEntry> {
        let entry = self.store.transact(|tx| {
            for line in &draft.lines {
                let account = tx.account(line.account_id)?;
                if !account.postable() {
                    return Err(LedgerError::validation(format!(
                        "account {} does not accept postings",
                        account.code
                    )));
                }
            }
            let journal_no = tx.next_journal_no()?;
            let entry = draft.clone().build(
                EntryId::new(),
                journal_no,
                &self.config.base_currency,
                Utc::now(),
            )?;
            tx.insert_entry(entry.clone())?;
            Ok(entry)
        })?;
        tracing::info!(journal_no = %entry.journal_no, "draft entry created");
        Ok(entry)
    }

    pub fn submit_entry(&self, id: EntryId) -> LedgerResult<JournalEntry> {
        self.store.transact(|tx| {
            let mut entry = tx.entry(id)?;
            let expected = Expected::Exact(entry.version);
            entry.submit()?;
            entry.version = tx.update_entry(entry.clone(), expected)?;
            Ok(entry)
        })
    }

    /// Post an entry: status flip, balance deltas and source-transaction
    /// completion commit as one unit. Transient version conflicts are
    /// retried; business failures are not.
    pub fn post_entry(&self, id: EntryId, actor: UserId) -> LedgerResult<JournalEntry> {
        let entry = with_retry(&self.config.retry, || {
            self.store.transact(|tx| {
                let mut entry = tx.entry(id)?;
                let expected = Expected::Exact(entry.version);
                let deltas = entry.post(actor, Utc::now())?;
                apply_deltas(tx, &deltas, true)?;
                entry.version = tx.update_entry(entry.clone(), expected)?;
                if let Some(source_id) = &entry.source_id {
                    tx.set_source_status(source_id, SourceStatus::Completed)?;
                }
                Ok(entry)
            })
        })?;
        tracing::info!(journal_no = %entry.journal_no, actor = %actor, "entry posted");
        Ok(entry)
    }

    /// Reverse a posted entry. The reversal is created directly in Posted
    /// status with journal number `REV-<original>`, its deltas exactly
    /// negating the original's, in the same transaction that marks the
    /// original Reversed. The original's source transaction is cancelled;
    /// the reversal entry carries no source key of its own, only the
    /// `reversal_of` back-reference.
    pub fn reverse_entry(
        &self,
        id: EntryId,
        actor: UserId,
        reason: &str,
    ) -> LedgerResult<JournalEntry> {
        let reversal = with_retry(&self.config.retry, || {
            self.store.transact(|tx| {
                let mut entry = tx.entry(id)?;
                let expected = Expected::Exact(entry.version);
                let reversal = entry.reverse(actor, reason, EntryId::new(), Utc::now())?;
                // Reversal deltas apply even if an account has since been
                // deactivated; eligibility was checked when drafting.
                apply_deltas(tx, &reversal.balance_deltas(), false)?;
                entry.version = tx.update_entry(entry.clone(), expected)?;
                tx.insert_entry(reversal.clone())?;
                if let Some(source_id) = &entry.source_id {
                    tx.set_source_status(source_id, SourceStatus::Cancelled)?;
                }
                Ok(reversal)
            })
        })?;
        tracing::info!(
            journal_no = %reversal.journal_no,
            reversal_of = %id,
            actor = %actor,
            "entry reversed"
        );
        Ok(reversal)
    }

    pub fn get_entry(&self, id: EntryId) -> LedgerResult<EntryView> {
        self.store.read(|r| {
            let entry = r.entry(id)?;
            let accounts = r.accounts()?;
            Ok::<_, LedgerError>(EntryView::resolve(entry, &accounts))
        })?
    }

    // ---- Balance Engine ----

    pub fn balance_as_of(
        &self,
        account_id: AccountId,
        as_of: NaiveDate,
        currency: Option<&Currency>,
    ) -> LedgerResult<Decimal> {
        let (account, lines) = self.snapshot_account(account_id)?;
        Ok(tallybook_reports::balance_as_of(
            &account, &lines, as_of, currency,
        ))
    }

    pub fn recompute_balance(&self, account_id: AccountId) -> LedgerResult<Decimal> {
        let (account, lines) = self.snapshot_account(account_id)?;
        Ok(tallybook_reports::recompute_balance(&account, &lines))
    }

    /// Check the cached balance against a recomputation from history.
    pub fn reconcile_account(&self, account_id: AccountId) -> LedgerResult<Decimal> {
        let (account, lines) = self.snapshot_account(account_id)?;
        let result = tallybook_reports::reconcile(&account, &lines);
        if let Err(err) = &result {
            tracing::warn!(code = %account.code, %err, "reconciliation failed");
        }
        result
    }

    // ---- Statement Generator ----

    pub fn balance_sheet(&self, params: &BalanceSheetParams) -> LedgerResult<BalanceSheet> {
        let (accounts, lines) = self.snapshot()?;
        Ok(tallybook_reports::balance_sheet(
            &accounts,
            &lines,
            params,
            &self.config.statements,
            &self.config.base_currency,
        ))
    }

    pub fn profit_loss(&self, params: &ProfitLossParams) -> LedgerResult<ProfitLoss> {
        let (accounts, lines) = self.snapshot()?;
        Ok(tallybook_reports::profit_loss(
            &accounts,
            &lines,
            params,
            &self.config.statements,
            &self.config.base_currency,
        ))
    }

    // ---- Currency Converter ----

    /// Stored rates out of `base`, optionally narrowed to one target, and
    /// when a date is given, reduced to the latest quote per pair.
    pub fn get_rates(
        &self,
        base: &Currency,
        target: Option<&Currency>,
        as_of: Option<NaiveDate>,
    ) -> LedgerResult<Vec<CurrencyRate>> {
        let rates = self.store.read(|r| r.rates())??;
        let mut selected: Vec<CurrencyRate> = rates
            .iter()
            .filter(|r| &r.from == base)
            .filter(|r| target.is_none_or(|t| &r.to == t))
            .cloned()
            .collect();
        if let Some(date) = as_of {
            let mut latest: Vec<CurrencyRate> = Vec::new();
            for rate in &selected {
                if latest.iter().any(|l| l.to == rate.to) {
                    continue;
                }
                if let Some(hit) = latest_rate(&selected, &rate.from, &rate.to, date) {
                    latest.push(hit.clone());
                }
            }
            selected = latest;
        }
        selected.sort_by(|a, b| {
            a.to
                .code()
                .cmp(b.to.code())
                .then(a.rate_date.cmp(&b.rate_date))
        });
        Ok(selected)
    }

    /// Write a rate and its reciprocal.
    pub fn upsert_rate(&self, new: NewRate) -> LedgerResult<CurrencyRate> {
        new.validate()?;
        let rate = new.into_rate();
        self.store.transact(|tx| {
            tx.upsert_rate(rate.clone())?;
            tx.upsert_rate(rate.reciprocal())?;
            Ok::<_, LedgerError>(())
        })?;
        tracing::info!(from = %rate.from, to = %rate.to, rate = %rate.rate, "rate upserted");
        Ok(rate)
    }

    pub fn convert(
        &self,
        amount: Decimal,
        from: &Currency,
        to: &Currency,
        as_of: NaiveDate,
    ) -> LedgerResult<Decimal> {
        self.converter()?.convert(amount, from, to, as_of)
    }

    pub fn rate_with_margin(
        &self,
        from: &Currency,
        to: &Currency,
        as_of: NaiveDate,
        margin: Decimal,
    ) -> LedgerResult<Decimal> {
        self.converter()?.rate_with_margin(from, to, as_of, margin)
    }

    /// Pull quotes from an external provider and store them (plus
    /// reciprocals). Returns the number of quotes written.
    pub fn sync_rates(&self, provider: &dyn RateProvider) -> LedgerResult<usize> {
        let quotes = provider.fetch(&self.config.base_currency)?;
        let count = quotes.len();
        self.store.transact(|tx| {
            for quote in quotes {
                quote.validate()?;
                let rate = quote.into_rate();
                tx.upsert_rate(rate.reciprocal())?;
                tx.upsert_rate(rate)?;
            }
            Ok::<_, LedgerError>(())
        })?;
        tracing::info!(provider = provider.name(), count, "exchange rates synced");
        Ok(count)
    }

    // ---- internals ----

    /// Converter over a snapshot of the stored rates.
    fn converter(&self) -> LedgerResult<CurrencyConverter<RateLookup>> {
        let rates = self.store.read(|r| r.rates())??;
        let lookup: RateLookup = Box::new(move |from, to, as_of| {
            latest_rate(&rates, from, to, as_of).map(|r| r.rate)
        });
        Ok(CurrencyConverter::new(
            self.config.base_currency.clone(),
            lookup,
        ))
    }

    fn snapshot(&self) -> LedgerResult<(Vec<Account>, Vec<PostedLine>)> {
        self.store.read(|r| {
            let accounts = r.accounts()?;
            let entries = r.entries()?;
            Ok::<_, LedgerError>((accounts, posted_lines(&entries)))
        })?
    }

    fn snapshot_account(&self, id: AccountId) -> LedgerResult<(Account, Vec<PostedLine>)> {
        self.store.read(|r| {
            let account = r.account(id)?;
            let entries = r.entries()?;
            Ok::<_, LedgerError>((account, posted_lines(&entries)))
        })?
    }
}

/// Apply balance deltas to the accounts' cached balances, inside the
/// caller's transaction. This is the only write path for `Account.balance`.
fn apply_deltas(
    tx: &mut dyn StoreTx,
    deltas: &[BalanceDelta],
    check_postable: bool,
) -> LedgerResult<()> {
    for delta in deltas {
        let mut account = tx.account(delta.account_id)?;
        if check_postable && !account.postable() {
            return Err(LedgerError::validation(format!(
                "account {} does not accept postings",
                account.code
            )));
        }
        account.balance += account
            .account_type
            .signed_delta(delta.debit_base, delta.credit_base);
        tx.update_account(account)?;
    }
    Ok(())
}
