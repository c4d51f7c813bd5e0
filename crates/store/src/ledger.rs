use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ebbflow_core::category::{resolve_category, CategoryOverride, OverrideKey, RuleSet};
use ebbflow_core::date::DateFormat;
use ebbflow_core::money::Money;
use ebbflow_core::record::{AccountKind, RawRecord, Transaction, UploadBatch};
use ebbflow_core::text::collapse_whitespace;

/// Process-wide presentation preferences. Persisted with the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryView {
    pub excluded_categories: Vec<String>,
    pub income_categories: Vec<String>,
    pub cash_only: bool,
}

/// Partial update for [`SummaryView`]; `None` fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct SummaryPatch {
    pub excluded_categories: Option<Vec<String>>,
    pub income_categories: Option<Vec<String>>,
    pub cash_only: Option<bool>,
}

/// Lightweight account listing entry.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountInfo {
    pub name: String,
    pub initial_balance: Money,
    pub kind: AccountKind,
}

/// Everything owned by one account. `version` is bumped on every mutation;
/// derived feeds remember the version they were computed against.
#[derive(Debug, Clone, Default)]
pub(crate) struct AccountState {
    pub(crate) uploads: Vec<UploadBatch>,
    pub(crate) rules: RuleSet,
    pub(crate) overrides: Vec<CategoryOverride>,
    pub(crate) initial_balance: Money,
    pub(crate) kind: AccountKind,
    pub(crate) version: u64,
}

impl AccountState {
    fn touch(&mut self) {
        self.version += 1;
    }

    /// Keeps uploads ascending by earliest transaction date; batches with no
    /// normalizable date go last. Stable, so equal keys keep upload order.
    pub(crate) fn sort_uploads(&mut self) {
        self.uploads.sort_by(|a, b| {
            match (a.first_transaction_date(), b.first_transaction_date()) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        });
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FeedCache {
    version: u64,
    transactions: Vec<Transaction>,
    excluded: usize,
}

/// The in-memory ledger: every account's raw uploads, rules and overrides,
/// and every derived view over them.
///
/// Reads are pure functions of current state; writes invalidate the
/// affected account's memoized feed through its version counter. There are
/// no fatal errors: operations addressed to a missing account are no-ops,
/// and reads over one return empty results.
#[derive(Debug, Default)]
pub struct LedgerStore {
    pub(crate) accounts: BTreeMap<String, AccountState>,
    pub(crate) summary: SummaryView,
    pub(crate) feeds: RefCell<HashMap<String, FeedCache>>,
}

impl LedgerStore {
    pub fn new() -> Self {
        LedgerStore::default()
    }

    // ── account management ───────────────────────────────────────────────

    /// Creates an empty `Cash` account; no-op when the name already exists.
    pub fn add_account(&mut self, name: &str) {
        self.accounts
            .entry(name.to_string())
            .or_insert_with(AccountState::default);
    }

    /// Drops the account and everything it owns. Idempotent.
    pub fn remove_account(&mut self, name: &str) {
        self.accounts.remove(name);
        self.feeds.borrow_mut().remove(name);
    }

    pub fn set_account_kind(&mut self, name: &str, kind: AccountKind) {
        if let Some(account) = self.accounts.get_mut(name) {
            account.kind = kind;
            account.touch();
        }
    }

    pub fn set_initial_balance(&mut self, name: &str, balance: Money) {
        if let Some(account) = self.accounts.get_mut(name) {
            account.initial_balance = balance;
            account.touch();
        }
    }

    pub fn account_names(&self) -> Vec<String> {
        self.accounts.keys().cloned().collect()
    }

    pub fn accounts(&self) -> Vec<AccountInfo> {
        self.accounts
            .iter()
            .map(|(name, a)| AccountInfo {
                name: name.clone(),
                initial_balance: a.initial_balance,
                kind: a.kind,
            })
            .collect()
    }

    pub fn find_account(&self, name: &str) -> Option<AccountInfo> {
        self.accounts.get(name).map(|a| AccountInfo {
            name: name.to_string(),
            initial_balance: a.initial_balance,
            kind: a.kind,
        })
    }

    // ── rules ────────────────────────────────────────────────────────────

    /// Adds a rule, or updates the category of an existing pattern in
    /// place, keeping its position in the resolution order.
    pub fn set_rule(&mut self, name: &str, pattern: &str, category: &str) {
        if let Some(account) = self.accounts.get_mut(name) {
            account.rules.set(pattern, category);
            account.touch();
        }
    }

    pub fn remove_rule(&mut self, name: &str, pattern: &str) {
        if let Some(account) = self.accounts.get_mut(name) {
            if account.rules.remove(pattern) {
                account.touch();
            }
        }
    }

    // ── uploads ──────────────────────────────────────────────────────────

    /// Appends a batch stamped with the current time. Does not deduplicate;
    /// callers are expected to have run [`is_duplicate`](Self::is_duplicate)
    /// per record first.
    pub fn append_upload(&mut self, name: &str, date_format: DateFormat, records: Vec<RawRecord>) {
        if let Some(account) = self.accounts.get_mut(name) {
            account.uploads.push(UploadBatch {
                uploaded_at: Utc::now(),
                date_format,
                records,
            });
            account.sort_uploads();
            account.touch();
        }
    }

    /// Removes the batch at `index` in the sorted upload order. Out of
    /// range is a no-op.
    pub fn remove_upload(&mut self, name: &str, index: usize) {
        if let Some(account) = self.accounts.get_mut(name) {
            if index < account.uploads.len() {
                account.uploads.remove(index);
                account.touch();
            }
        }
    }

    /// Corrects the declared date format of an existing batch in place.
    pub fn set_upload_format(&mut self, name: &str, index: usize, date_format: DateFormat) {
        if let Some(account) = self.accounts.get_mut(name) {
            if let Some(batch) = account.uploads.get_mut(index) {
                batch.date_format = date_format;
                account.sort_uploads();
                account.touch();
            }
        }
    }

    pub fn uploads(&self, name: &str) -> Vec<UploadBatch> {
        self.accounts
            .get(name)
            .map(|a| a.uploads.clone())
            .unwrap_or_default()
    }

    /// True when any existing record of the account has the same amount,
    /// the same raw date string, and the same whitespace-collapsed payee.
    pub fn is_duplicate(&self, name: &str, candidate: &RawRecord) -> bool {
        let Some(account) = self.accounts.get(name) else {
            return false;
        };
        let payee = collapse_whitespace(&candidate.payee);
        account.uploads.iter().any(|batch| {
            batch.records.iter().any(|r| {
                r.date == candidate.date
                    && r.amount == candidate.amount
                    && collapse_whitespace(&r.payee) == payee
            })
        })
    }

    // ── derived feeds ────────────────────────────────────────────────────

    /// The account's categorized feed, newest first. Records whose date
    /// fails to normalize are excluded (see
    /// [`excluded_count`](Self::excluded_count)). Empty for unknown names.
    pub fn transactions_for(&self, name: &str) -> Vec<Transaction> {
        self.with_feed(name, |feed| feed.transactions.clone())
            .unwrap_or_default()
    }

    /// How many records the account's last derivation dropped because their
    /// date would not normalize.
    pub fn excluded_count(&self, name: &str) -> usize {
        self.with_feed(name, |feed| feed.excluded).unwrap_or(0)
    }

    /// Union feed across accounts, oldest first. `cash_only` leaves out
    /// `Credit` accounts.
    pub fn all_transactions(&self, cash_only: bool) -> Vec<Transaction> {
        let mut total = Vec::new();
        for (name, account) in &self.accounts {
            if cash_only && account.kind == AccountKind::Credit {
                continue;
            }
            self.with_feed(name, |feed| total.extend(feed.transactions.iter().cloned()));
        }
        total.sort_by(|a, b| a.date.cmp(&b.date));
        total
    }

    pub fn balance_of(transactions: &[Transaction]) -> Money {
        transactions.iter().map(|t| t.amount).sum()
    }

    // ── categories ───────────────────────────────────────────────────────

    /// Distinct labels from the account's rules and overrides, sorted.
    pub fn categories_for(&self, name: &str) -> Vec<String> {
        let Some(account) = self.accounts.get(name) else {
            return Vec::new();
        };
        let mut res = Vec::new();
        collect_categories(account, &mut res);
        res.sort();
        res
    }

    /// Distinct labels across every account's rules and overrides, sorted.
    pub fn all_categories(&self) -> Vec<String> {
        let mut res = Vec::new();
        for account in self.accounts.values() {
            collect_categories(account, &mut res);
        }
        res.sort();
        res
    }

    /// `(inferred, candidates)` income categories over the global feed.
    /// Candidates were seen on at least one inflow; inferred never appear
    /// on an outflow at all.
    pub fn income_categories(&self) -> (Vec<String>, Vec<String>) {
        let mut all = Vec::new();
        let mut expense = Vec::new();
        let mut candidates = Vec::new();
        for txn in self.all_transactions(false) {
            let Some(category) = txn.category else {
                continue;
            };
            if txn.amount.is_positive() && !candidates.contains(&category) {
                candidates.push(category.clone());
            }
            if txn.amount.is_negative() && !expense.contains(&category) {
                expense.push(category.clone());
            }
            if !all.contains(&category) {
                all.push(category);
            }
        }
        let inferred = all.into_iter().filter(|c| !expense.contains(c)).collect();
        (inferred, candidates)
    }

    // ── summary view ─────────────────────────────────────────────────────

    /// Effective summary view: the user's explicit income categories merged
    /// into the inferred set (appended when absent); everything else
    /// verbatim.
    pub fn summary_view(&self) -> SummaryView {
        let (inferred, _) = self.income_categories();
        let mut income_categories = inferred;
        for c in &self.summary.income_categories {
            if !income_categories.contains(c) {
                income_categories.push(c.clone());
            }
        }
        SummaryView {
            excluded_categories: self.summary.excluded_categories.clone(),
            income_categories,
            cash_only: self.summary.cash_only,
        }
    }

    pub fn update_summary_view(&mut self, patch: SummaryPatch) {
        if let Some(excluded) = patch.excluded_categories {
            self.summary.excluded_categories = excluded;
        }
        if let Some(income) = patch.income_categories {
            self.summary.income_categories = income;
        }
        if let Some(cash_only) = patch.cash_only {
            self.summary.cash_only = cash_only;
        }
    }

    // ── overrides ────────────────────────────────────────────────────────

    /// Pins (or, for an empty `category`, unpins) the category of one
    /// transaction by writing an override keyed on its originating raw
    /// record.
    ///
    /// The reverse lookup renders the transaction's date in each batch's
    /// format and compares amount exactly and payee under whitespace
    /// collapse. Two byte-identical records are indistinguishable: the
    /// first found wins, an accepted limitation. No-op when the transaction
    /// already carries the requested category, when the account is missing,
    /// or when no raw record matches.
    pub fn categorize(&mut self, name: &str, transaction: &Transaction, category: &str) {
        if transaction.category.as_deref() == Some(category) {
            return;
        }
        let Some(account) = self.accounts.get_mut(name) else {
            return;
        };
        let Some(key) = find_raw_key(account, transaction) else {
            return;
        };

        let lookup_payee = collapse_whitespace(&key.payee);
        let existing = account.overrides.iter().position(|o| {
            o.key.date == key.date
                && o.key.amount == key.amount
                && collapse_whitespace(&o.key.payee) == lookup_payee
        });

        match existing {
            Some(i) if category.is_empty() => {
                account.overrides.remove(i);
            }
            Some(i) => account.overrides[i].category = category.to_string(),
            None if !category.is_empty() => account.overrides.push(CategoryOverride {
                key,
                category: category.to_string(),
            }),
            None => return,
        }
        account.touch();
    }

    // ── internals ────────────────────────────────────────────────────────

    fn with_feed<T>(&self, name: &str, f: impl FnOnce(&FeedCache) -> T) -> Option<T> {
        let account = self.accounts.get(name)?;
        let mut feeds = self.feeds.borrow_mut();
        let fresh = feeds
            .get(name)
            .is_some_and(|cache| cache.version == account.version);
        if !fresh {
            let (transactions, excluded) = derive_feed(account);
            debug!(
                account = name,
                version = account.version,
                transactions = transactions.len(),
                excluded,
                "derived transaction feed"
            );
            feeds.insert(
                name.to_string(),
                FeedCache {
                    version: account.version,
                    transactions,
                    excluded,
                },
            );
        }
        feeds.get(name).map(f)
    }
}

fn collect_categories(account: &AccountState, res: &mut Vec<String>) {
    for category in account.rules.categories() {
        if !res.iter().any(|c| c == category) {
            res.push(category.to_string());
        }
    }
    for o in &account.overrides {
        if !res.contains(&o.category) {
            res.push(o.category.clone());
        }
    }
}

/// Full derivation of one account's feed: every record of every upload,
/// resolved against the account's rules and overrides, newest first.
/// Returns the feed and the count of records whose date failed to
/// normalize.
fn derive_feed(account: &AccountState) -> (Vec<Transaction>, usize) {
    let mut transactions = Vec::new();
    let mut excluded = 0usize;
    for batch in &account.uploads {
        for record in &batch.records {
            match batch.date_format.normalize(&record.date) {
                Some(date) => transactions.push(Transaction {
                    date,
                    payee: collapse_whitespace(&record.payee),
                    amount: record.amount,
                    category: resolve_category(record, &account.rules, &account.overrides),
                }),
                None => excluded += 1,
            }
        }
    }
    transactions.sort_by(|a, b| b.date.cmp(&a.date));
    (transactions, excluded)
}

fn find_raw_key(account: &AccountState, txn: &Transaction) -> Option<OverrideKey> {
    let payee = collapse_whitespace(&txn.payee);
    for batch in &account.uploads {
        let rendered = batch.date_format.format_date(txn.date);
        for record in &batch.records {
            if record.date == rendered
                && record.amount == txn.amount
                && collapse_whitespace(&record.payee) == payee
            {
                return Some(OverrideKey {
                    date: record.date.clone(),
                    payee: record.payee.clone(),
                    amount: record.amount,
                });
            }
        }
    }
    None
}
