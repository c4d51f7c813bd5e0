use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ebbflow_core::category::{CategoryOverride, RuleSet};
use ebbflow_core::money::Money;
use ebbflow_core::record::{AccountKind, UploadBatch};

use crate::ledger::{AccountState, LedgerStore, SummaryView};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode snapshot: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Persistable image of one account: raw uploads verbatim, the rule map in
/// resolution order, and overrides with their keys byte-for-byte. Nothing
/// derived is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    #[serde(default)]
    pub uploads: Vec<UploadBatch>,
    #[serde(default)]
    pub initial_balance: Money,
    #[serde(default)]
    pub kind: AccountKind,
    #[serde(default)]
    pub rules: RuleSet,
    #[serde(default)]
    pub overrides: Vec<CategoryOverride>,
}

fn default_income_categories() -> Vec<String> {
    vec!["Salary".to_string()]
}

/// Summary view as persisted. A snapshot written before the user ever
/// touched income categories seeds them with "Salary" on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarySnapshot {
    #[serde(default)]
    pub excluded_categories: Vec<String>,
    #[serde(default = "default_income_categories")]
    pub income_categories: Vec<String>,
    #[serde(default)]
    pub cash_only: bool,
}

impl Default for SummarySnapshot {
    fn default() -> Self {
        SummarySnapshot {
            excluded_categories: Vec::new(),
            income_categories: default_income_categories(),
            cash_only: false,
        }
    }
}

/// The whole store as one serializable value. Producing and consuming this
/// is the entire persistence boundary; where the bytes live is the host's
/// concern.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub accounts: BTreeMap<String, AccountSnapshot>,
    #[serde(default)]
    pub summary_view: SummarySnapshot,
}

impl Snapshot {
    pub fn from_store(store: &LedgerStore) -> Self {
        let accounts = store
            .accounts
            .iter()
            .map(|(name, account)| {
                (
                    name.clone(),
                    AccountSnapshot {
                        uploads: account.uploads.clone(),
                        initial_balance: account.initial_balance,
                        kind: account.kind,
                        rules: account.rules.clone(),
                        overrides: account.overrides.clone(),
                    },
                )
            })
            .collect();
        let view = store.summary_view();
        Snapshot {
            accounts,
            summary_view: SummarySnapshot {
                excluded_categories: view.excluded_categories,
                income_categories: view.income_categories,
                cash_only: view.cash_only,
            },
        }
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self).map_err(SnapshotError::Encode)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(json).map_err(SnapshotError::Decode)
    }
}

impl LedgerStore {
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from_store(self)
    }

    /// Rebuilds a store from a snapshot: every account with its uploads
    /// re-sorted by earliest transaction date, rules and overrides exactly
    /// as persisted, and the summary view applied.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let accounts = snapshot
            .accounts
            .into_iter()
            .map(|(name, account)| {
                let mut state = AccountState {
                    uploads: account.uploads,
                    rules: account.rules,
                    overrides: account.overrides,
                    initial_balance: account.initial_balance,
                    kind: account.kind,
                    version: 0,
                };
                state.sort_uploads();
                (name, state)
            })
            .collect();
        LedgerStore {
            accounts,
            summary: SummaryView {
                excluded_categories: snapshot.summary_view.excluded_categories,
                income_categories: snapshot.summary_view.income_categories,
                cash_only: snapshot.summary_view.cash_only,
            },
            feeds: Default::default(),
        }
    }
}
