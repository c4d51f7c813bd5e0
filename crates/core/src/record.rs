use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::date::DateFormat;
use crate::money::Money;

/// One uploaded statement line, kept exactly as the parser produced it.
/// The date stays raw text; only the batch's [`DateFormat`] can read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub date: String,
    pub amount: Money,
    pub payee: String,
    #[serde(default)]
    pub address: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// One import event: the records of a single upload plus the date format
/// declared for it. Immutable once appended, except for `date_format`,
/// which the user may correct after the fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadBatch {
    pub uploaded_at: DateTime<Utc>,
    pub date_format: DateFormat,
    pub records: Vec<RawRecord>,
}

impl UploadBatch {
    /// Earliest record date that normalizes under the batch's format.
    /// `None` when nothing normalizes; such batches sort after dated ones.
    pub fn first_transaction_date(&self) -> Option<NaiveDate> {
        self.records
            .iter()
            .filter_map(|r| self.date_format.normalize(&r.date))
            .min()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountKind {
    #[default]
    Cash,
    Credit,
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountKind::Cash => write!(f, "Cash"),
            AccountKind::Credit => write!(f, "Credit"),
        }
    }
}

/// Derived, categorized view of one raw record. Never stored; always
/// recomputed from the owning account's uploads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    /// Whitespace-collapsed payee.
    pub payee: String,
    pub amount: Money,
    pub category: Option<String>,
}
