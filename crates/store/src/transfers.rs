use tracing::debug;

use ebbflow_core::record::Transaction;

use crate::ledger::LedgerStore;

/// Categories whose transactions are treated as money moving between the
/// user's own accounts.
pub const TRANSFER_CATEGORIES: [&str; 2] = ["Transfer", "Credit Card Payment"];

pub fn is_transfer_category(category: &str) -> bool {
    TRANSFER_CATEGORIES.contains(&category)
}

/// A pair of transfer-tagged transactions whose amounts cancel within the
/// matching window. `first` is the earlier side in the date-sorted scan.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedTransfer {
    pub first_account: String,
    pub first: Transaction,
    pub second_account: String,
    pub second: Transaction,
}

/// Pairs transfer-like transactions across accounts.
///
/// The candidates are sorted ascending by date, then every ordered pair
/// `(i, j)` with `j >= i` is kept when the categories agree, `j` is at most
/// 4 days after `i` (the scan only looks forward), and the amounts sum to
/// exactly zero. Matching is deliberately permissive: nothing is consumed,
/// so one transaction may appear in several pairs, and a zero-amount
/// transfer pairs with itself. Quadratic over transfer-tagged transactions
/// only, which stay few relative to the whole feed.
pub fn match_transfers(mut candidates: Vec<(String, Transaction)>) -> Vec<MatchedTransfer> {
    candidates.sort_by(|a, b| a.1.date.cmp(&b.1.date));

    let mut matched = Vec::new();
    for i in 0..candidates.len() {
        let (account_i, txn_i) = &candidates[i];
        for (account_j, txn_j) in &candidates[i..] {
            if txn_j.category != txn_i.category {
                continue;
            }
            if (txn_j.date - txn_i.date).num_days() > 4 {
                continue;
            }
            if !(txn_i.amount + txn_j.amount).is_zero() {
                continue;
            }
            matched.push(MatchedTransfer {
                first_account: account_i.clone(),
                first: txn_i.clone(),
                second_account: account_j.clone(),
                second: txn_j.clone(),
            });
        }
    }
    debug!(
        candidates = candidates.len(),
        matched = matched.len(),
        "transfer scan complete"
    );
    matched
}

impl LedgerStore {
    /// Matched transfer pairs over the whole ledger.
    pub fn transfers(&self) -> Vec<MatchedTransfer> {
        let mut candidates = Vec::new();
        for name in self.account_names() {
            for txn in self.transactions_for(&name) {
                if txn.category.as_deref().is_some_and(is_transfer_category) {
                    candidates.push((name.clone(), txn));
                }
            }
        }
        match_transfers(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ebbflow_core::date::DateFormat;
    use ebbflow_core::money::Money;
    use ebbflow_core::record::RawRecord;

    fn txn(day: u32, cents: i64, category: &str) -> (String, Transaction) {
        tagged("A", day, cents, category)
    }

    fn tagged(account: &str, day: u32, cents: i64, category: &str) -> (String, Transaction) {
        (
            account.to_string(),
            Transaction {
                date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
                payee: "TRANSFER".to_string(),
                amount: Money::from_cents(cents),
                category: Some(category.to_string()),
            },
        )
    }

    #[test]
    fn cancelling_amounts_within_window_match() {
        let pairs = match_transfers(vec![
            tagged("A", 10, -5000, "Transfer"),
            tagged("B", 12, 5000, "Transfer"),
        ]);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].first_account, "A");
        assert_eq!(pairs[0].second_account, "B");
    }

    #[test]
    fn non_cancelling_amounts_do_not_match() {
        let pairs = match_transfers(vec![
            tagged("A", 10, -5000, "Transfer"),
            tagged("B", 12, 5001, "Transfer"),
        ]);
        assert!(pairs.is_empty());
    }

    #[test]
    fn five_day_gap_is_outside_the_window() {
        let pairs = match_transfers(vec![
            tagged("A", 10, -5000, "Transfer"),
            tagged("B", 15, 5000, "Transfer"),
        ]);
        assert!(pairs.is_empty());
    }

    #[test]
    fn four_day_gap_is_inside_the_window() {
        let pairs = match_transfers(vec![
            tagged("A", 10, -5000, "Transfer"),
            tagged("B", 14, 5000, "Transfer"),
        ]);
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn categories_must_agree() {
        let pairs = match_transfers(vec![
            tagged("A", 10, -5000, "Transfer"),
            tagged("B", 12, 5000, "Credit Card Payment"),
        ]);
        assert!(pairs.is_empty());
    }

    #[test]
    fn credit_card_payments_pair_with_each_other() {
        let pairs = match_transfers(vec![
            tagged("Bank", 10, -20000, "Credit Card Payment"),
            tagged("Card", 11, 20000, "Credit Card Payment"),
        ]);
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn nothing_is_consumed_after_a_match() {
        // One outflow, two candidate inflows: both pairs are reported.
        let pairs = match_transfers(vec![
            tagged("A", 10, -5000, "Transfer"),
            tagged("B", 11, 5000, "Transfer"),
            tagged("C", 12, 5000, "Transfer"),
        ]);
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn zero_amount_transfer_pairs_with_itself() {
        // The scan includes the j = i diagonal.
        let pairs = match_transfers(vec![txn(10, 0, "Transfer")]);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].first, pairs[0].second);
    }

    #[test]
    fn scan_only_looks_forward_from_the_earlier_side() {
        // Sorted ascending, the -50 on day 12 never sees the +50 on day 10
        // as its own j, but the pair is still found with i = day 10.
        let pairs = match_transfers(vec![
            tagged("B", 12, -5000, "Transfer"),
            tagged("A", 10, 5000, "Transfer"),
        ]);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].first_account, "A");
    }

    #[test]
    fn store_transfers_only_consider_transfer_categories() {
        let mut store = LedgerStore::new();
        store.add_account("Bank");
        store.add_account("Savings");
        store.set_rule("Bank", "MOVE", "Transfer");
        store.set_rule("Savings", "MOVE", "Transfer");
        store.set_rule("Bank", "TESCO", "Groceries");

        let rec = |date: &str, payee: &str, cents: i64| RawRecord {
            date: date.to_string(),
            amount: Money::from_cents(cents),
            payee: payee.to_string(),
            address: Vec::new(),
            reference: None,
        };
        store.append_upload(
            "Bank",
            DateFormat::DdMmYyyy,
            vec![
                rec("10/03/2024", "MOVE OUT", -5000),
                // Same cancelling shape, but not a transfer category.
                rec("10/03/2024", "TESCO", 5000),
            ],
        );
        store.append_upload(
            "Savings",
            DateFormat::DdMmYyyy,
            vec![rec("12/03/2024", "MOVE IN", 5000)],
        );

        let pairs = store.transfers();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].first_account, "Bank");
        assert_eq!(pairs[0].second_account, "Savings");
        assert_eq!(pairs[0].first.amount, Money::from_cents(-5000));
    }
}
