use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::money::Money;
use crate::record::RawRecord;
use crate::text::collapse_whitespace;

/// One pattern → category rule with its precompiled regex. A pattern that
/// fails to compile degrades to a literal substring test, so resolution
/// never errors on user input.
#[derive(Debug, Clone)]
struct CompiledRule {
    pattern: String,
    category: String,
    regex: Option<Regex>,
}

impl CompiledRule {
    fn new(pattern: &str, category: &str) -> Self {
        CompiledRule {
            pattern: pattern.to_string(),
            category: category.to_string(),
            regex: Regex::new(pattern).ok(),
        }
    }

    fn matches(&self, payee: &str) -> bool {
        match &self.regex {
            Some(re) => re.is_match(payee),
            None => payee.contains(&self.pattern),
        }
    }
}

/// Ordered pattern → category mapping. Insertion order is the resolution
/// order; re-setting an existing pattern updates its category in place
/// without moving it. Serializes as a JSON object whose key order is the
/// rule order.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        RuleSet::default()
    }

    pub fn set(&mut self, pattern: &str, category: &str) {
        match self.rules.iter_mut().find(|r| r.pattern == pattern) {
            Some(rule) => rule.category = category.to_string(),
            None => self.rules.push(CompiledRule::new(pattern, category)),
        }
    }

    /// Returns true when a rule was actually removed.
    pub fn remove(&mut self, pattern: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| r.pattern != pattern);
        self.rules.len() != before
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// `(pattern, category)` pairs in resolution order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rules
            .iter()
            .map(|r| (r.pattern.as_str(), r.category.as_str()))
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.category.as_str())
    }

    fn first_match(&self, payee: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|r| r.matches(payee))
            .map(|r| r.category.as_str())
    }
}

impl PartialEq for RuleSet {
    fn eq(&self, other: &Self) -> bool {
        self.rules.len() == other.rules.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|(a, b)| a == b)
    }
}

impl Serialize for RuleSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.rules.len()))?;
        for rule in &self.rules {
            map.serialize_entry(&rule.pattern, &rule.category)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RuleSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RuleSetVisitor;

        impl<'de> Visitor<'de> for RuleSetVisitor {
            type Value = RuleSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of pattern to category")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<RuleSet, A::Error> {
                let mut rules = RuleSet::new();
                while let Some((pattern, category)) = access.next_entry::<String, String>()? {
                    rules.set(&pattern, &category);
                }
                Ok(rules)
            }
        }

        deserializer.deserialize_map(RuleSetVisitor)
    }
}

/// Raw-record identity of an override: date and payee exactly as uploaded,
/// amount exact. The payee is only normalized when *looking up* a key,
/// never in the stored key itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideKey {
    pub date: String,
    pub payee: String,
    pub amount: Money,
}

impl OverrideKey {
    pub fn matches(&self, record: &RawRecord) -> bool {
        self.date == record.date
            && self.amount == record.amount
            && collapse_whitespace(&self.payee) == collapse_whitespace(&record.payee)
    }
}

/// Record-specific category assignment. Strictly dominates rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryOverride {
    pub key: OverrideKey,
    pub category: String,
}

/// Resolves a record's category: the first matching rule sets a tentative
/// result, and the last matching override replaces it. Total: malformed
/// input is just a non-match.
pub fn resolve_category(
    record: &RawRecord,
    rules: &RuleSet,
    overrides: &[CategoryOverride],
) -> Option<String> {
    let payee = collapse_whitespace(&record.payee);
    let mut category = rules.first_match(&payee).map(str::to_string);

    for o in overrides {
        if o.key.matches(record) {
            category = Some(o.category.clone());
        }
    }

    category
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: &str, payee: &str, cents: i64) -> RawRecord {
        RawRecord {
            date: date.to_string(),
            amount: Money::from_cents(cents),
            payee: payee.to_string(),
            address: Vec::new(),
            reference: None,
        }
    }

    fn override_for(record: &RawRecord, category: &str) -> CategoryOverride {
        CategoryOverride {
            key: OverrideKey {
                date: record.date.clone(),
                payee: record.payee.clone(),
                amount: record.amount,
            },
            category: category.to_string(),
        }
    }

    #[test]
    fn first_rule_in_insertion_order_wins() {
        let mut rules = RuleSet::new();
        rules.set("TESCO", "Groceries");
        rules.set("STORES", "Shopping");
        let r = record("01-02-18", "TESCO STORES 3297", -2550);
        assert_eq!(
            resolve_category(&r, &rules, &[]),
            Some("Groceries".to_string())
        );
    }

    #[test]
    fn setting_existing_pattern_keeps_its_position() {
        let mut rules = RuleSet::new();
        rules.set("TESCO", "Groceries");
        rules.set("STORES", "Shopping");
        rules.set("TESCO", "Food");
        let pairs: Vec<_> = rules.iter().collect();
        assert_eq!(pairs, vec![("TESCO", "Food"), ("STORES", "Shopping")]);
    }

    #[test]
    fn rules_match_against_collapsed_payee() {
        let mut rules = RuleSet::new();
        rules.set("TESCO STORES", "Groceries");
        // Raw payee has a run of spaces; the rule sees it collapsed.
        let r = record("01-02-18", "TESCO    STORES", -900);
        assert_eq!(
            resolve_category(&r, &rules, &[]),
            Some("Groceries".to_string())
        );
    }

    #[test]
    fn patterns_are_regexes() {
        let mut rules = RuleSet::new();
        rules.set("^AMZN|AMAZON", "Shopping");
        assert_eq!(
            resolve_category(&record("01-02-18", "AMZN MKTP UK", -1299), &rules, &[]),
            Some("Shopping".to_string())
        );
        assert_eq!(
            resolve_category(&record("01-02-18", "WH SMITH", -500), &rules, &[]),
            None
        );
    }

    #[test]
    fn invalid_regex_degrades_to_substring() {
        let mut rules = RuleSet::new();
        rules.set("CARD [", "Fees");
        let hit = record("01-02-18", "CARD [ 1234", -100);
        let miss = record("01-02-18", "CARD 1234", -100);
        assert_eq!(resolve_category(&hit, &rules, &[]), Some("Fees".to_string()));
        assert_eq!(resolve_category(&miss, &rules, &[]), None);
    }

    #[test]
    fn override_beats_rule() {
        let mut rules = RuleSet::new();
        rules.set("TESCO", "Groceries");
        let r = record("01-02-18", "TESCO STORES 3297", -2550);
        let overrides = vec![override_for(&r, "Dining")];
        assert_eq!(
            resolve_category(&r, &rules, &overrides),
            Some("Dining".to_string())
        );
    }

    #[test]
    fn override_requires_exact_date_and_amount() {
        let r = record("01-02-18", "TESCO", -2550);
        let mut other_date = override_for(&r, "Dining");
        other_date.key.date = "02-02-18".to_string();
        let mut other_amount = override_for(&r, "Dining");
        other_amount.key.amount = Money::from_cents(-2551);
        assert_eq!(
            resolve_category(&r, &RuleSet::new(), &[other_date, other_amount]),
            None
        );
    }

    #[test]
    fn override_payee_compares_under_whitespace_collapse() {
        let r = record("01-02-18", "TESCO  STORES", -2550);
        let mut o = override_for(&r, "Dining");
        // Stored key carries a differently-spaced payee; still matches.
        o.key.payee = "TESCO STORES".to_string();
        assert_eq!(
            resolve_category(&r, &RuleSet::new(), &[o]),
            Some("Dining".to_string())
        );
    }

    #[test]
    fn last_matching_override_wins() {
        let r = record("01-02-18", "TESCO", -2550);
        let overrides = vec![override_for(&r, "Dining"), override_for(&r, "Travel")];
        assert_eq!(
            resolve_category(&r, &RuleSet::new(), &overrides),
            Some("Travel".to_string())
        );
    }

    #[test]
    fn no_match_is_none() {
        assert_eq!(
            resolve_category(&record("01-02-18", "TESCO", -1), &RuleSet::new(), &[]),
            None
        );
    }

    #[test]
    fn rule_set_serde_preserves_order() {
        let mut rules = RuleSet::new();
        rules.set("ZETA", "Last");
        rules.set("ALPHA", "First");
        let json = serde_json::to_string(&rules).unwrap();
        assert_eq!(json, r#"{"ZETA":"Last","ALPHA":"First"}"#);
        let back: RuleSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rules);
        let pairs: Vec<_> = back.iter().collect();
        assert_eq!(pairs[0], ("ZETA", "Last"));
    }

    #[test]
    fn remove_reports_whether_anything_went() {
        let mut rules = RuleSet::new();
        rules.set("TESCO", "Groceries");
        assert!(rules.remove("TESCO"));
        assert!(!rules.remove("TESCO"));
        assert!(rules.is_empty());
    }
}
