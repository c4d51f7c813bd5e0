use rust_decimal::Decimal;
use std::str::FromStr;

use ebbflow_core::money::Money;

/// Parses a statement amount: optional `£` sign (before or after a leading
/// minus), thousands commas, exact decimal value.
pub(crate) fn parse_amount(s: &str) -> Option<Money> {
    let s = s.trim();
    let s = if let Some(rest) = s.strip_prefix("-£") {
        format!("-{rest}")
    } else {
        s.strip_prefix('£').unwrap_or(s).to_string()
    };
    let cleaned = s.replace(',', "");
    Decimal::from_str(&cleaned).ok().map(Money::from_decimal)
}
