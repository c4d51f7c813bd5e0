use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Neg, Sub};

/// Exact monetary amount. Equality is exact, so amounts can participate in
/// identity keys and the sum-to-zero test without float surprises.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::from(cents) / Decimal::from(100))
    }

    pub fn from_decimal(decimal: Decimal) -> Self {
        Money(decimal.round_dp(2))
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(self) -> bool {
        self.0 < Decimal::ZERO
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Self;
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |a, b| a + b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn from_cents_round_trip() {
        assert_eq!(Money::from_cents(1234).to_string(), "12.34");
        assert_eq!(Money::from_cents(-5000).to_string(), "-50.00");
    }

    #[test]
    fn arithmetic() {
        let a = Money::from_cents(500);
        let b = Money::from_cents(-200);
        assert_eq!(a + b, Money::from_cents(300));
        assert_eq!(a - b, Money::from_cents(700));
        assert_eq!(-a, Money::from_cents(-500));
    }

    #[test]
    fn sum_of_transactions() {
        let total: Money = [Money::from_cents(-2000), Money::from_cents(500)]
            .into_iter()
            .sum();
        assert_eq!(total, Money::from_cents(-1500));
    }

    #[test]
    fn equality_ignores_trailing_zeros() {
        let a = Money::from_decimal(Decimal::from_str("50").unwrap());
        let b = Money::from_decimal(Decimal::from_str("50.00").unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn sign_predicates() {
        assert!(Money::from_cents(1).is_positive());
        assert!(Money::from_cents(-1).is_negative());
        assert!(Money::zero().is_zero());
        assert!(!Money::zero().is_positive());
        assert!(!Money::zero().is_negative());
    }

    #[test]
    fn cancelling_amounts_sum_to_zero() {
        assert!((Money::from_cents(-5000) + Money::from_cents(5000)).is_zero());
        assert!(!(Money::from_cents(-5000) + Money::from_cents(5001)).is_zero());
    }
}
