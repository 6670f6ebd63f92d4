//! Type-safe price representation using decimal arithmetic.
//!
//! Supabase stores prices as `numeric`; PostgREST hands them back as JSON
//! numbers. The store sells in USD only, so a price is just a decimal amount
//! in dollars with two-place rounding at the edges.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Mul};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A USD amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Zero dollars.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal dollar amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from an integer number of cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// The underlying dollar amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Round half-up to whole cents.
    #[must_use]
    pub fn round_to_cents(self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Multiply by a rate, e.g. a tax rate of `0.08`.
    #[must_use]
    pub fn apply_rate(self, rate: Decimal) -> Self {
        Self(self.0 * rate).round_to_cents()
    }

    /// Format for display (e.g. `$19.99`).
    #[must_use]
    pub fn display(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.round_to_cents().0)
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Mul<u32> for Price {
    type Output = Self;

    fn mul(self, quantity: u32) -> Self::Output {
        Self(self.0 * Decimal::from(quantity))
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Price::from_cents(1999).to_string(), "$19.99");
        assert_eq!(Price::from_cents(500).to_string(), "$5.00");
        assert_eq!(Price::ZERO.display(), "$0.00");
    }

    #[test]
    fn test_apply_rate_rounds_half_up() {
        // 8% of $10.05 = 0.804 -> $0.80
        assert_eq!(
            Price::from_cents(1005).apply_rate(Decimal::new(8, 2)),
            Price::from_cents(80)
        );
        // 8% of $1.5625 = 0.125 -> $0.13
        assert_eq!(
            Price::new(Decimal::new(15625, 4)).apply_rate(Decimal::new(8, 2)),
            Price::from_cents(13)
        );
    }

    #[test]
    fn test_sum_and_mul() {
        let total: Price = [Price::from_cents(1000) * 2, Price::from_cents(550)]
            .into_iter()
            .sum();
        assert_eq!(total, Price::from_cents(2550));
    }

    #[test]
    fn test_deserializes_json_number() {
        let price: Price = serde_json::from_str("29.99").unwrap();
        assert_eq!(price, Price::from_cents(2999));
    }
}
