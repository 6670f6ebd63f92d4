//! Checkout arithmetic and customer details validation.
//!
//! Totals are computed from the cart lines alone: 8% sales tax on the
//! subtotal and a flat shipping fee that is waived once the subtotal goes
//! over $50.00. Nothing here talks to a payment gateway.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Email, Price};

/// Sales tax applied to the cart subtotal (8%).
pub const TAX_RATE: Decimal = Decimal::from_parts(8, 0, 0, false, 2);

/// Subtotal above which shipping is free ($50.00, exclusive).
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(5000, 0, 0, false, 2);

/// Flat shipping fee below the threshold ($9.99).
pub const FLAT_SHIPPING: Decimal = Decimal::from_parts(999, 0, 0, false, 2);

/// One line of a cart as far as pricing is concerned.
pub trait PricedLine {
    fn unit_price(&self) -> Price;
    fn quantity(&self) -> u32;

    fn line_total(&self) -> Price {
        self.unit_price() * self.quantity()
    }
}

/// Totals shown on the cart and checkout pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckoutSummary {
    pub item_count: u32,
    pub subtotal: Price,
    pub tax: Price,
    pub shipping: Price,
    pub total: Price,
}

impl CheckoutSummary {
    /// Compute totals for a set of cart lines.
    ///
    /// An empty cart costs nothing, shipping included.
    #[must_use]
    pub fn from_lines<L: PricedLine>(lines: &[L]) -> Self {
        let subtotal: Price = lines.iter().map(PricedLine::line_total).sum();
        let item_count = lines.iter().map(PricedLine::quantity).sum();
        let tax = subtotal.apply_rate(TAX_RATE);
        let shipping = if lines.is_empty() || subtotal.amount() > FREE_SHIPPING_THRESHOLD {
            Price::ZERO
        } else {
            Price::new(FLAT_SHIPPING)
        };

        Self {
            item_count,
            subtotal,
            tax,
            shipping,
            total: (subtotal + tax + shipping).round_to_cents(),
        }
    }

    #[must_use]
    pub fn free_shipping(&self) -> bool {
        self.shipping == Price::ZERO
    }
}

/// Errors from validating a checkout submission.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("your cart is empty")]
    EmptyCart,
    #[error("please fill in all required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("please enter a valid email address")]
    InvalidEmail,
}

/// Shipping and contact details entered on the checkout form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default)]
    pub country: String,
}

impl CustomerInfo {
    /// Check required fields, then the email shape.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::MissingFields`] listing every blank required
    /// field, or [`CheckoutError::InvalidEmail`].
    pub fn validate(&self) -> Result<Email, CheckoutError> {
        let required = [
            ("first name", &self.first_name),
            ("last name", &self.last_name),
            ("email", &self.email),
            ("address", &self.address),
            ("city", &self.city),
            ("state", &self.state),
            ("zip code", &self.zip_code),
        ];
        let missing: Vec<&'static str> = required
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect();
        if !missing.is_empty() {
            return Err(CheckoutError::MissingFields(missing));
        }

        Email::parse(self.email.trim()).map_err(|_| CheckoutError::InvalidEmail)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct Line(i64, u32);

    impl PricedLine for Line {
        fn unit_price(&self) -> Price {
            Price::from_cents(self.0)
        }
        fn quantity(&self) -> u32 {
            self.1
        }
    }

    fn complete_info() -> CustomerInfo {
        CustomerInfo {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            address: "1 Engine Way".into(),
            city: "London".into(),
            state: "LDN".into(),
            zip_code: "10001".into(),
            ..CustomerInfo::default()
        }
    }

    #[test]
    fn test_constants() {
        assert_eq!(TAX_RATE.to_string(), "0.08");
        assert_eq!(FREE_SHIPPING_THRESHOLD.to_string(), "50.00");
        assert_eq!(FLAT_SHIPPING.to_string(), "9.99");
    }

    #[test]
    fn test_small_cart_pays_shipping() {
        let summary = CheckoutSummary::from_lines(&[Line(1999, 2)]);
        assert_eq!(summary.item_count, 2);
        assert_eq!(summary.subtotal, Price::from_cents(3998));
        assert_eq!(summary.tax, Price::from_cents(320));
        assert_eq!(summary.shipping, Price::from_cents(999));
        assert_eq!(summary.total, Price::from_cents(5317));
        assert!(!summary.free_shipping());
    }

    #[test]
    fn test_exactly_fifty_still_pays_shipping() {
        let summary = CheckoutSummary::from_lines(&[Line(5000, 1)]);
        assert_eq!(summary.shipping, Price::from_cents(999));
    }

    #[test]
    fn test_over_fifty_ships_free() {
        let summary = CheckoutSummary::from_lines(&[Line(2500, 1), Line(2501, 1)]);
        assert!(summary.free_shipping());
        assert_eq!(summary.tax, Price::from_cents(400));
        assert_eq!(summary.total, Price::from_cents(5401));
    }

    #[test]
    fn test_empty_cart_is_free() {
        let summary = CheckoutSummary::from_lines::<Line>(&[]);
        assert_eq!(summary.total, Price::ZERO);
        assert_eq!(summary.item_count, 0);
    }

    #[test]
    fn test_validate_accepts_complete_info() {
        let email = complete_info().validate().unwrap();
        assert_eq!(email.as_str(), "ada@example.com");
    }

    #[test]
    fn test_validate_lists_missing_fields() {
        let info = CustomerInfo {
            city: "   ".into(),
            zip_code: String::new(),
            ..complete_info()
        };
        assert_eq!(
            info.validate(),
            Err(CheckoutError::MissingFields(vec!["city", "zip code"]))
        );
    }

    #[test]
    fn test_validate_rejects_bad_email() {
        let info = CustomerInfo {
            email: "ada@localhost".into(),
            ..complete_info()
        };
        assert_eq!(info.validate(), Err(CheckoutError::InvalidEmail));
    }

    #[test]
    fn test_missing_fields_message() {
        let err = CheckoutError::MissingFields(vec!["email", "city"]);
        assert_eq!(
            err.to_string(),
            "please fill in all required fields: email, city"
        );
    }
}
