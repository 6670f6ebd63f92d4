//! Session cart.
//!
//! The cart is stored whole in the tower session; prices are captured when
//! the product is added and re-read on the next add.

use nullbyte_core::{CheckoutSummary, Price, PricedLine, ProductId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Product;

/// Per-line quantity cap.
pub const MAX_QUANTITY: u32 = 99;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("that product is not in your cart")]
    NotInCart,

    #[error("at most {max} of one product per order")]
    QuantityTooLarge { max: u32 },

    #[error("that product is not available")]
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub title: String,
    pub unit_price: Price,
    pub quantity: u32,
}

impl PricedLine for CartItem {
    fn unit_price(&self) -> Price {
        self.unit_price
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
}

impl Cart {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add `quantity` of a product, merging with an existing line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Unavailable`] for inactive products and
    /// [`CartError::QuantityTooLarge`] past the per-line cap.
    pub fn add(&mut self, product: &Product, quantity: u32) -> Result<(), CartError> {
        if !product.active {
            return Err(CartError::Unavailable);
        }
        let quantity = quantity.max(1);

        if let Some(line) = self.items.iter_mut().find(|l| l.product_id == product.id) {
            let merged = line.quantity.saturating_add(quantity);
            if merged > MAX_QUANTITY {
                return Err(CartError::QuantityTooLarge { max: MAX_QUANTITY });
            }
            line.quantity = merged;
            line.unit_price = product.price;
            line.title.clone_from(&product.title);
            return Ok(());
        }

        if quantity > MAX_QUANTITY {
            return Err(CartError::QuantityTooLarge { max: MAX_QUANTITY });
        }
        self.items.push(CartItem {
            product_id: product.id,
            title: product.title.clone(),
            unit_price: product.price,
            quantity,
        });
        Ok(())
    }

    /// Set a line's quantity; zero removes it.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInCart`] for unknown products and
    /// [`CartError::QuantityTooLarge`] past the per-line cap.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove(product_id);
        }
        if quantity > MAX_QUANTITY {
            return Err(CartError::QuantityTooLarge { max: MAX_QUANTITY });
        }
        let line = self
            .items
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or(CartError::NotInCart)?;
        line.quantity = quantity;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`CartError::NotInCart`] for unknown products.
    pub fn remove(&mut self, product_id: ProductId) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|l| l.product_id != product_id);
        if self.items.len() == before {
            return Err(CartError::NotInCart);
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    #[must_use]
    pub fn summary(&self) -> CheckoutSummary {
        CheckoutSummary::from_lines(&self.items)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(cents: i64, active: bool) -> Product {
        Product {
            id: ProductId::random(),
            title: "Landing Page Kit".to_owned(),
            description: None,
            price: Price::from_cents(cents),
            category_id: None,
            category: None,
            image_url: None,
            download_url: None,
            preview_url: None,
            tags: Vec::new(),
            featured: false,
            active,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_add_merges_quantities() {
        let kit = product(2500, true);
        let mut cart = Cart::default();
        cart.add(&kit, 1).unwrap();
        cart.add(&kit, 2).unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 3);
        assert_eq!(cart.summary().subtotal, Price::from_cents(7500));
    }

    #[test]
    fn test_inactive_product_is_rejected() {
        let mut cart = Cart::default();
        assert_eq!(cart.add(&product(100, false), 1), Err(CartError::Unavailable));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_quantity_cap() {
        let kit = product(100, true);
        let mut cart = Cart::default();
        cart.add(&kit, MAX_QUANTITY).unwrap();
        assert_eq!(
            cart.add(&kit, 1),
            Err(CartError::QuantityTooLarge { max: MAX_QUANTITY })
        );
        assert_eq!(cart.items[0].quantity, MAX_QUANTITY);
    }

    #[test]
    fn test_zero_quantity_removes_line() {
        let kit = product(100, true);
        let mut cart = Cart::default();
        cart.add(&kit, 2).unwrap();
        cart.set_quantity(kit.id, 0).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.set_quantity(kit.id, 1), Err(CartError::NotInCart));
    }

    #[test]
    fn test_summary_shipping_threshold() {
        let mut cart = Cart::default();
        cart.add(&product(2500, true), 2).unwrap();
        let summary = cart.summary();
        // Exactly $50.00 still pays shipping.
        assert_eq!(summary.shipping, Price::from_cents(999));
        assert_eq!(summary.tax, Price::from_cents(400));
        assert_eq!(summary.total, Price::from_cents(6399));
    }
}
