//! `orders` and `order_items` rows, and the joined admin view.

use chrono::{DateTime, Utc};
use nullbyte_core::{OrderId, OrderItemId, OrderStatus, Price, ProductId, ProfileId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// References `user_profiles.id`.
    #[serde(default)]
    pub user_id: Option<ProfileId>,
    pub total_amount: Price,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Embedded `products(title)` on an order item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductTitle {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    pub price: Price,
    pub quantity: u32,
    #[serde(default)]
    pub products: Option<ProductTitle>,
}

impl OrderItem {
    #[must_use]
    pub fn product_title(&self) -> Option<&str> {
        self.products.as_ref().map(|p| p.title.as_str())
    }
}

/// Buyer columns shown next to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCustomer {
    pub id: ProfileId,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// An order joined with its buyer and line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderWithDetails {
    #[serde(flatten)]
    pub order: Order,
    #[serde(rename = "user_profiles")]
    pub customer: Option<OrderCustomer>,
    #[serde(rename = "order_items")]
    pub items: Vec<OrderItem>,
}

/// Admin-editable order fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
