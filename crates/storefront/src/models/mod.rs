//! Domain models for the storefront.
//!
//! Row types mirror the Supabase tables they are read from; input types
//! carry only the columns a caller may write.

pub mod admin;
pub mod cart;
pub mod catalog;
pub mod contact;
pub mod order;
pub mod profile;
pub mod session;

pub use admin::{AdminStats, AdminUser, UserUpdate};
pub use cart::{Cart, CartError, CartItem};
pub use catalog::{
    Category, CategoryInput, CategorySummary, CategoryUpdate, Product, ProductInput,
    ProductUpdate,
};
pub use contact::{ContactError, ContactForm, ContactSubmission};
pub use order::{Order, OrderCustomer, OrderItem, OrderUpdate, OrderWithDetails, ProductTitle};
pub use profile::{ProfileUpdate, UserProfile};

use serde::{Deserialize, Deserializer};

/// Treat an explicit JSON `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
