//! Session-backed cart.
//!
//! The whole [`Cart`] lives under one session key. Every change re-reads
//! the product so an inactive or deleted product cannot be added.

use nullbyte_core::ProductId;
use thiserror::Error;
use tower_sessions::Session;

use crate::models::session::CART;
use crate::models::{Cart, CartError};
use crate::services::catalog;
use crate::supabase::{Datastore, SupabaseError};

#[derive(Debug, Error)]
pub enum CartServiceError {
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error("product not found")]
    ProductNotFound,

    #[error(transparent)]
    Backend(#[from] SupabaseError),

    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// The visitor's cart; empty if none was saved.
///
/// # Errors
///
/// Returns the session store error.
pub async fn load(session: &Session) -> Result<Cart, tower_sessions::session::Error> {
    Ok(session.get::<Cart>(CART).await?.unwrap_or_default())
}

/// # Errors
///
/// Returns the session store error.
pub async fn save(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    if cart.is_empty() {
        session.remove::<Cart>(CART).await?;
        return Ok(());
    }
    session.insert(CART, cart).await
}

/// Add an active product at its current price.
///
/// # Errors
///
/// Returns [`CartServiceError::ProductNotFound`] for unknown or inactive
/// products, or the cart rule that was broken.
pub async fn add(
    session: &Session,
    db: &dyn Datastore,
    product_id: ProductId,
    quantity: u32,
) -> Result<Cart, CartServiceError> {
    let product = catalog::get_product(db, product_id)
        .await?
        .ok_or(CartServiceError::ProductNotFound)?;

    let mut cart = load(session).await?;
    cart.add(&product, quantity)?;
    save(session, &cart).await?;
    tracing::debug!(%product_id, quantity, lines = cart.items.len(), "added to cart");
    Ok(cart)
}

/// # Errors
///
/// Returns the cart rule that was broken or the session store error.
pub async fn set_quantity(
    session: &Session,
    product_id: ProductId,
    quantity: u32,
) -> Result<Cart, CartServiceError> {
    let mut cart = load(session).await?;
    cart.set_quantity(product_id, quantity)?;
    save(session, &cart).await?;
    Ok(cart)
}

/// # Errors
///
/// Returns [`CartError::NotInCart`] or the session store error.
pub async fn remove(session: &Session, product_id: ProductId) -> Result<Cart, CartServiceError> {
    let mut cart = load(session).await?;
    cart.remove(product_id)?;
    save(session, &cart).await?;
    Ok(cart)
}

/// # Errors
///
/// Returns the session store error.
pub async fn clear(session: &Session) -> Result<(), tower_sessions::session::Error> {
    save(session, &Cart::default()).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use nullbyte_core::Price;
    use serde_json::json;
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::testing::FakeDatastore;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn seed(db: &FakeDatastore, cents: &str, active: bool) -> ProductId {
        let id = ProductId::random();
        db.seed(
            "products",
            [json!({ "id": id, "title": "Template", "price": cents, "active": active })],
        );
        id
    }

    #[tokio::test]
    async fn test_add_merges_and_persists() {
        let db = FakeDatastore::new();
        let id = seed(&db, "20.00", true);
        let session = session();

        add(&session, &db, id, 1).await.unwrap();
        add(&session, &db, id, 2).await.unwrap();

        let cart = load(&session).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 3);
        assert_eq!(cart.summary().subtotal, Price::from_cents(6000));
        assert!(cart.summary().free_shipping());
    }

    #[tokio::test]
    async fn test_inactive_product_cannot_be_added() {
        let db = FakeDatastore::new();
        let id = seed(&db, "20.00", false);
        let session = session();

        let err = add(&session, &db, id, 1).await.unwrap_err();

        assert!(matches!(err, CartServiceError::ProductNotFound));
        assert!(load(&session).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_quantity_removes_line() {
        let db = FakeDatastore::new();
        let id = seed(&db, "5.00", true);
        let session = session();
        add(&session, &db, id, 4).await.unwrap();

        let cart = set_quantity(&session, id, 0).await.unwrap();

        assert!(cart.is_empty());
        assert!(load(&session).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_unknown_line_fails() {
        let err = remove(&session(), ProductId::random()).await.unwrap_err();
        assert!(matches!(err, CartServiceError::Cart(CartError::NotInCart)));
    }

    #[tokio::test]
    async fn test_clear() {
        let db = FakeDatastore::new();
        let id = seed(&db, "5.00", true);
        let session = session();
        add(&session, &db, id, 1).await.unwrap();

        clear(&session).await.unwrap();

        assert!(load(&session).await.unwrap().is_empty());
    }
}
