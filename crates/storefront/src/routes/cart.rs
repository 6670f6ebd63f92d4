//! Cart and checkout route handlers.
//!
//! The cart lives in the session. Form posts redirect back to `/cart` with
//! a flash message; checkout validates the customer details and stops short
//! of taking payment.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    response::{IntoResponse, Redirect, Response},
};
use nullbyte_core::{CheckoutError, CheckoutSummary, CustomerInfo, PricedLine, ProductId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{Nav, set_flash, take_flash};
use crate::auth::AuthSnapshot;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::CurrentVisitor;
use crate::models::Cart;
use crate::models::admin::split_name;
use crate::services::cart::{self, CartServiceError};

// =============================================================================
// Form Types
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddForm {
    pub product_id: ProductId,
    #[serde(default)]
    pub quantity: Option<u32>,
}

/// Update quantity form data.
#[derive(Debug, Deserialize)]
pub struct UpdateForm {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Remove line form data.
#[derive(Debug, Deserialize)]
pub struct RemoveForm {
    pub product_id: ProductId,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartTemplate {
    pub nav: Nav,
    pub flash: Option<String>,
    pub cart: Cart,
    pub summary: CheckoutSummary,
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/checkout.html")]
pub struct CheckoutTemplate {
    pub nav: Nav,
    pub flash: Option<String>,
    pub cart: Cart,
    pub summary: CheckoutSummary,
    pub info: CustomerInfo,
    /// Set once the details pass validation.
    pub confirmed_email: Option<String>,
}

/// Turn a cart rejection into a flash message; server faults stay errors.
async fn flash_or_fail(session: &Session, err: CartServiceError) -> Response {
    let err = AppError::from(err);
    if err.status().is_server_error() {
        return err.into_response();
    }
    set_flash(session, err.user_message()).await;
    Redirect::to("/cart").into_response()
}

/// Checkout form defaults from the visitor's profile.
fn prefill(auth: &AuthSnapshot) -> CustomerInfo {
    let (first_name, last_name) = auth
        .profile
        .as_ref()
        .and_then(|p| p.full_name.as_deref())
        .map(split_name)
        .unwrap_or_default();
    let email = auth
        .profile
        .as_ref()
        .and_then(|p| p.email.clone())
        .or_else(|| auth.user.as_ref().and_then(|u| u.email.clone()));

    CustomerInfo {
        first_name: first_name.unwrap_or_default(),
        last_name: last_name.unwrap_or_default(),
        email: email.unwrap_or_default(),
        country: "US".to_owned(),
        ..CustomerInfo::default()
    }
}

// =============================================================================
// Cart
// =============================================================================

/// Display the cart.
pub async fn show(
    CurrentVisitor(visitor): CurrentVisitor,
    session: Session,
) -> Result<impl IntoResponse> {
    let cart = cart::load(&session).await?;
    Ok(CartTemplate {
        nav: Nav::from_snapshot(&visitor.auth),
        flash: take_flash(&session).await,
        summary: cart.summary(),
        cart,
    })
}

/// Add a product to the cart.
#[instrument(skip_all, fields(product_id = %form.product_id))]
pub async fn add(
    CurrentVisitor(visitor): CurrentVisitor,
    session: Session,
    Form(form): Form<AddForm>,
) -> Response {
    let quantity = form.quantity.unwrap_or(1);
    match cart::add(&session, visitor.context.db(), form.product_id, quantity).await {
        Ok(_) => {
            add_breadcrumb(
                "cart",
                "Added to cart",
                Some(&[("product_id", &form.product_id.to_string())]),
            );
            set_flash(&session, "Added to your cart.").await;
            Redirect::to("/cart").into_response()
        }
        Err(e) => flash_or_fail(&session, e).await,
    }
}

/// Set a line's quantity; zero removes it.
pub async fn update(session: Session, Form(form): Form<UpdateForm>) -> Response {
    match cart::set_quantity(&session, form.product_id, form.quantity).await {
        Ok(_) => Redirect::to("/cart").into_response(),
        Err(e) => flash_or_fail(&session, e).await,
    }
}

/// Remove a line.
pub async fn remove(session: Session, Form(form): Form<RemoveForm>) -> Response {
    match cart::remove(&session, form.product_id).await {
        Ok(_) => Redirect::to("/cart").into_response(),
        Err(e) => flash_or_fail(&session, e).await,
    }
}

/// Empty the cart.
pub async fn clear(session: Session) -> Result<Redirect> {
    cart::clear(&session).await?;
    set_flash(&session, "Your cart is empty.").await;
    Ok(Redirect::to("/cart"))
}

// =============================================================================
// Checkout
// =============================================================================

async fn empty_cart_redirect(session: &Session) -> Response {
    set_flash(
        session,
        "Your cart is empty. Add some products before checkout.",
    )
    .await;
    Redirect::to("/products").into_response()
}

/// Display the checkout form.
pub async fn checkout_page(
    CurrentVisitor(visitor): CurrentVisitor,
    session: Session,
) -> Result<Response> {
    let cart = cart::load(&session).await?;
    if cart.is_empty() {
        return Ok(empty_cart_redirect(&session).await);
    }

    Ok(CheckoutTemplate {
        nav: Nav::from_snapshot(&visitor.auth),
        flash: take_flash(&session).await,
        summary: cart.summary(),
        cart,
        info: prefill(&visitor.auth),
        confirmed_email: None,
    }
    .into_response())
}

/// Validate checkout details.
///
/// Payment is not taken here; valid details are confirmed back to the
/// visitor with the final totals.
#[instrument(skip_all)]
pub async fn checkout(
    CurrentVisitor(visitor): CurrentVisitor,
    session: Session,
    Form(info): Form<CustomerInfo>,
) -> Result<Response> {
    let cart = cart::load(&session).await?;
    if cart.is_empty() {
        return Ok(empty_cart_redirect(&session).await);
    }
    let summary = cart.summary();

    let (flash, confirmed_email) = match info.validate() {
        Ok(email) => {
            tracing::info!(
                items = summary.item_count,
                total = %summary.total,
                "checkout details confirmed"
            );
            (None, Some(email.to_string()))
        }
        Err(e @ (CheckoutError::MissingFields(_) | CheckoutError::InvalidEmail)) => {
            (Some(e.to_string()), None)
        }
        Err(e @ CheckoutError::EmptyCart) => return Err(e.into()),
    };

    Ok(CheckoutTemplate {
        nav: Nav::from_snapshot(&visitor.auth),
        flash,
        cart,
        summary,
        info,
        confirmed_email,
    }
    .into_response())
}

#[cfg(test)]
mod tests {
    use nullbyte_core::Role;

    use super::*;
    use crate::testing::{profile_for, session_for, user};

    #[test]
    fn test_prefill_from_profile() {
        let ada = user("ada@example.com");
        let mut profile = profile_for(&ada, Role::User);
        profile.full_name = Some("Ada King Lovelace".to_owned());
        let auth = AuthSnapshot {
            session: Some(session_for(&ada, "t1")),
            user: Some(ada),
            profile: Some(profile),
            loading: false,
        };

        let info = prefill(&auth);

        assert_eq!(info.first_name, "Ada");
        assert_eq!(info.last_name, "King Lovelace");
        assert_eq!(info.email, "ada@example.com");
        assert_eq!(info.country, "US");
        assert!(info.address.is_empty());
    }

    #[test]
    fn test_prefill_for_anonymous_visitor() {
        let info = prefill(&AuthSnapshot::default());
        assert!(info.first_name.is_empty());
        assert!(info.email.is_empty());
    }
}
