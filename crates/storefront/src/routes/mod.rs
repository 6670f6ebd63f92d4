//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                        - Home page (featured products)
//! GET  /health                  - Health check
//!
//! # Catalog
//! GET  /products?category=slug  - Product listing
//! GET  /product/{id}            - Product detail
//! GET  /contact                 - Contact form
//! POST /contact                 - Submit contact form
//!
//! # Cart
//! GET  /cart                    - Cart page with totals
//! POST /cart/add                - Add to cart
//! POST /cart/update             - Set a line's quantity (0 removes)
//! POST /cart/remove             - Remove a line
//! POST /cart/clear              - Empty the cart
//! GET  /checkout                - Checkout form
//! POST /checkout                - Validate checkout details
//!
//! # Auth (signed-out visitors only; POSTs rate limited)
//! GET  /auth?mode=&next=        - Sign in / sign up / forgot password
//! POST /auth/sign-in            - Sign in
//! POST /auth/sign-up            - Create account
//! POST /auth/forgot             - Send password reset email
//! POST /sign-out                - Sign out
//! GET  /reset-password          - Recovery link landing / new password form
//! POST /reset-password          - Set new password
//!
//! # Account (signed in)
//! GET  /settings                - Profile and password
//! POST /settings/profile        - Update profile
//! POST /settings/password       - Change password
//!
//! # Admin (admins only)
//! GET  /admin                   - Dashboard
//! GET  /admin/{section}         - products, orders, users, categories, contacts
//! *    /api/admin/...           - JSON API, `{data, error}` envelope
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod contact;
pub mod home;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};
use tower_sessions::Session;

use crate::auth::AuthSnapshot;
use crate::middleware::auth_rate_limiter;
use crate::models::session::FLASH;
use crate::state::AppState;

/// Header state every page renders.
#[derive(Debug, Clone, Default)]
pub struct Nav {
    pub signed_in: bool,
    pub is_admin: bool,
    pub name: Option<String>,
}

impl Nav {
    #[must_use]
    pub fn from_snapshot(snapshot: &AuthSnapshot) -> Self {
        Self {
            signed_in: snapshot.is_signed_in(),
            is_admin: snapshot.is_admin(),
            name: snapshot.display_name(),
        }
    }
}

/// Queue a one-shot message for the next page.
pub async fn set_flash(session: &Session, message: impl Into<String>) {
    if let Err(e) = session.insert(FLASH, message.into()).await {
        tracing::warn!(error = %e, "failed to store flash message");
    }
}

/// Take the queued message, if any.
pub async fn take_flash(session: &Session) -> Option<String> {
    session.remove::<String>(FLASH).await.ok().flatten()
}

/// Create the auth routes router.
fn auth_routes() -> Router<AppState> {
    let forms = Router::new()
        .route("/sign-in", post(auth::sign_in))
        .route("/sign-up", post(auth::sign_up))
        .route("/forgot", post(auth::forgot_password))
        .route_layer(auth_rate_limiter());

    Router::new().route("/", get(auth::page)).merge(forms)
}

/// Create the cart routes router.
fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
}

/// Create the account routes router.
fn settings_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::settings))
        .route("/profile", post(account::update_profile))
        .route("/password", post(account::update_password))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/products", get(products::index))
        .route("/product/{id}", get(products::show))
        .route("/contact", get(contact::page).post(contact::submit))
        .nest("/cart", cart_routes())
        .route("/checkout", get(cart::checkout_page).post(cart::checkout))
        .nest("/auth", auth_routes())
        .route("/sign-out", post(auth::sign_out))
        .route(
            "/reset-password",
            get(auth::reset_password_page).post(auth::reset_password),
        )
        .nest("/settings", settings_routes())
        .merge(admin::routes())
}
