//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;
use tower_sessions::Session;
use tracing::instrument;

use super::{Nav, take_flash};
use crate::filters;
use crate::middleware::CurrentVisitor;
use crate::models::Product;
use crate::services::catalog;

/// Featured products shown on the home page.
const FEATURED_LIMIT: usize = 6;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub nav: Nav,
    pub flash: Option<String>,
    pub featured: Vec<Product>,
}

/// Display the home page.
///
/// A failed product lookup renders the page without the featured grid.
#[instrument(skip_all)]
pub async fn home(CurrentVisitor(visitor): CurrentVisitor, session: Session) -> impl IntoResponse {
    let featured = catalog::featured_products(visitor.context.db(), FEATURED_LIMIT)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load featured products");
            Vec::new()
        });

    HomeTemplate {
        nav: Nav::from_snapshot(&visitor.auth),
        flash: take_flash(&session).await,
        featured,
    }
}
