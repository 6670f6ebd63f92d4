//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query},
    response::IntoResponse,
};
use nullbyte_core::ProductId;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{Nav, take_flash};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::CurrentVisitor;
use crate::models::{Category, Product};
use crate::services::catalog;

/// Query parameters for the product listing.
#[derive(Debug, Default, Deserialize)]
pub struct ProductsQuery {
    pub category: Option<String>,
}

/// Product listing template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub nav: Nav,
    pub flash: Option<String>,
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
    pub selected: Option<String>,
}

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub nav: Nav,
    pub flash: Option<String>,
    pub product: Product,
}

/// Display the product listing, optionally for one category.
#[instrument(skip_all, fields(category = ?query.category))]
pub async fn index(
    CurrentVisitor(visitor): CurrentVisitor,
    session: Session,
    Query(query): Query<ProductsQuery>,
) -> Result<impl IntoResponse> {
    let db = visitor.context.db();
    let selected = query.category.filter(|c| !c.trim().is_empty());
    let (products, categories) = tokio::join!(
        catalog::list_products(db, selected.as_deref()),
        catalog::list_categories(db),
    );

    // The filter bar is optional; the products are not.
    let categories = categories.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load categories");
        Vec::new()
    });

    Ok(ProductsIndexTemplate {
        nav: Nav::from_snapshot(&visitor.auth),
        flash: take_flash(&session).await,
        products: products?,
        categories,
        selected,
    })
}

/// Display a single product.
#[instrument(skip_all, fields(product_id = %id))]
pub async fn show(
    CurrentVisitor(visitor): CurrentVisitor,
    session: Session,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse> {
    let product = catalog::get_product(visitor.context.db(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_owned()))?;

    Ok(ProductShowTemplate {
        nav: Nav::from_snapshot(&visitor.auth),
        flash: take_flash(&session).await,
        product,
    })
}
