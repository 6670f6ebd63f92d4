//! Public catalog reads and contact form submission.
//!
//! Runs under the visitor's own connection; row-level security hides
//! inactive rows from anonymous visitors too, but the `active` filters are
//! always sent.

use nullbyte_core::ProductId;
use tracing::instrument;

use crate::models::catalog::PRODUCT_COLUMNS;
use crate::models::{Category, ContactError, ContactForm, ContactSubmission, Product};
use crate::supabase::{Datastore, Query, SupabaseError};

/// Embedding with `!inner` so the category filter drops non-matching rows.
const FILTERED_PRODUCT_COLUMNS: &str = "*,category:categories!inner(name,slug)";

#[derive(Debug, thiserror::Error)]
pub enum ContactSubmitError {
    #[error(transparent)]
    Invalid(#[from] ContactError),

    #[error(transparent)]
    Backend(#[from] SupabaseError),
}

/// Active products, newest first, optionally limited to one category.
///
/// # Errors
///
/// Returns the backend error.
#[instrument(skip(db))]
pub async fn list_products(
    db: &dyn Datastore,
    category_slug: Option<&str>,
) -> Result<Vec<Product>, SupabaseError> {
    let query = match category_slug.map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => Query::table("products")
            .select(FILTERED_PRODUCT_COLUMNS)
            .eq("category.slug", slug),
        None => Query::table("products").select(PRODUCT_COLUMNS),
    };
    db.fetch(&query.eq("active", true).order_by("created_at", false))
        .await
}

/// Active featured products for the home page.
///
/// # Errors
///
/// Returns the backend error.
pub async fn featured_products(
    db: &dyn Datastore,
    limit: usize,
) -> Result<Vec<Product>, SupabaseError> {
    let query = Query::table("products")
        .select(PRODUCT_COLUMNS)
        .eq("active", true)
        .eq("featured", true)
        .order_by("created_at", false)
        .limit(limit);
    db.fetch(&query).await
}

/// One active product; unknown or inactive ids are `Ok(None)`.
///
/// # Errors
///
/// Returns the backend error.
#[instrument(skip(db))]
pub async fn get_product(
    db: &dyn Datastore,
    id: ProductId,
) -> Result<Option<Product>, SupabaseError> {
    let query = Query::table("products")
        .select(PRODUCT_COLUMNS)
        .eq("id", id)
        .eq("active", true);
    db.fetch_optional(&query).await
}

/// Active categories by name.
///
/// # Errors
///
/// Returns the backend error.
pub async fn list_categories(db: &dyn Datastore) -> Result<Vec<Category>, SupabaseError> {
    let query = Query::table("categories")
        .eq("is_active", true)
        .order_by("name", true);
    db.fetch(&query).await
}

/// Validate and store a contact form.
///
/// # Errors
///
/// Returns [`ContactSubmitError::Invalid`] before touching the backend if
/// the form is incomplete.
#[instrument(skip(db, form))]
pub async fn submit_contact_form(
    db: &dyn Datastore,
    form: &ContactForm,
) -> Result<ContactSubmission, ContactSubmitError> {
    let row = form.validate()?;
    let submission: ContactSubmission = db.insert_as("contact_submissions", &row).await?;
    tracing::info!(submission_id = %submission.id, "contact form submitted");
    Ok(submission)
}
