//! Admin panel operations.
//!
//! Thin pass-through to PostgREST under the admin's own session (row-level
//! security is the real gate), plus the GoTrue admin API for listing and
//! deleting users. Every successful mutation is audited through
//! [`AuditLog`].

mod audit;

pub use audit::{AUDIT_FUNCTION, AdminAction, AuditLog};

use std::collections::HashMap;

use nullbyte_core::{
    CategoryId, ContactStatus, ContactSubmissionId, OrderId, OrderStatus, Price, ProductId, UserId,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::instrument;

use crate::auth::profile::PROFILES_TABLE;
use crate::models::catalog::PRODUCT_COLUMNS;
use crate::models::{
    AdminStats, AdminUser, Category, CategoryInput, CategoryUpdate, ContactSubmission, Order,
    OrderCustomer, OrderItem, OrderUpdate, OrderWithDetails, Product, ProductInput, ProductUpdate,
    UserProfile, UserUpdate,
};
use crate::supabase::{Datastore, Query, SupabaseError, UserDirectory};

const PRODUCTS: &str = "products";
const CATEGORIES: &str = "categories";
const ORDERS: &str = "orders";
const ORDER_ITEMS: &str = "order_items";
const CONTACTS: &str = "contact_submissions";

/// Errors from admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Backend rejected or failed the call.
    #[error(transparent)]
    Backend(#[from] SupabaseError),

    /// The record does not exist (or is hidden by row-level security).
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Listing or deleting users needs the service role key.
    #[error("user administration is not configured")]
    DirectoryUnavailable,

    /// The submitted values are unusable.
    #[error("{0}")]
    Invalid(String),
}

impl AdminError {
    /// Message for the `error` field of the JSON envelope.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Backend(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// `NoRows` from a single-row write means the id matched nothing.
fn not_found(what: &'static str) -> impl Fn(SupabaseError) -> AdminError {
    move |e| match e {
        SupabaseError::NoRows => AdminError::NotFound(what),
        other => AdminError::Backend(other),
    }
}

fn non_empty_patch<T: Serialize>(update: &T) -> Result<Value, AdminError> {
    let patch = serde_json::to_value(update).map_err(SupabaseError::from)?;
    if patch.as_object().is_none_or(serde_json::Map::is_empty) {
        return Err(AdminError::Invalid("nothing to update".to_owned()));
    }
    Ok(patch)
}

#[derive(Deserialize)]
struct RevenueRow {
    total_amount: Price,
}

/// Admin operations for one signed-in admin.
pub struct AdminService<'a> {
    db: &'a dyn Datastore,
    directory: Option<&'a dyn UserDirectory>,
    audit: AuditLog<'a>,
}

impl<'a> AdminService<'a> {
    #[must_use]
    pub const fn new(db: &'a dyn Datastore, directory: Option<&'a dyn UserDirectory>) -> Self {
        Self {
            db,
            directory,
            audit: AuditLog::new(db),
        }
    }

    fn directory(&self) -> Result<&'a dyn UserDirectory, AdminError> {
        self.directory.ok_or(AdminError::DirectoryUnavailable)
    }

    // =========================================================================
    // Dashboard
    // =========================================================================

    /// Dashboard counters, fetched concurrently.
    ///
    /// # Errors
    ///
    /// Returns the first backend error.
    #[instrument(skip(self))]
    pub async fn get_admin_stats(&self) -> Result<AdminStats, AdminError> {
        let profiles = Query::table(PROFILES_TABLE);
        let products = Query::table(PRODUCTS);
        let orders = Query::table(ORDERS);
        let completed = Query::table(ORDERS)
            .select("total_amount")
            .eq("status", OrderStatus::Completed);
        let pending = Query::table(ORDERS).eq("status", OrderStatus::Pending);
        let unread = Query::table(CONTACTS).eq("status", ContactStatus::New);

        let (total_users, total_products, total_orders, revenue, pending_orders, new_contacts) = tokio::try_join!(
            self.db.count(&profiles),
            self.db.count(&products),
            self.db.count(&orders),
            self.db.fetch::<RevenueRow>(&completed),
            self.db.count(&pending),
            self.db.count(&unread),
        )?;

        Ok(AdminStats {
            total_users,
            total_products,
            total_orders,
            total_revenue: revenue.iter().map(|r| r.total_amount).sum(),
            pending_orders,
            new_contact_submissions: new_contacts,
        })
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Every auth user joined with their profile. A failed profile lookup
    /// lists everyone as `user` with no names.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::DirectoryUnavailable`] without the service role
    /// key, or the directory's error.
    #[instrument(skip(self))]
    pub async fn get_users(&self) -> Result<Vec<AdminUser>, AdminError> {
        let users = self.directory()?.list_users().await?;
        let query = Query::table(PROFILES_TABLE).in_list("user_id", users.iter().map(|u| u.id));
        let profiles: Vec<UserProfile> = self.db.fetch(&query).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load user profiles");
            Vec::new()
        });

        let by_user: HashMap<UserId, &UserProfile> =
            profiles.iter().map(|p| (p.user_id, p)).collect();
        Ok(users
            .iter()
            .map(|u| AdminUser::from_parts(u, by_user.get(&u.id).copied()))
            .collect())
    }

    /// # Errors
    ///
    /// Returns [`AdminError::NotFound`] if the user has no profile row.
    #[instrument(skip(self, update))]
    pub async fn update_user(
        &self,
        user_id: UserId,
        update: &UserUpdate,
    ) -> Result<UserProfile, AdminError> {
        let patch = non_empty_patch(update)?;
        let profile: UserProfile = self
            .db
            .update_one(&Query::table(PROFILES_TABLE).eq("user_id", user_id), &patch)
            .await
            .map_err(not_found("user"))?;

        self.audit
            .record(AdminAction::UpdateUser, user_id, Some(patch))
            .await;
        tracing::info!(%user_id, role = %profile.role, "user updated");
        Ok(profile)
    }

    /// # Errors
    ///
    /// Returns [`AdminError::DirectoryUnavailable`] without the service role
    /// key, or the backend error.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, user_id: UserId) -> Result<(), AdminError> {
        self.directory()?.delete_user(user_id).await?;
        self.audit.record(AdminAction::DeleteUser, user_id, None).await;
        tracing::info!(%user_id, "user deleted");
        Ok(())
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// All products, inactive ones included, newest first.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    #[instrument(skip(self))]
    pub async fn get_products(&self) -> Result<Vec<Product>, AdminError> {
        let query = Query::table(PRODUCTS)
            .select(PRODUCT_COLUMNS)
            .order_by("created_at", false);
        Ok(self.db.fetch(&query).await?)
    }

    /// # Errors
    ///
    /// Returns [`AdminError::Invalid`] for a blank title or negative price.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_product(&self, input: &ProductInput) -> Result<Product, AdminError> {
        if input.title.trim().is_empty() {
            return Err(AdminError::Invalid("title is required".to_owned()));
        }
        if input.price < Price::ZERO {
            return Err(AdminError::Invalid("price cannot be negative".to_owned()));
        }

        let product: Product = self.db.insert_as(PRODUCTS, input).await?;
        self.audit
            .record(
                AdminAction::CreateProduct,
                product.id,
                serde_json::to_value(input).ok(),
            )
            .await;
        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns [`AdminError::NotFound`] for unknown ids.
    #[instrument(skip(self, update))]
    pub async fn update_product(
        &self,
        product_id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, AdminError> {
        if update.price.is_some_and(|p| p < Price::ZERO) {
            return Err(AdminError::Invalid("price cannot be negative".to_owned()));
        }
        let patch = non_empty_patch(update)?;
        let product: Product = self
            .db
            .update_one(&Query::table(PRODUCTS).eq("id", product_id), &patch)
            .await
            .map_err(not_found("product"))?;

        self.audit
            .record(AdminAction::UpdateProduct, product_id, Some(patch))
            .await;
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns the backend error.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: ProductId) -> Result<(), AdminError> {
        self.db
            .delete(&Query::table(PRODUCTS).eq("id", product_id))
            .await?;
        self.audit
            .record(AdminAction::DeleteProduct, product_id, None)
            .await;
        tracing::info!(%product_id, "product deleted");
        Ok(())
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Orders newest first, each joined with its buyer and line items.
    ///
    /// Buyers and items are looked up concurrently; a failed lookup is
    /// logged and treated as empty.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the orders themselves cannot be read.
    #[instrument(skip(self))]
    pub async fn get_orders(&self) -> Result<Vec<OrderWithDetails>, AdminError> {
        let orders: Vec<Order> = self
            .db
            .fetch(&Query::table(ORDERS).order_by("created_at", false))
            .await?;
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let mut buyer_ids: Vec<_> = orders.iter().filter_map(|o| o.user_id).collect();
        buyer_ids.sort_unstable();
        buyer_ids.dedup();
        let customers_query = Query::table(PROFILES_TABLE)
            .select("id, full_name, email")
            .in_list("id", buyer_ids);
        let items_query = Query::table(ORDER_ITEMS)
            .select("id, order_id, product_id, price, quantity, products(title)")
            .in_list("order_id", orders.iter().map(|o| o.id));

        let (customers, items) = tokio::join!(
            self.db.fetch::<OrderCustomer>(&customers_query),
            self.db.fetch::<OrderItem>(&items_query),
        );
        let customers = customers.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load order customers");
            Vec::new()
        });
        let items = items.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load order items");
            Vec::new()
        });

        Ok(join_orders(orders, customers, items))
    }

    /// # Errors
    ///
    /// Returns [`AdminError::NotFound`] for unknown ids.
    #[instrument(skip(self, update))]
    pub async fn update_order(
        &self,
        order_id: OrderId,
        update: &OrderUpdate,
    ) -> Result<Order, AdminError> {
        let patch = non_empty_patch(update)?;
        let order: Order = self
            .db
            .update_one(&Query::table(ORDERS).eq("id", order_id), &patch)
            .await
            .map_err(not_found("order"))?;

        self.audit
            .record(AdminAction::UpdateOrder, order_id, Some(patch))
            .await;
        tracing::info!(%order_id, status = %order.status, "order updated");
        Ok(order)
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// All categories by name, inactive ones included.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn get_categories(&self) -> Result<Vec<Category>, AdminError> {
        Ok(self
            .db
            .fetch(&Query::table(CATEGORIES).order_by("name", true))
            .await?)
    }

    /// # Errors
    ///
    /// Returns [`AdminError::Invalid`] for a blank name.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_category(&self, input: &CategoryInput) -> Result<Category, AdminError> {
        if input.name.trim().is_empty() {
            return Err(AdminError::Invalid("name is required".to_owned()));
        }
        let row = input.to_row();
        let category: Category = self.db.insert_as(CATEGORIES, &row).await?;
        self.audit
            .record(AdminAction::CreateCategory, category.id, Some(row))
            .await;
        Ok(category)
    }

    /// # Errors
    ///
    /// Returns [`AdminError::NotFound`] for unknown ids.
    #[instrument(skip(self, update))]
    pub async fn update_category(
        &self,
        category_id: CategoryId,
        update: &CategoryUpdate,
    ) -> Result<Category, AdminError> {
        let patch = non_empty_patch(update)?;
        let category: Category = self
            .db
            .update_one(&Query::table(CATEGORIES).eq("id", category_id), &patch)
            .await
            .map_err(not_found("category"))?;
        self.audit
            .record(AdminAction::UpdateCategory, category_id, Some(patch))
            .await;
        Ok(category)
    }

    /// # Errors
    ///
    /// Returns the backend error.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, category_id: CategoryId) -> Result<(), AdminError> {
        self.db
            .delete(&Query::table(CATEGORIES).eq("id", category_id))
            .await?;
        self.audit
            .record(AdminAction::DeleteCategory, category_id, None)
            .await;
        Ok(())
    }

    // =========================================================================
    // Contact submissions
    // =========================================================================

    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn get_contact_submissions(&self) -> Result<Vec<ContactSubmission>, AdminError> {
        Ok(self
            .db
            .fetch(&Query::table(CONTACTS).order_by("submitted_at", false))
            .await?)
    }

    /// # Errors
    ///
    /// Returns [`AdminError::NotFound`] for unknown ids.
    #[instrument(skip(self))]
    pub async fn update_contact_submission_status(
        &self,
        submission_id: ContactSubmissionId,
        status: ContactStatus,
    ) -> Result<ContactSubmission, AdminError> {
        let patch = json!({ "status": status });
        let submission: ContactSubmission = self
            .db
            .update_one(&Query::table(CONTACTS).eq("id", submission_id), &patch)
            .await
            .map_err(not_found("contact submission"))?;
        self.audit
            .record(AdminAction::UpdateContactStatus, submission_id, Some(patch))
            .await;
        Ok(submission)
    }
}

/// Attach buyers and items to orders by id. Orders keep their order.
fn join_orders(
    orders: Vec<Order>,
    customers: Vec<OrderCustomer>,
    items: Vec<OrderItem>,
) -> Vec<OrderWithDetails> {
    let customers: HashMap<_, _> = customers.into_iter().map(|c| (c.id, c)).collect();
    let mut items_by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
    for item in items {
        items_by_order.entry(item.order_id).or_default().push(item);
    }

    orders
        .into_iter()
        .map(|order| OrderWithDetails {
            customer: order.user_id.and_then(|id| customers.get(&id).cloned()),
            items: items_by_order.remove(&order.id).unwrap_or_default(),
            order,
        })
        .collect()
}
