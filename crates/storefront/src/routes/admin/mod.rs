//! Admin panel route handlers.
//!
//! Read-only HTML views of every admin collection; mutations go through the
//! JSON API in [`api`]. The route guard already limits `/admin` to admins,
//! and each handler re-checks with [`RequireAdmin`].

pub mod api;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::get,
};
use tower_sessions::Session;
use tracing::instrument;

use super::{Nav, take_flash};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{RequireAdmin, Visitor};
use crate::models::{
    AdminStats, AdminUser, Category, ContactSubmission, OrderWithDetails, Product,
};
use crate::services::admin::{AdminError, AdminService};
use crate::state::AppState;
use crate::supabase::UserDirectory;

/// Build the admin router: HTML pages plus the JSON API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin", get(dashboard))
        .route("/admin/{section}", get(section))
        .merge(api::router())
}

/// Admin operations under the admin's own session.
pub(crate) fn service<'a>(
    admin: &'a Visitor,
    directory: Option<&'a dyn UserDirectory>,
) -> AdminService<'a> {
    AdminService::new(admin.context.db(), directory)
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub nav: Nav,
    pub flash: Option<String>,
    pub stats: AdminStats,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/products.html")]
pub struct ProductsTemplate {
    pub nav: Nav,
    pub flash: Option<String>,
    pub products: Vec<Product>,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/orders.html")]
pub struct OrdersTemplate {
    pub nav: Nav,
    pub flash: Option<String>,
    pub orders: Vec<OrderWithDetails>,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/users.html")]
pub struct UsersTemplate {
    pub nav: Nav,
    pub flash: Option<String>,
    pub users: Vec<AdminUser>,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/categories.html")]
pub struct CategoriesTemplate {
    pub nav: Nav,
    pub flash: Option<String>,
    pub categories: Vec<Category>,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/contacts.html")]
pub struct ContactsTemplate {
    pub nav: Nav,
    pub flash: Option<String>,
    pub submissions: Vec<ContactSubmission>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the dashboard.
#[instrument(skip_all)]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
) -> Result<impl IntoResponse> {
    let directory = state.user_directory();
    let stats = service(&admin, directory.as_deref())
        .get_admin_stats()
        .await?;

    Ok(DashboardTemplate {
        nav: Nav::from_snapshot(&admin.auth),
        flash: take_flash(&session).await,
        stats,
    })
}

/// Display one admin collection.
#[instrument(skip(state, admin, session))]
pub async fn section(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Path(section): Path<String>,
) -> Result<Response> {
    let directory = state.user_directory();
    let admin_service = service(&admin, directory.as_deref());
    let nav = Nav::from_snapshot(&admin.auth);
    let flash = take_flash(&session).await;

    let page = match section.as_str() {
        "products" => ProductsTemplate {
            nav,
            flash,
            products: admin_service.get_products().await?,
        }
        .into_response(),
        "orders" => OrdersTemplate {
            nav,
            flash,
            orders: admin_service.get_orders().await?,
        }
        .into_response(),
        "users" => match admin_service.get_users().await {
            Ok(users) => UsersTemplate { nav, flash, users }.into_response(),
            // Without a service role key the rest of the panel still works.
            Err(e @ AdminError::DirectoryUnavailable) => UsersTemplate {
                nav,
                flash: Some(e.user_message()),
                users: Vec::new(),
            }
            .into_response(),
            Err(e) => return Err(e.into()),
        },
        "categories" => CategoriesTemplate {
            nav,
            flash,
            categories: admin_service.get_categories().await?,
        }
        .into_response(),
        "contacts" => ContactsTemplate {
            nav,
            flash,
            submissions: admin_service.get_contact_submissions().await?,
        }
        .into_response(),
        _ => return Err(AppError::NotFound("Page".to_owned())),
    };
    Ok(page)
}
