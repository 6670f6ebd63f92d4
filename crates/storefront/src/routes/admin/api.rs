//! Admin JSON API.
//!
//! Every response, success or failure, is a `{data, error}` envelope:
//! exactly one of the two is non-null.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
};
use nullbyte_core::{CategoryId, ContactStatus, ContactSubmissionId, OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use super::service;
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{
    CategoryInput, CategoryUpdate, OrderUpdate, ProductInput, ProductUpdate, UserUpdate,
};
use crate::services::admin::AdminError;
use crate::state::AppState;

/// Build the `/api/admin` router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/stats", get(stats))
        .route("/api/admin/users", get(list_users))
        .route(
            "/api/admin/users/{id}",
            patch(update_user).delete(delete_user),
        )
        .route("/api/admin/products", get(list_products).post(create_product))
        .route(
            "/api/admin/products/{id}",
            patch(update_product).delete(delete_product),
        )
        .route("/api/admin/orders", get(list_orders))
        .route("/api/admin/orders/{id}", patch(update_order))
        .route(
            "/api/admin/categories",
            get(list_categories).post(create_category),
        )
        .route(
            "/api/admin/categories/{id}",
            patch(update_category).delete(delete_category),
        )
        .route("/api/admin/contacts", get(list_contacts))
        .route(
            "/api/admin/contacts/{id}",
            patch(update_contact_status),
        )
}

/// Uniform response body.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub data: Option<T>,
    pub error: Option<String>,
}

/// `data` of a successful delete.
#[derive(Debug, Serialize)]
pub struct Deleted<Id> {
    pub id: Id,
}

/// Body for `PATCH /api/admin/contacts/{id}`.
#[derive(Debug, Deserialize)]
pub struct ContactStatusUpdate {
    pub status: ContactStatus,
}

fn failure(status: StatusCode, message: String) -> Response {
    let body = Envelope::<()> {
        data: None,
        error: Some(message),
    };
    (status, Json(body)).into_response()
}

fn respond<T: Serialize>(success: StatusCode, result: Result<T, AdminError>) -> Response {
    match result {
        Ok(data) => {
            let body = Envelope {
                data: Some(data),
                error: None,
            };
            (success, Json(body)).into_response()
        }
        Err(e) => {
            let err = AppError::from(e);
            let status = err.status();
            if status.is_server_error() {
                let event_id = sentry::capture_error(&err);
                tracing::error!(error = %err, sentry_event_id = %event_id, "admin API error");
            } else {
                tracing::warn!(error = %err, "admin API request rejected");
            }
            failure(status, err.user_message())
        }
    }
}

fn ok<T: Serialize>(result: Result<T, AdminError>) -> Response {
    respond(StatusCode::OK, result)
}

fn deleted<Id: Serialize>(id: Id, result: Result<(), AdminError>) -> Response {
    ok(result.map(|()| Deleted { id }))
}

/// Unwrap a JSON body, answering malformed input inside the envelope.
#[allow(clippy::result_large_err)]
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| failure(rejection.status(), rejection.body_text()))
}

// =============================================================================
// Dashboard
// =============================================================================

pub async fn stats(State(state): State<AppState>, RequireAdmin(admin): RequireAdmin) -> Response {
    let directory = state.user_directory();
    ok(service(&admin, directory.as_deref()).get_admin_stats().await)
}

// =============================================================================
// Users
// =============================================================================

pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Response {
    let directory = state.user_directory();
    ok(service(&admin, directory.as_deref()).get_users().await)
}

pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
    payload: Result<Json<UserUpdate>, JsonRejection>,
) -> Response {
    let update = match body(payload) {
        Ok(update) => update,
        Err(response) => return response,
    };
    let directory = state.user_directory();
    ok(service(&admin, directory.as_deref())
        .update_user(id, &update)
        .await)
}

pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Response {
    if admin.auth.user.as_ref().is_some_and(|u| u.id == id) {
        return failure(
            StatusCode::BAD_REQUEST,
            "You cannot delete your own account".to_owned(),
        );
    }
    let directory = state.user_directory();
    deleted(id, service(&admin, directory.as_deref()).delete_user(id).await)
}

// =============================================================================
// Products
// =============================================================================

pub async fn list_products(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Response {
    let directory = state.user_directory();
    ok(service(&admin, directory.as_deref()).get_products().await)
}

pub async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    payload: Result<Json<ProductInput>, JsonRejection>,
) -> Response {
    let input = match body(payload) {
        Ok(input) => input,
        Err(response) => return response,
    };
    let directory = state.user_directory();
    respond(
        StatusCode::CREATED,
        service(&admin, directory.as_deref())
            .create_product(&input)
            .await,
    )
}

pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    payload: Result<Json<ProductUpdate>, JsonRejection>,
) -> Response {
    let update = match body(payload) {
        Ok(update) => update,
        Err(response) => return response,
    };
    let directory = state.user_directory();
    ok(service(&admin, directory.as_deref())
        .update_product(id, &update)
        .await)
}

pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Response {
    let directory = state.user_directory();
    deleted(
        id,
        service(&admin, directory.as_deref()).delete_product(id).await,
    )
}

// =============================================================================
// Orders
// =============================================================================

pub async fn list_orders(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Response {
    let directory = state.user_directory();
    ok(service(&admin, directory.as_deref()).get_orders().await)
}

pub async fn update_order(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    payload: Result<Json<OrderUpdate>, JsonRejection>,
) -> Response {
    let update = match body(payload) {
        Ok(update) => update,
        Err(response) => return response,
    };
    let directory = state.user_directory();
    ok(service(&admin, directory.as_deref())
        .update_order(id, &update)
        .await)
}

// =============================================================================
// Categories
// =============================================================================

pub async fn list_categories(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Response {
    let directory = state.user_directory();
    ok(service(&admin, directory.as_deref()).get_categories().await)
}

pub async fn create_category(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    payload: Result<Json<CategoryInput>, JsonRejection>,
) -> Response {
    let input = match body(payload) {
        Ok(input) => input,
        Err(response) => return response,
    };
    let directory = state.user_directory();
    respond(
        StatusCode::CREATED,
        service(&admin, directory.as_deref())
            .create_category(&input)
            .await,
    )
}

pub async fn update_category(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CategoryId>,
    payload: Result<Json<CategoryUpdate>, JsonRejection>,
) -> Response {
    let update = match body(payload) {
        Ok(update) => update,
        Err(response) => return response,
    };
    let directory = state.user_directory();
    ok(service(&admin, directory.as_deref())
        .update_category(id, &update)
        .await)
}

pub async fn delete_category(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CategoryId>,
) -> Response {
    let directory = state.user_directory();
    deleted(
        id,
        service(&admin, directory.as_deref()).delete_category(id).await,
    )
}

// =============================================================================
// Contact submissions
// =============================================================================

pub async fn list_contacts(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Response {
    let directory = state.user_directory();
    ok(service(&admin, directory.as_deref())
        .get_contact_submissions()
        .await)
}

pub async fn update_contact_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ContactSubmissionId>,
    payload: Result<Json<ContactStatusUpdate>, JsonRejection>,
) -> Response {
    let update = match body(payload) {
        Ok(update) => update,
        Err(response) => return response,
    };
    let directory = state.user_directory();
    ok(service(&admin, directory.as_deref())
        .update_contact_submission_status(id, update.status)
        .await)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::Value;

    use super::*;

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_success_envelope_has_null_error() {
        let response = ok::<Vec<u32>>(Ok(vec![1, 2]));
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["data"], serde_json::json!([1, 2]));
        assert!(body["error"].is_null());
    }

    #[tokio::test]
    async fn test_not_found_maps_to_404_envelope() {
        let response = ok::<()>(Err(AdminError::NotFound("Product")));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = json_body(response).await;
        assert!(body["data"].is_null());
        assert_eq!(body["error"], "Product not found");
    }

    #[tokio::test]
    async fn test_missing_directory_is_unavailable() {
        let response = ok::<()>(Err(AdminError::DirectoryUnavailable));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_delete_envelope_carries_the_id() {
        let id = ProductId::random();
        let response = deleted(id, Ok(()));
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["data"]["id"], id.to_string());
        assert!(body["error"].is_null());
    }

    #[tokio::test]
    async fn test_created_status_on_create() {
        let response = respond(StatusCode::CREATED, Ok::<_, AdminError>("x"));
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
