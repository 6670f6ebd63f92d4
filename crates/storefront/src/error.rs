//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. HTML route handlers return
//! `Result<T, AppError>`; the admin JSON API wraps errors in its own
//! envelope instead.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use nullbyte_core::CheckoutError;
use thiserror::Error;

use crate::auth::AuthError;
use crate::models::CartError;
use crate::services::admin::AdminError;
use crate::services::cart::CartServiceError;
use crate::services::catalog::ContactSubmitError;
use crate::supabase::SupabaseError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Supabase call failed.
    #[error("Supabase error: {0}")]
    Supabase(#[from] SupabaseError),

    /// Authentication action failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Admin operation failed.
    #[error("Admin error: {0}")]
    Admin(#[from] AdminError),

    /// Cart change rejected.
    #[error("Cart error: {0}")]
    Cart(#[from] CartServiceError),

    /// Contact form rejected or not stored.
    #[error("Contact error: {0}")]
    Contact(#[from] ContactSubmitError),

    /// Checkout details rejected.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Status for a backend error surfaced to the visitor.
///
/// Client-side rejections (row-level security, validation) keep their 4xx
/// status; everything else is the upstream's fault.
pub(crate) fn supabase_status(err: &SupabaseError) -> StatusCode {
    match err {
        SupabaseError::NoRows => StatusCode::NOT_FOUND,
        SupabaseError::NoSession => StatusCode::UNAUTHORIZED,
        SupabaseError::ServiceRoleMissing => StatusCode::SERVICE_UNAVAILABLE,
        SupabaseError::Api { status, .. } if (400..500).contains(status) && *status != 429 => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST)
        }
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl AppError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Supabase(e) => supabase_status(e),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::NotSignedIn => StatusCode::UNAUTHORIZED,
                AuthError::InvalidEmail(_) | AuthError::WeakPassword { .. } => {
                    StatusCode::BAD_REQUEST
                }
                AuthError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                AuthError::Provider(e) => supabase_status(e),
            },
            Self::Admin(err) => match err {
                AdminError::NotFound(_) => StatusCode::NOT_FOUND,
                AdminError::Invalid(_) => StatusCode::BAD_REQUEST,
                AdminError::DirectoryUnavailable => StatusCode::SERVICE_UNAVAILABLE,
                AdminError::Backend(e) => supabase_status(e),
            },
            Self::Cart(err) => match err {
                CartServiceError::Cart(CartError::NotInCart) | CartServiceError::ProductNotFound => {
                    StatusCode::NOT_FOUND
                }
                CartServiceError::Cart(_) => StatusCode::BAD_REQUEST,
                CartServiceError::Backend(e) => supabase_status(e),
                CartServiceError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Contact(err) => match err {
                ContactSubmitError::Invalid(_) => StatusCode::BAD_REQUEST,
                ContactSubmitError::Backend(e) => supabase_status(e),
            },
            Self::Checkout(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the visitor.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Supabase(e) => e.user_message(),
            Self::Auth(e) => e.user_message(),
            Self::Admin(e) => e.user_message(),
            Self::Cart(CartServiceError::Cart(e)) => e.to_string(),
            Self::Cart(CartServiceError::ProductNotFound) => "Product not found".to_owned(),
            Self::Cart(CartServiceError::Backend(e)) => e.user_message(),
            Self::Contact(ContactSubmitError::Invalid(e)) => e.to_string(),
            Self::Contact(ContactSubmitError::Backend(e)) => e.user_message(),
            Self::Checkout(e) => e.to_string(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::BadRequest(msg) => msg.clone(),
            Self::Cart(CartServiceError::Session(_)) | Self::Session(_) | Self::Internal(_) => {
                "Internal server error".to_owned()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, self.user_message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Called once per request after the visitor's auth state is known.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on sign-out to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
