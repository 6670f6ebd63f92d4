//! Visitor auth middleware and extractors.
//!
//! [`auth_context_middleware`] runs on every request: it finds (or assigns)
//! the visitor id in the session, fetches the visitor's
//! [`AuthContext`], and stores a [`Visitor`] with a fresh snapshot in the
//! request extensions. Extractors read it back out.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use tower_sessions::Session;

use crate::auth::{AuthContext, AuthSnapshot, VisitorId};
use crate::error::{AppError, set_sentry_user};
use crate::models::session::VISITOR_ID;
use crate::state::AppState;

/// How long a request waits for a new visitor's auth state to settle
/// before the guard falls back to its loading response.
pub const SETTLE_WAIT: Duration = Duration::from_secs(3);

/// The visitor behind the current request.
#[derive(Clone)]
pub struct Visitor {
    pub id: VisitorId,
    pub context: Arc<AuthContext>,
    /// Auth state when the request arrived.
    pub auth: AuthSnapshot,
}

/// Attach the visitor's auth context to the request.
///
/// # Errors
///
/// Returns an error if the session store fails or a Supabase connection
/// cannot be built.
pub async fn auth_context_middleware(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let id = match session.get::<VisitorId>(VISITOR_ID).await? {
        Some(id) => id,
        None => {
            let id = VisitorId::random();
            session.insert(VISITOR_ID, id).await?;
            id
        }
    };

    let context = state.registry().context_for(id).await?;
    let auth = context.settled(SETTLE_WAIT).await;

    if let Some(user) = &auth.user {
        set_sentry_user(&user.id, user.email.as_deref());
        tracing::Span::current().record("user_id", tracing::field::display(user.id));
    }

    request.extensions_mut().insert(Visitor { id, context, auth });
    Ok(next.run(request).await)
}

/// Rejection when an extractor's requirement is not met.
pub enum AuthRejection {
    /// Redirect to the sign-in page (for HTML requests).
    RedirectToLogin(String),
    /// JSON error (for API requests).
    Api(StatusCode, &'static str),
    /// The middleware did not run.
    Missing,
}

impl AuthRejection {
    fn for_request(parts: &Parts, status: StatusCode, message: &'static str) -> Self {
        if parts.uri.path().starts_with("/api/") {
            Self::Api(status, message)
        } else if status == StatusCode::UNAUTHORIZED {
            let next = parts
                .uri
                .path_and_query()
                .map_or("/", axum::http::uri::PathAndQuery::as_str);
            Self::RedirectToLogin(format!("/auth?next={}", urlencoding::encode(next)))
        } else {
            Self::RedirectToLogin("/".to_owned())
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(to) => Redirect::to(&to).into_response(),
            Self::Api(status, message) => {
                (status, Json(json!({ "data": null, "error": message }))).into_response()
            }
            Self::Missing => {
                tracing::error!("visitor extractor used outside auth_context_middleware");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

fn visitor(parts: &Parts) -> Result<Visitor, AuthRejection> {
    parts
        .extensions
        .get::<Visitor>()
        .cloned()
        .ok_or(AuthRejection::Missing)
}

/// The current visitor, signed in or not.
pub struct CurrentVisitor(pub Visitor);

impl<S> FromRequestParts<S> for CurrentVisitor
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        visitor(parts).map(Self)
    }
}

/// Extractor that requires a signed-in visitor.
///
/// # Example
///
/// ```rust,ignore
/// async fn settings(RequireAuth(visitor): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", visitor.auth.display_name().unwrap_or_default())
/// }
/// ```
pub struct RequireAuth(pub Visitor);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let visitor = visitor(parts)?;
        if visitor.auth.is_signed_in() {
            Ok(Self(visitor))
        } else {
            Err(AuthRejection::for_request(
                parts,
                StatusCode::UNAUTHORIZED,
                "Please sign in to continue",
            ))
        }
    }
}

/// Extractor that requires an admin.
///
/// Reads the role from the live profile on every request.
pub struct RequireAdmin(pub Visitor);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let visitor = visitor(parts)?;
        if !visitor.auth.is_signed_in() {
            return Err(AuthRejection::for_request(
                parts,
                StatusCode::UNAUTHORIZED,
                "Please sign in to continue",
            ));
        }
        if !visitor.auth.is_admin() {
            return Err(AuthRejection::for_request(
                parts,
                StatusCode::FORBIDDEN,
                "Admin access required",
            ));
        }
        Ok(Self(visitor))
    }
}
