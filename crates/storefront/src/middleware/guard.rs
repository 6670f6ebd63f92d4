//! Route guard layer.
//!
//! Looks up the request path in the route table, evaluates it against the
//! visitor's snapshot, and turns anything other than
//! [`GuardDecision::Granted`] into a response: redirects and a
//! "verifying access" page for browsers, JSON envelopes for `/api/`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::Request,
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;

use super::auth::Visitor;
use crate::guard::{GuardDecision, RouteRequirement, evaluate};

/// Shown while a visitor's auth state is still settling; reloads itself.
#[derive(Template, WebTemplate)]
#[template(path = "verifying.html")]
pub struct VerifyingTemplate {
    pub path: String,
}

/// Apply the route table to the request.
pub async fn route_guard_middleware(mut request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let requirement = RouteRequirement::for_path(&path);

    let Some(visitor) = request.extensions_mut().get_mut::<Visitor>() else {
        if requirement == RouteRequirement::PUBLIC {
            return next.run(request).await;
        }
        tracing::error!(%path, "route guard ran without a visitor");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    // The snapshot may be a few seconds old; loading can only have cleared.
    // Handlers read the same snapshot the guard decided on.
    if visitor.auth.loading {
        visitor.auth = visitor.context.snapshot();
    }
    let snapshot = visitor.auth.clone();

    let decision = evaluate(requirement, &snapshot, &path);
    let is_api = path.starts_with("/api/");
    match decision {
        GuardDecision::Granted => next.run(request).await,
        GuardDecision::Loading if is_api => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::RETRY_AFTER, "1")],
            Json(json!({ "data": null, "error": "Verifying access, please retry" })),
        )
            .into_response(),
        GuardDecision::Loading => {
            let path = request
                .uri()
                .path_and_query()
                .map_or(path, |pq| pq.as_str().to_owned());
            VerifyingTemplate { path }.into_response()
        }
        GuardDecision::RedirectToAuth { .. } if is_api => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "data": null, "error": "Please sign in to continue" })),
        )
            .into_response(),
        GuardDecision::RedirectToAuth { return_to } => {
            tracing::debug!(%return_to, "redirecting to sign in");
            Redirect::to(&format!("/auth?next={}", urlencoding::encode(&return_to)))
                .into_response()
        }
        GuardDecision::RedirectHome if is_api => (
            StatusCode::FORBIDDEN,
            Json(json!({ "data": null, "error": "Admin access required" })),
        )
            .into_response(),
        GuardDecision::RedirectHome => {
            if requirement.require_admin {
                tracing::warn!(
                    %path,
                    user_id = ?snapshot.user_id(),
                    "non-admin turned away from admin route"
                );
            }
            Redirect::to("/").into_response()
        }
    }
}
