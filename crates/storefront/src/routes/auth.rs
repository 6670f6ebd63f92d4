//! Authentication route handlers.
//!
//! Sign-in, sign-up, password reset and sign-out against the visitor's own
//! [`AuthContext`](crate::auth::AuthContext). Failures come back to the
//! form as a flash message; nothing here reveals whether an email is
//! registered.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{Nav, set_flash, take_flash};
use crate::auth::AuthError;
use crate::error::clear_sentry_user;
use crate::filters;
use crate::guard::safe_return_path;
use crate::middleware::CurrentVisitor;
use crate::state::AppState;
use crate::supabase::SignUpData;

// =============================================================================
// Form Types
// =============================================================================

/// Sign-in form data.
#[derive(Debug, Deserialize)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Sign-up form data.
#[derive(Debug, Deserialize)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

/// New password form data.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    pub password: String,
    pub password_confirm: String,
}

// =============================================================================
// Query Types
// =============================================================================

/// Which auth form to show, and where to go afterwards.
#[derive(Debug, Default, Deserialize)]
pub struct AuthQuery {
    pub mode: Option<String>,
    pub next: Option<String>,
}

/// Recovery link parameters.
#[derive(Debug, Default, Deserialize)]
pub struct RecoveryQuery {
    pub token_hash: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Sign in / sign up / forgot password page.
#[derive(Template, WebTemplate)]
#[template(path = "auth/index.html")]
pub struct AuthTemplate {
    pub nav: Nav,
    pub flash: Option<String>,
    pub mode: &'static str,
    pub next: String,
}

/// New password page.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_password.html")]
pub struct ResetPasswordTemplate {
    pub nav: Nav,
    pub flash: Option<String>,
    pub can_reset: bool,
}

fn mode(requested: Option<&str>) -> &'static str {
    match requested {
        Some("sign-up") => "sign-up",
        Some("forgot") => "forgot",
        _ => "sign-in",
    }
}

fn auth_url(mode: &str, next: &str) -> String {
    if next == "/" {
        format!("/auth?mode={mode}")
    } else {
        format!("/auth?mode={mode}&next={}", urlencoding::encode(next))
    }
}

// =============================================================================
// Sign In / Sign Up
// =============================================================================

/// Display the auth page.
pub async fn page(
    CurrentVisitor(visitor): CurrentVisitor,
    session: Session,
    Query(query): Query<AuthQuery>,
) -> impl IntoResponse {
    AuthTemplate {
        nav: Nav::from_snapshot(&visitor.auth),
        flash: take_flash(&session).await,
        mode: mode(query.mode.as_deref()),
        next: safe_return_path(query.next.as_deref()).to_owned(),
    }
}

/// Handle sign-in form submission.
#[instrument(skip_all)]
pub async fn sign_in(
    CurrentVisitor(visitor): CurrentVisitor,
    session: Session,
    Form(form): Form<SignInForm>,
) -> Response {
    let next = safe_return_path(form.next.as_deref()).to_owned();

    match visitor.context.sign_in(&form.email, &form.password).await {
        Ok(snapshot) => {
            renew_session_id(&session).await;
            let greeting = snapshot
                .display_name()
                .map_or_else(|| "Welcome back!".to_owned(), |name| format!("Welcome back, {name}!"));
            set_flash(&session, greeting).await;
            Redirect::to(&next).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "sign in failed");
            set_flash(&session, e.user_message()).await;
            Redirect::to(&auth_url("sign-in", &next)).into_response()
        }
    }
}

/// Handle sign-up form submission.
///
/// Only the display name is passed on as user metadata; the role always
/// starts as `user`.
#[instrument(skip_all)]
pub async fn sign_up(
    CurrentVisitor(visitor): CurrentVisitor,
    session: Session,
    Form(form): Form<SignUpForm>,
) -> Response {
    if form.password != form.password_confirm {
        set_flash(&session, "Passwords do not match").await;
        return Redirect::to("/auth?mode=sign-up").into_response();
    }

    let data = SignUpData {
        full_name: form
            .full_name
            .map(|n| n.trim().to_owned())
            .filter(|n| !n.is_empty()),
    };
    match visitor.context.sign_up(&form.email, &form.password, &data).await {
        Ok(outcome) if outcome.needs_confirmation() => {
            set_flash(&session, "Check your email to confirm your account, then sign in.").await;
            Redirect::to("/auth").into_response()
        }
        Ok(_) => {
            renew_session_id(&session).await;
            set_flash(&session, "Welcome to Studio Nullbyte!").await;
            Redirect::to("/").into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "sign up failed");
            set_flash(&session, e.user_message()).await;
            Redirect::to("/auth?mode=sign-up").into_response()
        }
    }
}

/// Handle sign-out.
///
/// The visitor's context and the whole session are dropped; the next
/// request starts a fresh anonymous visitor.
pub async fn sign_out(
    State(state): State<AppState>,
    CurrentVisitor(visitor): CurrentVisitor,
    session: Session,
) -> Response {
    // Local state is cleared even when the revoke call fails.
    if let Err(e) = visitor.context.sign_out().await {
        tracing::warn!(error = %e, "sign out did not reach the server");
    }
    state.registry().forget(visitor.id).await;
    clear_sentry_user();

    if let Err(e) = session.flush().await {
        tracing::error!(error = %e, "failed to flush session");
    }
    Redirect::to("/").into_response()
}

/// Issue a new session id once the visitor's privileges change, so a
/// cookie handed out before sign-in never carries the signed-in session.
async fn renew_session_id(session: &Session) {
    if let Err(e) = session.cycle_id().await {
        tracing::error!(error = %e, "failed to rotate session id");
    }
}

// =============================================================================
// Password Reset
// =============================================================================

/// Handle forgot password form submission.
#[instrument(skip_all)]
pub async fn forgot_password(
    CurrentVisitor(visitor): CurrentVisitor,
    session: Session,
    Form(form): Form<ForgotPasswordForm>,
) -> Response {
    match visitor.context.reset_password(&form.email).await {
        Ok(()) => {}
        Err(e @ (AuthError::InvalidEmail(_) | AuthError::Timeout(_))) => {
            set_flash(&session, e.user_message()).await;
            return Redirect::to("/auth?mode=forgot").into_response();
        }
        // Unknown addresses look the same as known ones.
        Err(e) => tracing::warn!(error = %e, "password reset request failed"),
    }
    set_flash(
        &session,
        "If an account exists for that email, a reset link is on its way.",
    )
    .await;
    Redirect::to("/auth").into_response()
}

/// Recovery link landing page.
///
/// A `token_hash` is exchanged for a session and then dropped from the URL.
pub async fn reset_password_page(
    CurrentVisitor(visitor): CurrentVisitor,
    session: Session,
    Query(query): Query<RecoveryQuery>,
) -> Response {
    if let Some(token_hash) = query.token_hash.filter(|t| !t.is_empty()) {
        return match visitor.context.verify_recovery(&token_hash).await {
            Ok(_) => {
                renew_session_id(&session).await;
                Redirect::to("/reset-password").into_response()
            }
            Err(e) => {
                tracing::warn!(error = %e, "recovery link rejected");
                set_flash(&session, e.user_message()).await;
                Redirect::to("/auth?mode=forgot").into_response()
            }
        };
    }

    let snapshot = visitor.context.snapshot();
    ResetPasswordTemplate {
        nav: Nav::from_snapshot(&snapshot),
        flash: take_flash(&session).await,
        can_reset: snapshot.is_signed_in(),
    }
    .into_response()
}

/// Handle new password form submission.
#[instrument(skip_all)]
pub async fn reset_password(
    CurrentVisitor(visitor): CurrentVisitor,
    session: Session,
    Form(form): Form<ResetPasswordForm>,
) -> Response {
    if form.password != form.password_confirm {
        set_flash(&session, "Passwords do not match").await;
        return Redirect::to("/reset-password").into_response();
    }
    match visitor.context.update_password(&form.password).await {
        Ok(()) => {
            set_flash(&session, "Your password has been updated.").await;
            Redirect::to("/").into_response()
        }
        Err(e) => {
            set_flash(&session, e.user_message()).await;
            Redirect::to("/reset-password").into_response()
        }
    }
}
