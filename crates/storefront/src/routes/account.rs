//! Account route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{Nav, set_flash, take_flash};
use crate::filters;
use crate::middleware::auth::RequireAuth;
use crate::models::ProfileUpdate;

/// Change password form data.
#[derive(Debug, Deserialize)]
pub struct PasswordForm {
    pub password: String,
    pub password_confirm: String,
}

/// Settings page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/settings.html")]
pub struct SettingsTemplate {
    pub nav: Nav,
    pub flash: Option<String>,
    pub email: String,
    pub full_name: String,
    pub avatar_url: String,
    pub is_admin: bool,
}

/// Display the settings page.
pub async fn settings(RequireAuth(visitor): RequireAuth, session: Session) -> impl IntoResponse {
    let auth = &visitor.auth;
    let profile = auth.profile.as_ref();
    let email = profile
        .and_then(|p| p.email.clone())
        .or_else(|| auth.user.as_ref().and_then(|u| u.email.clone()))
        .unwrap_or_default();

    SettingsTemplate {
        nav: Nav::from_snapshot(auth),
        flash: take_flash(&session).await,
        email,
        full_name: profile.and_then(|p| p.full_name.clone()).unwrap_or_default(),
        avatar_url: profile.and_then(|p| p.avatar_url.clone()).unwrap_or_default(),
        is_admin: auth.is_admin(),
    }
}

/// Handle profile form submission.
#[instrument(skip_all)]
pub async fn update_profile(
    RequireAuth(visitor): RequireAuth,
    session: Session,
    Form(update): Form<ProfileUpdate>,
) -> Response {
    let update = update.trimmed();
    if update.is_empty() {
        set_flash(&session, "Nothing to update.").await;
        return Redirect::to("/settings").into_response();
    }

    let message = match visitor.context.update_profile(update).await {
        Ok(_) => "Your profile has been updated.".to_owned(),
        Err(e) => {
            tracing::warn!(error = %e, "profile update failed");
            e.user_message()
        }
    };
    set_flash(&session, message).await;
    Redirect::to("/settings").into_response()
}

/// Handle password form submission.
#[instrument(skip_all)]
pub async fn update_password(
    RequireAuth(visitor): RequireAuth,
    session: Session,
    Form(form): Form<PasswordForm>,
) -> Response {
    let message = if form.password == form.password_confirm {
        match visitor.context.update_password(&form.password).await {
            Ok(()) => "Your password has been updated.".to_owned(),
            Err(e) => {
                tracing::warn!(error = %e, "password update failed");
                e.user_message()
            }
        }
    } else {
        "Passwords do not match".to_owned()
    };
    set_flash(&session, message).await;
    Redirect::to("/settings").into_response()
}
