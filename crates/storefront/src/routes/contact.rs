//! Contact form route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use super::{Nav, set_flash, take_flash};
use crate::error::AppError;
use crate::filters;
use crate::middleware::CurrentVisitor;
use crate::models::ContactForm;
use crate::services::catalog::{self, ContactSubmitError};

/// Contact page template.
#[derive(Template, WebTemplate)]
#[template(path = "contact.html")]
pub struct ContactTemplate {
    pub nav: Nav,
    pub flash: Option<String>,
    pub form: ContactForm,
}

/// Display the contact form.
pub async fn page(CurrentVisitor(visitor): CurrentVisitor, session: Session) -> impl IntoResponse {
    let mut form = ContactForm::default();
    if let Some(profile) = &visitor.auth.profile {
        form.name = profile.full_name.clone().unwrap_or_default();
        form.email = profile.email.clone().unwrap_or_default();
    }

    ContactTemplate {
        nav: Nav::from_snapshot(&visitor.auth),
        flash: take_flash(&session).await,
        form,
    }
}

/// Handle contact form submission.
///
/// Invalid input re-renders the form with what the visitor typed.
#[instrument(skip_all)]
pub async fn submit(
    CurrentVisitor(visitor): CurrentVisitor,
    session: Session,
    Form(form): Form<ContactForm>,
) -> Response {
    match catalog::submit_contact_form(visitor.context.db(), &form).await {
        Ok(_) => {
            set_flash(&session, "Thanks for reaching out! We'll get back to you soon.").await;
            Redirect::to("/contact").into_response()
        }
        Err(ContactSubmitError::Invalid(e)) => ContactTemplate {
            nav: Nav::from_snapshot(&visitor.auth),
            flash: Some(e.to_string()),
            form,
        }
        .into_response(),
        Err(e) => AppError::from(e).into_response(),
    }
}
