//! `contact_submissions` rows and the public contact form.

use chrono::{DateTime, Utc};
use nullbyte_core::{ContactStatus, ContactSubmissionId, Email};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSubmission {
    pub id: ContactSubmissionId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: ContactStatus,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContactError {
    #[error("Please enter a valid email address.")]
    InvalidEmail,

    #[error("Name, subject and message are required.")]
    MissingFields,
}

/// Contact form as posted by a visitor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

impl ContactForm {
    /// Check the form and build the row to insert.
    ///
    /// # Errors
    ///
    /// Returns [`ContactError`] when a field is blank or the email does not
    /// parse.
    pub fn validate(&self) -> Result<serde_json::Value, ContactError> {
        let name = self.name.trim();
        let subject = self.subject.trim();
        let message = self.message.trim();
        if name.is_empty() || subject.is_empty() || message.is_empty() {
            return Err(ContactError::MissingFields);
        }
        let email =
            Email::parse_normalized(&self.email).map_err(|_| ContactError::InvalidEmail)?;

        Ok(serde_json::json!({
            "name": name,
            "email": email.as_str(),
            "subject": subject,
            "message": message,
            "status": ContactStatus::New,
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> ContactForm {
        ContactForm {
            name: " Ada ".to_owned(),
            email: "Ada@Example.com".to_owned(),
            subject: "Licensing".to_owned(),
            message: "Can I resell this template?".to_owned(),
        }
    }

    #[test]
    fn test_valid_form_builds_new_row() {
        let row = form().validate().unwrap();
        assert_eq!(row["name"], "Ada");
        assert_eq!(row["email"], "ada@example.com");
        assert_eq!(row["status"], "new");
    }

    #[test]
    fn test_blank_fields_are_rejected() {
        let mut blank = form();
        blank.subject = "   ".to_owned();
        assert_eq!(blank.validate().unwrap_err(), ContactError::MissingFields);
    }

    #[test]
    fn test_bad_email_is_rejected() {
        let mut bad = form();
        bad.email = "not-an-email".to_owned();
        assert_eq!(bad.validate().unwrap_err(), ContactError::InvalidEmail);
    }
}
