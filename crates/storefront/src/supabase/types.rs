//! Wire types for the GoTrue auth API.

use chrono::{DateTime, Utc};
use nullbyte_core::UserId;
use serde::{Deserialize, Serialize};

/// An identity issued by GoTrue (`auth.users`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_sign_in_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,
}

impl User {
    /// Look up a string field in `user_metadata` (e.g. `full_name`).
    #[must_use]
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.user_metadata.get(key).and_then(serde_json::Value::as_str)
    }
}

/// A token bundle returned by the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime in seconds at issue time.
    #[serde(default)]
    pub expires_in: i64,
    /// Unix timestamp (seconds) after which the access token is rejected.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_owned()
}

/// Refresh this long before the access token actually expires.
const EXPIRY_MARGIN_SECS: i64 = 10;

impl Session {
    /// Whether the access token is at (or within a few seconds of) expiry.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|at| now.timestamp() + EXPIRY_MARGIN_SECS >= at)
    }

    /// Fill in `expires_at` from `expires_in` when the server omitted it.
    #[must_use]
    pub fn with_expiry_from(mut self, issued_at: DateTime<Utc>) -> Self {
        if self.expires_at.is_none() && self.expires_in > 0 {
            self.expires_at = Some(issued_at.timestamp() + self.expires_in);
        }
        self
    }

    /// Two sessions are the same login if they carry the same access token.
    #[must_use]
    pub fn same_token(&self, other: &Self) -> bool {
        self.access_token == other.access_token
    }
}

/// Kind of auth state transition pushed to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChangeEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

/// One auth state transition with the session that resulted from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    pub kind: AuthChangeEvent,
    pub session: Option<Session>,
}

impl AuthEvent {
    #[must_use]
    pub const fn new(kind: AuthChangeEvent, session: Option<Session>) -> Self {
        Self { kind, session }
    }
}

/// Metadata stored on the GoTrue user at sign-up.
///
/// Only the display name is accepted from the form; role is never taken
/// from user input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignUpData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// Result of a sign-up call.
///
/// With email confirmation enabled GoTrue returns the user without a
/// session; the visitor signs in after confirming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpOutcome {
    pub user: Option<User>,
    pub session: Option<Session>,
}

impl SignUpOutcome {
    #[must_use]
    pub const fn needs_confirmation(&self) -> bool {
        self.session.is_none()
    }
}

/// Body of `PUT /auth/v1/user`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}
