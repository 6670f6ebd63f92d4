//! Authentication error types.

use thiserror::Error;

use crate::retry::RetryError;
use crate::supabase::SupabaseError;

/// Errors returned by auth actions.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] nullbyte_core::EmailError),

    /// Password shorter than the minimum.
    #[error("password must be at least {min} characters")]
    WeakPassword { min: usize },

    /// Wrong email or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The action needs a signed-in visitor.
    #[error("not signed in")]
    NotSignedIn,

    /// The backend did not answer in time.
    #[error("{0} timed out")]
    Timeout(&'static str),

    /// Backend error.
    #[error(transparent)]
    Provider(#[from] SupabaseError),
}

impl From<RetryError<SupabaseError>> for AuthError {
    fn from(err: RetryError<SupabaseError>) -> Self {
        match err {
            RetryError::Timeout { operation } => Self::Timeout(operation),
            RetryError::Failed(e) if e.is_invalid_credentials() => Self::InvalidCredentials,
            RetryError::Failed(e) => Self::Provider(e),
        }
    }
}

impl AuthError {
    /// Message safe to show the visitor.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(_) => "Please enter a valid email address".to_owned(),
            Self::WeakPassword { min } => {
                format!("Password must be at least {min} characters")
            }
            Self::InvalidCredentials => "Invalid email or password".to_owned(),
            Self::NotSignedIn => "Please sign in to continue".to_owned(),
            Self::Timeout(_) => {
                "The service is taking too long to respond, please try again".to_owned()
            }
            Self::Provider(e) => e.user_message(),
        }
    }

    /// Whether the visitor caused this (4xx) rather than the backend (5xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::InvalidEmail(_)
            | Self::WeakPassword { .. }
            | Self::InvalidCredentials
            | Self::NotSignedIn => true,
            Self::Timeout(_) => false,
            Self::Provider(e) => match e {
                SupabaseError::NoRows | SupabaseError::NoSession => true,
                SupabaseError::Api { status, .. } => (400..500).contains(status) && *status != 429,
                _ => false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, code: &str) -> SupabaseError {
        SupabaseError::Api {
            status,
            code: Some(code.to_owned()),
            message: "Invalid login credentials".to_owned(),
        }
    }

    #[test]
    fn test_invalid_grant_maps_to_invalid_credentials() {
        let err = AuthError::from(RetryError::Failed(api(400, "invalid_grant")));
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(err.user_message(), "Invalid email or password");
    }

    #[test]
    fn test_timeout_is_distinct_from_backend_errors() {
        let err = AuthError::from(RetryError::<SupabaseError>::Timeout {
            operation: "sign in",
        });
        assert!(matches!(err, AuthError::Timeout("sign in")));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_server_errors_are_not_client_errors() {
        let err = AuthError::from(api(503, "unavailable"));
        assert!(!err.is_client_error());
        assert!(AuthError::from(api(422, "weak_password")).is_client_error());
    }
}
