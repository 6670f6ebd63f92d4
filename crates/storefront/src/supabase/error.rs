use serde_json::Value;
use thiserror::Error;

/// PostgREST code for "JSON object requested, multiple (or no) rows returned".
pub const NO_ROWS_CODE: &str = "PGRST116";

/// Errors that can occur when talking to Supabase.
#[derive(Debug, Error)]
pub enum SupabaseError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// A single-row read matched nothing.
    #[error("No rows returned")]
    NoRows,

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The call needs a signed-in user.
    #[error("No active session")]
    NoSession,

    /// The call needs `SUPABASE_SERVICE_ROLE_KEY`.
    #[error("Service role key is not configured")]
    ServiceRoleMissing,
}

impl SupabaseError {
    /// Build an API error from a status and raw body.
    ///
    /// Understands both GoTrue (`msg`, `error_code`, `error_description`)
    /// and PostgREST (`code`, `message`) error shapes. A PostgREST
    /// `PGRST116` becomes [`SupabaseError::NoRows`].
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        let json: Value = serde_json::from_str(body).unwrap_or(Value::Null);
        let field = |key: &str| json.get(key).and_then(Value::as_str).map(str::to_owned);

        let code = field("error_code").or_else(|| field("code")).or_else(|| field("error"));
        if code.as_deref() == Some(NO_ROWS_CODE) {
            return Self::NoRows;
        }

        let message = field("msg")
            .or_else(|| field("message"))
            .or_else(|| field("error_description"))
            .unwrap_or_else(|| body.chars().take(200).collect());

        Self::Api {
            status,
            code,
            message,
        }
    }

    #[must_use]
    pub const fn is_no_rows(&self) -> bool {
        matches!(self, Self::NoRows)
    }

    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Transport failures, rate limiting and 5xx are worth another attempt;
    /// "no rows", 4xx and local errors are not.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// GoTrue rejected an email/password pair.
    #[must_use]
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(
            self,
            Self::Api { status: 400, code: Some(code), .. }
                if code == "invalid_credentials" || code == "invalid_grant"
        )
    }

    /// Message safe to show the visitor.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { status, message, .. } if *status < 500 => message.clone(),
            Self::NoRows => "Not found".to_owned(),
            Self::NoSession => "Please sign in to continue".to_owned(),
            _ => "The service is temporarily unavailable, please try again".to_owned(),
        }
    }
}
