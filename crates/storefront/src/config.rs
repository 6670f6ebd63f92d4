//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SUPABASE_URL` - Supabase project URL (e.g., <https://abc.supabase.co>)
//! - `SUPABASE_ANON_KEY` - Supabase anon (public) API key
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL (default: `http://localhost:{port}`)
//! - `SUPABASE_SERVICE_ROLE_KEY` - Service role key for the admin user list
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `AUTH_SESSION_TIMEOUT_MS` - Initial session fetch timeout (default: 8000)
//! - `AUTH_PROFILE_ATTEMPT_TIMEOUT_MS` - Per-attempt profile fetch timeout (default: 3000)
//! - `AUTH_PROFILE_RETRIES` - Profile fetch retries after the first attempt (default: 2)
//! - `AUTH_RETRY_BACKOFF_MS` - Delay between profile attempts (default: 1000)
//! - `AUTH_PROFILE_DEADLINE_MS` - Overall profile fetch budget (default: 8000)
//! - `AUTH_EMERGENCY_TIMEOUT_MS` - Force `loading = false` after this long (default: 10000)

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::auth::AuthTimings;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "your_",
    "changeme",
    "replace",
    "placeholder",
    "insert",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront (used for password reset links)
    pub base_url: String,
    /// Supabase project configuration
    pub supabase: SupabaseConfig,
    /// Auth flow timeouts and retry policy
    pub auth: AuthTimings,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "production")
    pub sentry_environment: Option<String>,
}

/// Supabase project configuration.
///
/// Implements `Debug` manually to redact keys.
#[derive(Clone)]
pub struct SupabaseConfig {
    /// Project URL
    pub url: Url,
    /// Anon key, sent as `apikey` on every request
    pub anon_key: SecretString,
    /// Service role key (bypasses RLS); only the admin user list needs it
    pub service_role_key: Option<SecretString>,
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .field(
                "service_role_key",
                &self.service_role_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`StorefrontConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let supabase = SupabaseConfig::from_env(&env)?;
        let host = env
            .get_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string()))?;
        let port = env
            .get_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string()))?;
        let base_url = env
            .optional("STOREFRONT_BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_string();
        let auth = auth_timings_from_env(&env)?;

        Ok(Self {
            host,
            port,
            base_url,
            supabase,
            auth,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the public URL is served over TLS (secure cookies).
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl SupabaseConfig {
    fn from_env(env: &Env<'_>) -> Result<Self, ConfigError> {
        let raw_url = env.required("SUPABASE_URL")?;
        let mut url = Url::parse(&raw_url)
            .map_err(|e| ConfigError::InvalidEnvVar("SUPABASE_URL".to_string(), e.to_string()))?;
        // Relative joins (`auth/v1/`) need a trailing slash on the base
        if !url.path().ends_with('/') {
            url.set_path(&format!("{}/", url.path()));
        }

        Ok(Self {
            url,
            anon_key: env.required_key("SUPABASE_ANON_KEY")?,
            service_role_key: env
                .optional("SUPABASE_SERVICE_ROLE_KEY")
                .map(|value| {
                    validate_not_placeholder(&value, "SUPABASE_SERVICE_ROLE_KEY")
                        .map(|()| SecretString::from(value))
                })
                .transpose()?,
        })
    }
}

fn auth_timings_from_env(env: &Env<'_>) -> Result<AuthTimings, ConfigError> {
    let defaults = AuthTimings::default();
    Ok(AuthTimings {
        session_timeout: env.duration_ms("AUTH_SESSION_TIMEOUT_MS", defaults.session_timeout)?,
        profile_attempt_timeout: env
            .duration_ms("AUTH_PROFILE_ATTEMPT_TIMEOUT_MS", defaults.profile_attempt_timeout)?,
        profile_retries: env.parsed("AUTH_PROFILE_RETRIES", defaults.profile_retries)?,
        retry_backoff: env.duration_ms("AUTH_RETRY_BACKOFF_MS", defaults.retry_backoff)?,
        profile_deadline: env.duration_ms("AUTH_PROFILE_DEADLINE_MS", defaults.profile_deadline)?,
        emergency_timeout: env
            .duration_ms("AUTH_EMERGENCY_TIMEOUT_MS", defaults.emergency_timeout)?,
    })
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Environment lookup with the typed getters used above.
struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Get an optional variable, treating blank values as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get a required API key, rejecting obvious placeholders.
    fn required_key(&self, key: &str) -> Result<SecretString, ConfigError> {
        let value = self.required(key)?;
        validate_not_placeholder(&value, key)?;
        Ok(SecretString::from(value))
    }

    /// Get a variable with a default value.
    fn get_or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |raw| {
            raw.trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }

    /// Get a duration given in milliseconds.
    fn duration_ms(&self, key: &str, default: Duration) -> Result<Duration, ConfigError> {
        let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
        let ms = self.parsed(key, default_ms)?;
        if ms == 0 {
            return Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        Ok(Duration::from_millis(ms))
    }
}

/// Reject values copied verbatim from `.env.example`.
fn validate_not_placeholder(value: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = value.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }
    Ok(())
}
