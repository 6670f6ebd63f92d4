//! Session middleware configuration.
//!
//! Sessions live in memory next to the auth contexts they point at; a
//! restart signs every visitor out, which the GoTrue refresh token cannot
//! survive anyway since it is held in the same process.

use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::auth::context::VISITOR_IDLE_TIMEOUT;
use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "nb_session";

/// Create the session layer with an in-memory store.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MemoryStore> {
    let idle = i64::try_from(VISITOR_IDLE_TIMEOUT.as_secs()).unwrap_or(i64::MAX);

    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(idle),
        ))
        .with_secure(config.is_https())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
