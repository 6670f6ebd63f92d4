//! Integration tests for the Studio Nullbyte storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p nullbyte-integration-tests
//! ```
//!
//! Every test drives the full router (sessions, auth context, route guard,
//! handlers) in-process with `tower::ServiceExt::oneshot`. Supabase is
//! replaced by the in-memory fakes from `nullbyte_storefront::testing`, so
//! no network or database is needed.
//!
//! # Test Categories
//!
//! - `guards` - route table and guard responses through the router
//! - `auth_flow` - sign in, sign up, sign out and password reset
//! - `admin_api` - the `/api/admin` JSON envelope
//! - `shop` - catalog, cart and checkout

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use nullbyte_core::Role;
use nullbyte_storefront::auth::profile::PROFILES_TABLE;
use nullbyte_storefront::config::{ConfigError, StorefrontConfig};
use nullbyte_storefront::state::AppState;
use nullbyte_storefront::supabase::{SupabaseConnector, User};
use nullbyte_storefront::testing::{FakeConnector, profile_row};
use serde_json::Value;
use tower::ServiceExt;

/// Password used for every seeded account.
pub const PASSWORD: &str = "correct-horse";

/// Configuration pointing at a project that is never contacted.
///
/// # Errors
///
/// Never with the built-in values.
pub fn test_config() -> Result<StorefrontConfig, ConfigError> {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("SUPABASE_URL", "https://project.supabase.co"),
        ("SUPABASE_ANON_KEY", "eyJhbGciOiJIUzI1NiJ9.anon.sig"),
        ("STOREFRONT_BASE_URL", "http://localhost:3000"),
    ]);
    StorefrontConfig::from_lookup(|key| vars.get(key).map(|v| (*v).to_owned()))
}

/// A collected response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// The `Location` header of a redirect.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    /// The body parsed as JSON, or `Null`.
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

/// One browser talking to a fresh storefront.
///
/// Carries the session cookie between requests the way a browser would.
pub struct TestApp {
    pub router: Router,
    pub connector: Arc<FakeConnector>,
    cookie: Mutex<Option<String>>,
}

impl TestApp {
    /// # Panics
    ///
    /// Panics if the built-in test configuration does not load.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(connector: FakeConnector) -> Self {
        let connector = Arc::new(connector);
        let config = test_config().expect("test configuration loads");
        let state = AppState::new(
            config,
            Arc::clone(&connector) as Arc<dyn SupabaseConnector>,
        );
        Self {
            router: nullbyte_storefront::app(state),
            connector,
            cookie: Mutex::new(None),
        }
    }

    /// Register a user with a profile of `role`.
    pub fn seed_account(&self, email: &str, name: &str, role: Role) -> User {
        let user = self.connector.accounts.add(email, PASSWORD, Some(name));
        self.connector
            .db
            .seed(PROFILES_TABLE, [profile_row(user.id, name, role)]);
        user
    }

    /// A browser whose next new visitor starts signed in as `user`.
    #[must_use]
    pub fn signed_in_as(connector: FakeConnector, email: &str, role: Role) -> (Self, User) {
        let app = Self::new(connector);
        let user = app.seed_account(email, "Test User", role);
        app.connector.resume_session_as(&user);
        (app, user)
    }

    /// The `name=value` session cookie this browser holds.
    #[must_use]
    pub fn session_cookie(&self) -> Option<String> {
        self.cookie
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the held cookie, as if copied from another browser.
    pub fn use_cookie(&self, cookie: Option<String>) {
        *self.cookie.lock().unwrap_or_else(PoisonError::into_inner) = cookie;
    }

    fn remember_cookie(&self, headers: &HeaderMap) {
        let Some(set_cookie) = headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
        else {
            return;
        };
        let pair = set_cookie.split(';').next().unwrap_or_default().trim();
        // A removal cookie has an empty value.
        let cookie = pair
            .split_once('=')
            .filter(|(_, value)| !value.is_empty())
            .map(|_| pair.to_owned());
        self.use_cookie(cookie);
    }

    /// Send a request with the stored cookie.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    #[allow(clippy::expect_used)]
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        content_type: Option<&str>,
        body: Body,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = self.session_cookie() {
            builder = builder.header(header::COOKIE, cookie);
        }
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let request = builder.body(body).expect("valid request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        self.remember_cookie(&headers);

        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None, Body::empty()).await
    }

    /// POST an urlencoded form.
    pub async fn post_form(&self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        self.send(
            Method::POST,
            uri,
            Some("application/x-www-form-urlencoded"),
            Body::from(body),
        )
        .await
    }

    /// Send a JSON body.
    pub async fn send_json(&self, method: Method, uri: &str, json: &Value) -> TestResponse {
        self.send(
            method,
            uri,
            Some("application/json"),
            Body::from(json.to_string()),
        )
        .await
    }

    /// Sign in through the form and follow nothing.
    pub async fn sign_in(&self, email: &str) -> TestResponse {
        self.post_form("/auth/sign-in", &[("email", email), ("password", PASSWORD)])
            .await
    }
}

/// Percent-encode a form component.
fn encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(char::from(byte));
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
