//! Supabase clients: GoTrue for auth, PostgREST for rows.
//!
//! # Architecture
//!
//! - Each browser session gets its own [`Connection`]: a GoTrue client that
//!   holds that visitor's session, and a PostgREST client that sends the
//!   visitor's access token so row-level security applies server-side.
//! - The HTTP client is shared process-wide; only session state is per visitor.
//! - [`AuthProvider`], [`Datastore`] and [`UserDirectory`] are the seams tests
//!   replace with in-memory fakes.
//!
//! # Example
//!
//! ```rust,ignore
//! use nullbyte_storefront::supabase::{Query, SupabaseClient, SupabaseConnector};
//!
//! let client = SupabaseClient::new(&config.supabase)?;
//! let conn = client.connect()?;
//!
//! conn.auth.sign_in_with_password("ada@example.com", "hunter22").await?;
//! let products: Vec<Product> = conn
//!     .db
//!     .fetch(&Query::table("products").eq("active", true))
//!     .await?;
//! ```

mod admin;
mod auth;
mod client;
mod error;
pub(crate) mod http;
pub mod query;
mod rest;
pub mod types;

pub use admin::GoTrueAdmin;
pub use auth::GoTrueClient;
pub use client::SupabaseClient;
pub use error::{NO_ROWS_CODE, SupabaseError};
pub use query::{Filter, Order, Query};
pub use rest::PostgrestClient;
pub use types::*;

use std::sync::Arc;

use async_trait::async_trait;
use nullbyte_core::UserId;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;

/// Email/password auth for one visitor.
///
/// Implementations own the visitor's current session and push every
/// transition to [`AuthProvider::subscribe`] receivers.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Current session, refreshed first if the access token has expired.
    async fn get_session(&self) -> Result<Option<Session>, SupabaseError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        data: &SignUpData,
    ) -> Result<SignUpOutcome, SupabaseError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, SupabaseError>;

    /// Revoke the session. Local state is cleared even if the server call fails.
    async fn sign_out(&self) -> Result<(), SupabaseError>;

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), SupabaseError>;

    /// Exchange the `token_hash` from a recovery email for a session.
    async fn verify_recovery(&self, token_hash: &str) -> Result<Session, SupabaseError>;

    /// Update the signed-in user (password, email or metadata).
    async fn update_user(&self, attributes: &UserAttributes) -> Result<User, SupabaseError>;

    /// Receive auth state transitions from now on.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// Row storage addressed by table name.
#[async_trait]
pub trait Datastore: Send + Sync {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, SupabaseError>;

    /// Exactly one row, or [`SupabaseError::NoRows`].
    async fn single(&self, query: &Query) -> Result<Value, SupabaseError>;

    /// Insert one row and return it as stored.
    async fn insert(&self, table: &str, row: &Value) -> Result<Value, SupabaseError>;

    /// Insert or merge on the `on_conflict` column and return the row.
    async fn upsert(&self, table: &str, row: &Value, on_conflict: &str)
    -> Result<Value, SupabaseError>;

    /// Patch every row the query selects and return the updated rows.
    async fn update(&self, query: &Query, patch: &Value) -> Result<Vec<Value>, SupabaseError>;

    async fn delete(&self, query: &Query) -> Result<(), SupabaseError>;

    /// Exact row count for the query's filters.
    async fn count(&self, query: &Query) -> Result<u64, SupabaseError>;

    /// Call a Postgres function through `/rest/v1/rpc/{function}`.
    async fn rpc(&self, function: &str, args: &Value) -> Result<Value, SupabaseError>;
}

/// GoTrue admin API (needs the service role key).
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>, SupabaseError>;

    async fn delete_user(&self, id: UserId) -> Result<(), SupabaseError>;
}

/// Typed helpers over the JSON [`Datastore`] surface.
impl<'d> dyn Datastore + 'd {
    /// Read rows and decode them.
    ///
    /// # Errors
    ///
    /// Returns the datastore error, or [`SupabaseError::Parse`] if a row
    /// does not match `T`.
    pub async fn fetch<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>, SupabaseError> {
        let rows = self.select(query).await?;
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(SupabaseError::from))
            .collect()
    }

    /// Read a single row; "no rows" is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns any other datastore error, or a decode error.
    pub async fn fetch_optional<T: DeserializeOwned>(
        &self,
        query: &Query,
    ) -> Result<Option<T>, SupabaseError> {
        match self.single(query).await {
            Ok(row) => Ok(Some(serde_json::from_value(row)?)),
            Err(SupabaseError::NoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Insert a row and decode what was stored.
    ///
    /// # Errors
    ///
    /// Returns the datastore error or a decode error.
    pub async fn insert_as<T, R>(&self, table: &str, row: &R) -> Result<T, SupabaseError>
    where
        T: DeserializeOwned,
        R: Serialize + Sync + ?Sized,
    {
        let row = serde_json::to_value(row)?;
        let stored = self.insert(table, &row).await?;
        Ok(serde_json::from_value(stored)?)
    }

    /// Patch the rows a query selects and decode the first one.
    ///
    /// # Errors
    ///
    /// Returns [`SupabaseError::NoRows`] if nothing matched.
    pub async fn update_one<T, P>(&self, query: &Query, patch: &P) -> Result<T, SupabaseError>
    where
        T: DeserializeOwned,
        P: Serialize + Sync + ?Sized,
    {
        let patch = serde_json::to_value(patch)?;
        let row = self
            .update(query, &patch)
            .await?
            .into_iter()
            .next()
            .ok_or(SupabaseError::NoRows)?;
        Ok(serde_json::from_value(row)?)
    }
}

/// One visitor's view of Supabase.
#[derive(Clone)]
pub struct Connection {
    pub auth: Arc<dyn AuthProvider>,
    pub db: Arc<dyn Datastore>,
}

/// Hands out per-visitor connections and the shared admin API.
pub trait SupabaseConnector: Send + Sync {
    /// A fresh, signed-out connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the client endpoints cannot be built.
    fn connect(&self) -> Result<Connection, SupabaseError>;

    /// The GoTrue admin API, when a service role key is configured.
    fn user_directory(&self) -> Option<Arc<dyn UserDirectory>>;
}
