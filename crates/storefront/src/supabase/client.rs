use std::sync::Arc;
use std::time::Duration;

use super::{
    Connection, GoTrueAdmin, GoTrueClient, PostgrestClient, SupabaseConnector, SupabaseError,
    UserDirectory,
};
use crate::config::SupabaseConfig;

/// Per-request ceiling; the auth flow applies its own shorter budgets on top.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Process-wide Supabase entry point.
///
/// Owns the pooled HTTP client and project settings; hands every visitor a
/// fresh GoTrue/PostgREST pair.
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    config: SupabaseConfig,
    directory: Option<Arc<dyn UserDirectory>>,
}

impl SupabaseClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the project
    /// URL cannot host the API paths.
    pub fn new(config: &SupabaseConfig) -> Result<Self, SupabaseError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("nullbyte-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let directory = match &config.service_role_key {
            Some(key) => Some(Arc::new(GoTrueAdmin::new(http.clone(), &config.url, key.clone())?)
                as Arc<dyn UserDirectory>),
            None => {
                tracing::warn!("SUPABASE_SERVICE_ROLE_KEY not set, admin user listing disabled");
                None
            }
        };

        Ok(Self {
            http,
            config: config.clone(),
            directory,
        })
    }

    /// A PostgREST client using the service role key (bypasses RLS).
    ///
    /// # Errors
    ///
    /// Returns [`SupabaseError::ServiceRoleMissing`] without the key.
    pub fn service_datastore(&self) -> Result<PostgrestClient, SupabaseError> {
        let key = self
            .config
            .service_role_key
            .clone()
            .ok_or(SupabaseError::ServiceRoleMissing)?;
        PostgrestClient::with_key(self.http.clone(), &self.config.url, key)
    }
}

impl SupabaseConnector for SupabaseClient {
    fn connect(&self) -> Result<Connection, SupabaseError> {
        let auth = Arc::new(GoTrueClient::new(
            self.http.clone(),
            &self.config.url,
            self.config.anon_key.clone(),
        )?);
        let db = PostgrestClient::for_visitor(
            self.http.clone(),
            &self.config.url,
            self.config.anon_key.clone(),
            auth.clone(),
        )?;
        Ok(Connection {
            auth,
            db: Arc::new(db),
        })
    }

    fn user_directory(&self) -> Option<Arc<dyn UserDirectory>> {
        self.directory.clone()
    }
}
