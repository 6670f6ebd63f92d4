//! Application state shared across handlers.

use std::sync::Arc;

use crate::auth::AuthRegistry;
use crate::config::StorefrontConfig;
use crate::supabase::{SupabaseConnector, UserDirectory};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the configuration, the Supabase connector and the per-visitor auth
/// contexts.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    connector: Arc<dyn SupabaseConnector>,
    registry: AuthRegistry,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `connector` - Source of per-visitor Supabase connections
    #[must_use]
    pub fn new(config: StorefrontConfig, connector: Arc<dyn SupabaseConnector>) -> Self {
        let registry = AuthRegistry::new(Arc::clone(&connector), config.auth, &config.base_url);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                connector,
                registry,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the per-visitor auth contexts.
    #[must_use]
    pub fn registry(&self) -> &AuthRegistry {
        &self.inner.registry
    }

    /// The GoTrue admin API, if a service role key is configured.
    #[must_use]
    pub fn user_directory(&self) -> Option<Arc<dyn UserDirectory>> {
        self.inner.connector.user_directory()
    }
}
