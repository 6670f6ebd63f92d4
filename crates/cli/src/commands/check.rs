//! Configuration and connectivity check.
//!
//! Loads the storefront configuration exactly as the server does, then
//! makes one anonymous PostgREST read and, with a service role key, one
//! GoTrue admin call.

use nullbyte_storefront::config::{ConfigError, StorefrontConfig};
use nullbyte_storefront::supabase::{
    Datastore, Query, SupabaseClient, SupabaseConnector, SupabaseError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Supabase unreachable: {0}")]
    Supabase(#[from] SupabaseError),
}

/// Run every check, stopping at the first failure.
///
/// # Errors
///
/// Returns the configuration error or the first failed Supabase call.
pub async fn run() -> Result<(), CheckError> {
    let config = StorefrontConfig::from_env()?;
    tracing::info!(
        project = %config.supabase.url,
        listen = %config.socket_addr(),
        base_url = %config.base_url,
        "Configuration loaded"
    );

    let client = SupabaseClient::new(&config.supabase)?;
    let connection = client.connect()?;
    let products = connection
        .db
        .count(&Query::table("products").eq("active", true))
        .await?;
    tracing::info!(products, "PostgREST reachable with the anon key");

    match client.user_directory() {
        Some(directory) => {
            let users = directory.list_users().await?;
            tracing::info!(users = users.len(), "GoTrue admin API reachable");
        }
        None => tracing::warn!("SUPABASE_SERVICE_ROLE_KEY not set, admin user listing disabled"),
    }

    tracing::info!("All checks passed");
    Ok(())
}
