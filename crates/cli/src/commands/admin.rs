//! Admin role management commands.
//!
//! # Usage
//!
//! ```bash
//! nb-cli admin promote ada@example.com
//! nb-cli admin demote ada@example.com
//! ```
//!
//! # Environment Variables
//!
//! - `SUPABASE_URL`, `SUPABASE_ANON_KEY` - as for the storefront
//! - `SUPABASE_SERVICE_ROLE_KEY` - required; the role column is not
//!   writable under row-level security

use nullbyte_core::{Email, Role};
use nullbyte_storefront::auth::profile::PROFILES_TABLE;
use nullbyte_storefront::config::{ConfigError, StorefrontConfig};
use nullbyte_storefront::models::UserProfile;
use nullbyte_storefront::supabase::{
    Datastore, Query, SupabaseClient, SupabaseConnector, SupabaseError, User, UserDirectory,
};
use serde_json::json;
use thiserror::Error;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Supabase call failed.
    #[error(transparent)]
    Supabase(#[from] SupabaseError),

    /// The service role key is not configured.
    #[error("SUPABASE_SERVICE_ROLE_KEY is required for admin commands")]
    ServiceRoleMissing,

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// No auth user has this email.
    #[error("No account found for {0}; the user must sign up first")]
    UnknownAccount(String),
}

/// Grant the admin role.
///
/// # Errors
///
/// Returns an error if configuration is missing, the account does not
/// exist, or Supabase rejects the write.
pub async fn promote(email: &str) -> Result<UserProfile, AdminError> {
    let (client, directory) = connect()?;
    let db = client.service_datastore()?;
    set_role(directory.as_ref(), &db, email, Role::Admin).await
}

/// Revoke the admin role.
///
/// # Errors
///
/// Returns an error if configuration is missing, the account does not
/// exist, or Supabase rejects the write.
pub async fn demote(email: &str) -> Result<UserProfile, AdminError> {
    let (client, directory) = connect()?;
    let db = client.service_datastore()?;
    set_role(directory.as_ref(), &db, email, Role::User).await
}

fn connect() -> Result<(SupabaseClient, std::sync::Arc<dyn UserDirectory>), AdminError> {
    let config = StorefrontConfig::from_env()?;
    let client = SupabaseClient::new(&config.supabase)?;
    let directory = client
        .user_directory()
        .ok_or(AdminError::ServiceRoleMissing)?;
    Ok((client, directory))
}

/// Display name for a brand-new profile row.
fn default_full_name(user: &User, email: &Email) -> String {
    user.metadata_str("full_name")
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map_or_else(|| email.local_part().to_owned(), str::to_owned)
}

/// Upsert the account's profile with `role`.
///
/// An existing profile keeps its name; a missing one is created with the
/// name from sign-up metadata, or the email's local part.
///
/// # Errors
///
/// Returns [`AdminError::UnknownAccount`] when no auth user has the email.
pub async fn set_role(
    directory: &dyn UserDirectory,
    db: &dyn Datastore,
    email: &str,
    role: Role,
) -> Result<UserProfile, AdminError> {
    let email =
        Email::parse_normalized(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;

    let users = directory.list_users().await?;
    let user = users
        .iter()
        .find(|u| {
            u.email
                .as_deref()
                .is_some_and(|e| e.eq_ignore_ascii_case(email.as_str()))
        })
        .ok_or_else(|| AdminError::UnknownAccount(email.to_string()))?;

    let existing: Option<UserProfile> = db
        .fetch_optional(&Query::table(PROFILES_TABLE).eq("user_id", user.id))
        .await?;

    let mut row = json!({
        "user_id": user.id,
        "email": email.as_str(),
        "role": role,
    });
    if existing.is_none() {
        row["full_name"] = json!(default_full_name(user, &email));
    }

    let stored = db.upsert(PROFILES_TABLE, &row, "user_id").await?;
    let profile: UserProfile = serde_json::from_value(stored).map_err(SupabaseError::from)?;

    tracing::info!(
        user_id = %profile.user_id,
        email = %email,
        role = %profile.role,
        "Profile role updated"
    );
    Ok(profile)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use nullbyte_storefront::testing::{FakeAccounts, FakeDatastore, FakeDirectory, profile_row};

    use super::*;

    fn setup() -> (FakeAccounts, FakeDirectory, FakeDatastore) {
        let accounts = FakeAccounts::default();
        let directory = FakeDirectory::new(accounts.clone());
        (accounts, directory, FakeDatastore::new())
    }

    #[tokio::test]
    async fn test_promote_creates_missing_profile() {
        let (accounts, directory, db) = setup();
        let ada = accounts.add("ada@example.com", "hunter22", Some("Ada Lovelace"));

        let profile = set_role(&directory, &db, "ADA@example.com", Role::Admin)
            .await
            .unwrap();

        assert_eq!(profile.user_id, ada.id);
        assert_eq!(profile.role, Role::Admin);
        assert_eq!(profile.full_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(db.rows(PROFILES_TABLE).len(), 1);
    }

    #[tokio::test]
    async fn test_promote_without_metadata_uses_local_part() {
        let (accounts, directory, db) = setup();
        accounts.add("grace@example.com", "hunter22", None);

        let profile = set_role(&directory, &db, "grace@example.com", Role::Admin)
            .await
            .unwrap();

        assert_eq!(profile.full_name.as_deref(), Some("grace"));
    }

    #[tokio::test]
    async fn test_demote_keeps_existing_name() {
        let (accounts, directory, db) = setup();
        let ada = accounts.add("ada@example.com", "hunter22", None);
        db.seed(PROFILES_TABLE, [profile_row(ada.id, "Countess Ada", Role::Admin)]);

        let profile = set_role(&directory, &db, "ada@example.com", Role::User)
            .await
            .unwrap();

        assert_eq!(profile.role, Role::User);
        assert_eq!(profile.full_name.as_deref(), Some("Countess Ada"));
        assert_eq!(db.rows(PROFILES_TABLE).len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_account_is_rejected() {
        let (_, directory, db) = setup();

        let err = set_role(&directory, &db, "nobody@example.com", Role::Admin)
            .await
            .unwrap_err();

        assert!(matches!(err, AdminError::UnknownAccount(_)));
        assert!(db.rows(PROFILES_TABLE).is_empty());
    }

    #[tokio::test]
    async fn test_invalid_email_is_rejected() {
        let (_, directory, db) = setup();
        let err = set_role(&directory, &db, "not-an-email", Role::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::InvalidEmail(_)));
    }
}
