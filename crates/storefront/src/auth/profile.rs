//! `user_profiles` reads and writes for the signed-in visitor.

use chrono::Utc;
use nullbyte_core::UserId;
use tracing::instrument;

use crate::models::{ProfileUpdate, UserProfile};
use crate::retry::{RetryError, RetryPolicy, call_with_retry};
use crate::supabase::{Datastore, Query, SupabaseError};

pub const PROFILES_TABLE: &str = "user_profiles";

fn profile_query(user_id: UserId) -> Query {
    Query::table(PROFILES_TABLE).eq("user_id", user_id)
}

/// Fetch a profile under `policy`. A missing row is `Ok(None)`.
///
/// # Errors
///
/// Returns the last backend error, or [`RetryError::Timeout`].
pub async fn try_fetch_profile(
    db: &dyn Datastore,
    user_id: UserId,
    policy: &RetryPolicy,
) -> Result<Option<UserProfile>, RetryError<SupabaseError>> {
    let query = profile_query(user_id);
    call_with_retry(policy, "profile fetch", || db.fetch_optional(&query)).await
}

/// Fetch a profile, treating every failure as "no profile".
///
/// Signing in never depends on the profile; the visitor is simply not an
/// admin until one loads.
#[instrument(skip(db, policy))]
pub async fn fetch_profile(
    db: &dyn Datastore,
    user_id: UserId,
    policy: &RetryPolicy,
) -> Option<UserProfile> {
    match try_fetch_profile(db, user_id, policy).await {
        Ok(Some(profile)) => {
            tracing::debug!(role = %profile.role, "profile loaded");
            Some(profile)
        }
        Ok(None) => {
            tracing::debug!("no profile row");
            None
        }
        Err(RetryError::Timeout { .. }) => {
            tracing::warn!("profile fetch timed out, continuing without profile");
            None
        }
        Err(RetryError::Failed(e)) => {
            tracing::warn!(error = %e, "profile fetch failed, continuing without profile");
            None
        }
    }
}

/// Patch the visitor's own profile and stamp `updated_at`.
///
/// # Errors
///
/// Returns [`SupabaseError::NoRows`] if the visitor has no profile row.
#[instrument(skip(db, update))]
pub async fn update_profile(
    db: &dyn Datastore,
    user_id: UserId,
    update: &ProfileUpdate,
) -> Result<UserProfile, SupabaseError> {
    let mut patch = serde_json::to_value(update)?;
    patch["updated_at"] = serde_json::to_value(Utc::now())?;
    db.update_one(&profile_query(user_id), &patch).await
}
