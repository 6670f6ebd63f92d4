//! Admin panel views.

use chrono::{DateTime, Utc};
use nullbyte_core::{Price, Role, UserId};
use serde::{Deserialize, Serialize};

use super::UserProfile;
use crate::supabase::User;

/// An auth user joined with their profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminUser {
    pub id: UserId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
    pub email_confirmed_at: Option<DateTime<Utc>>,
}

impl AdminUser {
    /// Join an auth user with their profile, if they have one.
    ///
    /// Without a profile the user has role `user` and no name.
    #[must_use]
    pub fn from_parts(user: &User, profile: Option<&UserProfile>) -> Self {
        let (first_name, last_name) = profile
            .and_then(|p| p.full_name.as_deref())
            .map_or((None, None), split_name);

        Self {
            id: user.id,
            email: user.email.clone().unwrap_or_default(),
            first_name,
            last_name,
            avatar_url: user.metadata_str("avatar_url").map(str::to_owned),
            role: profile.map(|p| p.role).unwrap_or_default(),
            is_active: true,
            created_at: user.created_at,
            last_sign_in_at: user.last_sign_in_at,
            email_confirmed_at: user.email_confirmed_at,
        }
    }

    #[must_use]
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.clone(),
            _ => self.email.clone(),
        }
    }
}

/// First word, then the rest.
pub(crate) fn split_name(full_name: &str) -> (Option<String>, Option<String>) {
    let full_name = full_name.trim();
    let (first, rest) = full_name
        .split_once(char::is_whitespace)
        .unwrap_or((full_name, ""));
    let non_empty = |s: &str| Some(s.trim().to_owned()).filter(|s| !s.is_empty());
    (non_empty(first), non_empty(rest))
}

/// Profile fields an admin may change on any user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// Dashboard counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdminStats {
    pub total_users: u64,
    pub total_products: u64,
    pub total_orders: u64,
    pub total_revenue: Price,
    pub pending_orders: u64,
    pub new_contact_submissions: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn user() -> User {
        serde_json::from_value(json!({
            "id": "6f1c1bb2-6c1e-4b8e-9d2e-0f4b1a2c3d4e",
            "email": "ada@example.com",
            "user_metadata": { "avatar_url": "https://cdn.example.com/ada.png" }
        }))
        .unwrap()
    }

    fn profile(full_name: Option<&str>, role: Role) -> UserProfile {
        UserProfile {
            id: nullbyte_core::ProfileId::random(),
            user_id: user().id,
            full_name: full_name.map(str::to_owned),
            email: None,
            role,
            avatar_url: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_missing_profile_defaults_to_plain_user() {
        let joined = AdminUser::from_parts(&user(), None);
        assert_eq!(joined.role, Role::User);
        assert_eq!(joined.first_name, None);
        assert_eq!(joined.last_name, None);
        assert_eq!(
            joined.avatar_url.as_deref(),
            Some("https://cdn.example.com/ada.png")
        );
        assert_eq!(joined.display_name(), "ada@example.com");
    }

    #[test]
    fn test_profile_name_is_split() {
        let p = profile(Some("Ada King Lovelace"), Role::Admin);
        let joined = AdminUser::from_parts(&user(), Some(&p));
        assert_eq!(joined.first_name.as_deref(), Some("Ada"));
        assert_eq!(joined.last_name.as_deref(), Some("King Lovelace"));
        assert_eq!(joined.role, Role::Admin);
    }

    #[test]
    fn test_single_word_name() {
        assert_eq!(split_name("Ada"), (Some("Ada".to_owned()), None));
        assert_eq!(split_name("  "), (None, None));
    }
}
