//! `user_profiles` rows.

use chrono::{DateTime, Utc};
use nullbyte_core::{ProfileId, Role, UserId};
use serde::{Deserialize, Deserializer, Serialize};

/// Application profile for an auth user.
///
/// `role` is the only authorization signal the storefront trusts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: ProfileId,
    pub user_id: UserId,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_role")]
    pub role: Role,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Unknown or null roles grant nothing.
fn lenient_role<'de, D>(deserializer: D) -> Result<Role, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|r| r.parse().ok()).unwrap_or_default())
}

/// Fields a visitor may change on their own profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    /// Drop blank fields so an empty form input does not wipe a value.
    #[must_use]
    pub fn trimmed(self) -> Self {
        let keep = |v: Option<String>| {
            v.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
        };
        Self {
            full_name: keep(self.full_name),
            avatar_url: keep(self.avatar_url),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.avatar_url.is_none()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row(role: serde_json::Value) -> serde_json::Value {
        json!({
            "id": "0b7c1f7e-3f43-4a8e-9a59-1d1c0c6f2a10",
            "user_id": "6f1c1bb2-6c1e-4b8e-9d2e-0f4b1a2c3d4e",
            "full_name": "Ada Lovelace",
            "email": "ada@example.com",
            "role": role,
            "avatar_url": null,
            "created_at": "2024-03-01T10:00:00.123456+00:00",
            "updated_at": null
        })
    }

    #[test]
    fn test_admin_role_deserializes() {
        let profile: UserProfile = serde_json::from_value(row(json!("admin"))).unwrap();
        assert!(profile.is_admin());
        assert_eq!(profile.full_name.as_deref(), Some("Ada Lovelace"));
        assert!(profile.created_at.is_some());
    }

    #[test]
    fn test_unknown_or_null_role_is_user() {
        for role in [json!("superuser"), json!(null), json!("ADMIN ")] {
            let profile: UserProfile = serde_json::from_value(row(role)).unwrap();
            assert_eq!(profile.role, Role::User);
            assert!(!profile.is_admin());
        }
    }

    #[test]
    fn test_missing_role_is_user() {
        let mut value = row(json!("admin"));
        value.as_object_mut().unwrap().remove("role");
        let profile: UserProfile = serde_json::from_value(value).unwrap();
        assert_eq!(profile.role, Role::User);
    }

    #[test]
    fn test_profile_update_skips_unset_fields() {
        let update = ProfileUpdate {
            full_name: Some("  Grace Hopper ".to_owned()),
            avatar_url: Some("   ".to_owned()),
        }
        .trimmed();
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({ "full_name": "Grace Hopper" })
        );
        assert!(ProfileUpdate::default().trimmed().is_empty());
    }
}
