//! GoTrue admin API, authenticated with the service role key.

use async_trait::async_trait;
use nullbyte_core::UserId;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use super::http::{send, send_json, with_params};
use super::{SupabaseError, User, UserDirectory};

const PAGE_SIZE: usize = 200;

#[derive(Deserialize)]
struct UserPage {
    #[serde(default)]
    users: Vec<User>,
}

/// Lists and deletes auth users.
pub struct GoTrueAdmin {
    http: reqwest::Client,
    admin_url: Url,
    service_key: SecretString,
}

impl GoTrueAdmin {
    /// # Errors
    ///
    /// Returns an error if the admin endpoint URL cannot be built.
    pub fn new(
        http: reqwest::Client,
        project_url: &Url,
        service_key: SecretString,
    ) -> Result<Self, SupabaseError> {
        Ok(Self {
            http,
            admin_url: project_url.join("auth/v1/admin/")?,
            service_key,
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let key = self.service_key.expose_secret();
        request
            .header("apikey", key)
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {key}"))
    }
}

#[async_trait]
impl UserDirectory for GoTrueAdmin {
    #[instrument(skip(self))]
    async fn list_users(&self) -> Result<Vec<User>, SupabaseError> {
        let mut users = Vec::new();
        for page in 1.. {
            let url = with_params(
                self.admin_url.join("users")?,
                [("page", page.to_string()), ("per_page", PAGE_SIZE.to_string())],
            );
            let json = send_json(self.authorized(self.http.get(url)), "gotrue.admin.list_users").await?;
            let batch = serde_json::from_value::<UserPage>(json)?.users;
            let done = batch.len() < PAGE_SIZE;
            users.extend(batch);
            if done {
                break;
            }
        }
        tracing::debug!(count = users.len(), "listed auth users");
        Ok(users)
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, id: UserId) -> Result<(), SupabaseError> {
        let url = self.admin_url.join(&format!("users/{id}"))?;
        send(self.authorized(self.http.delete(url)), "gotrue.admin.delete_user").await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_page_deserializes() {
        let json = serde_json::json!({
            "aud": "authenticated",
            "users": [
                { "id": "6f1c1bb2-6c1e-4b8e-9d2e-0f4b1a2c3d4e", "email": "a@b.co" }
            ]
        });
        let page: UserPage = serde_json::from_value(json).unwrap();
        assert_eq!(page.users.len(), 1);
        assert_eq!(page.users[0].email.as_deref(), Some("a@b.co"));
    }
}
