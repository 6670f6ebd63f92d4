//! GoTrue client holding one visitor's session.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tokio::sync::{Mutex, broadcast};
use tracing::instrument;
use url::Url;

use super::http::{send, send_json, with_params};
use super::{
    AuthChangeEvent, AuthEvent, AuthProvider, Session, SignUpData, SignUpOutcome, SupabaseError,
    User, UserAttributes,
};

/// Buffered auth events per visitor; subscribers that fall further behind
/// skip to the latest.
const EVENT_CAPACITY: usize = 16;

/// GoTrue (`/auth/v1`) client for a single visitor.
///
/// Mirrors what the JS SDK does in one browser tab: keeps the current
/// session, refreshes it when the access token expires, and broadcasts
/// every transition.
pub struct GoTrueClient {
    http: reqwest::Client,
    auth_url: Url,
    api_key: SecretString,
    session: Mutex<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

impl GoTrueClient {
    /// Create a signed-out client.
    ///
    /// # Errors
    ///
    /// Returns an error if the auth endpoint URL cannot be built.
    pub fn new(
        http: reqwest::Client,
        project_url: &Url,
        api_key: SecretString,
    ) -> Result<Self, SupabaseError> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            http,
            auth_url: project_url.join("auth/v1/")?,
            api_key,
            session: Mutex::new(None),
            events,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, SupabaseError> {
        Ok(self.auth_url.join(path)?)
    }

    fn headers(&self, bearer: Option<&str>) -> HeaderMap {
        let key = self.api_key.expose_secret();
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(key) {
            headers.insert("apikey", value);
        }
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", bearer.unwrap_or(key))) {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    fn emit(&self, kind: AuthChangeEvent, session: Option<Session>) {
        // No receivers is fine: nobody is listening yet.
        let _ = self.events.send(AuthEvent::new(kind, session));
    }

    async fn token_grant(&self, grant_type: &str, body: &Value) -> Result<Session, SupabaseError> {
        let url = with_params(self.endpoint("token")?, [("grant_type", grant_type)]);
        let json = send_json(
            self.http.post(url).headers(self.headers(None)).json(body),
            "gotrue.token",
        )
        .await?;
        let session: Session = serde_json::from_value(json)?;
        Ok(session.with_expiry_from(Utc::now()))
    }

    /// Exchange the refresh token. Caller holds the session lock.
    async fn refresh(&self, current: &Session) -> Result<Session, SupabaseError> {
        self.token_grant(
            "refresh_token",
            &json!({ "refresh_token": current.refresh_token }),
        )
        .await
    }
}

#[async_trait]
impl AuthProvider for GoTrueClient {
    async fn get_session(&self) -> Result<Option<Session>, SupabaseError> {
        let mut guard = self.session.lock().await;
        let Some(current) = guard.as_ref() else {
            return Ok(None);
        };
        if !current.is_expired(Utc::now()) {
            return Ok(Some(current.clone()));
        }

        match self.refresh(current).await {
            Ok(session) => {
                tracing::debug!(user_id = %session.user.id, "access token refreshed");
                *guard = Some(session.clone());
                drop(guard);
                self.emit(AuthChangeEvent::TokenRefreshed, Some(session.clone()));
                Ok(Some(session))
            }
            Err(e) if !e.is_transient() => {
                // Refresh token revoked or reused: the login is over.
                tracing::info!(error = %e, "refresh rejected, signing out");
                *guard = None;
                drop(guard);
                self.emit(AuthChangeEvent::SignedOut, None);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, password, data))]
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        data: &SignUpData,
    ) -> Result<SignUpOutcome, SupabaseError> {
        let body = json!({ "email": email, "password": password, "data": data });
        let json = send_json(
            self.http
                .post(self.endpoint("signup")?)
                .headers(self.headers(None))
                .json(&body),
            "gotrue.signup",
        )
        .await?;

        // Autoconfirm projects answer with a session, others with the bare user
        if json.get("access_token").is_some() {
            let session = serde_json::from_value::<Session>(json)?.with_expiry_from(Utc::now());
            *self.session.lock().await = Some(session.clone());
            self.emit(AuthChangeEvent::SignedIn, Some(session.clone()));
            return Ok(SignUpOutcome {
                user: Some(session.user.clone()),
                session: Some(session),
            });
        }

        let user = json
            .get("user")
            .cloned()
            .or(Some(json))
            .and_then(|v| serde_json::from_value::<User>(v).ok());
        Ok(SignUpOutcome {
            user,
            session: None,
        })
    }

    #[instrument(skip(self, password))]
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, SupabaseError> {
        let session = self
            .token_grant("password", &json!({ "email": email, "password": password }))
            .await?;
        *self.session.lock().await = Some(session.clone());
        self.emit(AuthChangeEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), SupabaseError> {
        let previous = self.session.lock().await.take();
        self.emit(AuthChangeEvent::SignedOut, None);

        let Some(previous) = previous else {
            return Ok(());
        };
        let url = with_params(self.endpoint("logout")?, [("scope", "global")]);
        match send(
            self.http
                .post(url)
                .headers(self.headers(Some(&previous.access_token))),
            "gotrue.logout",
        )
        .await
        {
            Ok(_) => Ok(()),
            // Token already expired or revoked: nothing left to revoke.
            Err(SupabaseError::Api { status: 401 | 403 | 404, .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self))]
    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), SupabaseError> {
        let url = with_params(self.endpoint("recover")?, [("redirect_to", redirect_to)]);
        send(
            self.http
                .post(url)
                .headers(self.headers(None))
                .json(&json!({ "email": email })),
            "gotrue.recover",
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self, token_hash))]
    async fn verify_recovery(&self, token_hash: &str) -> Result<Session, SupabaseError> {
        let json = send_json(
            self.http
                .post(self.endpoint("verify")?)
                .headers(self.headers(None))
                .json(&json!({ "type": "recovery", "token_hash": token_hash })),
            "gotrue.verify",
        )
        .await?;
        let session: Session = serde_json::from_value(json)?;
        let session = session.with_expiry_from(Utc::now());
        *self.session.lock().await = Some(session.clone());
        self.emit(AuthChangeEvent::PasswordRecovery, Some(session.clone()));
        Ok(session)
    }

    async fn update_user(&self, attributes: &UserAttributes) -> Result<User, SupabaseError> {
        let session = self.get_session().await?.ok_or(SupabaseError::NoSession)?;
        let json = send_json(
            self.http
                .put(self.endpoint("user")?)
                .headers(self.headers(Some(&session.access_token)))
                .json(attributes),
            "gotrue.update_user",
        )
        .await?;
        let user: User = serde_json::from_value(json)?;

        let updated = {
            let mut guard = self.session.lock().await;
            guard.as_mut().map(|s| {
                s.user = user.clone();
                s.clone()
            })
        };
        self.emit(AuthChangeEvent::UserUpdated, updated);
        Ok(user)
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> GoTrueClient {
        GoTrueClient::new(
            reqwest::Client::new(),
            &Url::parse("https://abc.supabase.co").unwrap(),
            SecretString::from("anon-key"),
        )
        .unwrap()
    }

    #[test]
    fn test_endpoints_live_under_auth_v1() {
        let client = client();
        assert_eq!(
            client.endpoint("token").unwrap().as_str(),
            "https://abc.supabase.co/auth/v1/token"
        );
        assert_eq!(
            client.endpoint("admin/users").unwrap().as_str(),
            "https://abc.supabase.co/auth/v1/admin/users"
        );
    }

    #[test]
    fn test_headers_default_to_api_key_bearer() {
        let client = client();
        let headers = client.headers(None);
        assert_eq!(headers.get("apikey").unwrap(), "anon-key");
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer anon-key");

        let headers = client.headers(Some("user-jwt"));
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer user-jwt");
    }

    #[tokio::test]
    async fn test_signed_out_client_has_no_session() {
        let client = client();
        assert!(client.get_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_without_session_still_emits() {
        let client = client();
        let mut rx = client.subscribe();
        client.sign_out().await.unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, AuthChangeEvent::SignedOut);
        assert!(event.session.is_none());
    }
}
