//! Per-visitor auth contexts.
//!
//! An [`AuthContext`] binds an [`AuthStore`] to the visitor's Supabase
//! connection and runs three background tasks: the initial session fetch,
//! the auth event listener, and the emergency timer that forces `loading`
//! off. The [`AuthRegistry`] hands out one context per visitor id and
//! drops contexts that sit idle as long as the session cookie lives.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use moka::future::Cache;
use nullbyte_core::{Email, UserId};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::instrument;

use super::profile::{self, fetch_profile};
use super::store::{AuthSnapshot, AuthStore, SessionChange};
use super::{AuthError, AuthTimings, MIN_PASSWORD_LENGTH};
use crate::models::{ProfileUpdate, UserProfile};
use crate::retry::call_with_retry;
use crate::supabase::{
    AuthChangeEvent, AuthEvent, Connection, Datastore, Session, SignUpData, SignUpOutcome,
    SupabaseConnector, SupabaseError, UserAttributes,
};

nullbyte_core::define_id!(VisitorId);

/// Contexts idle this long are dropped; matches the session cookie expiry.
pub const VISITOR_IDLE_TIMEOUT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const MAX_VISITORS: u64 = 50_000;

/// Aborts the task when dropped.
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

struct Inner {
    store: AuthStore,
    conn: Connection,
    timings: AuthTimings,
    reset_redirect: String,
    profile_task: Mutex<Option<AbortOnDrop>>,
}

impl Inner {
    /// Apply a session and load its profile in the background.
    fn handle_session(self: &Arc<Self>, session: Option<Session>, refetch: bool) {
        let change = self.store.apply_session(session);
        tracing::debug!(
            tag = change.tag,
            changed = change.changed,
            signed_in = change.user_id.is_some(),
            "session applied"
        );
        match change.user_id {
            Some(user_id) if change.changed || refetch => self.spawn_profile_fetch(change.tag, user_id),
            Some(_) => {}
            None => self.set_profile_task(None),
        }
    }

    fn spawn_profile_fetch(self: &Arc<Self>, tag: u64, user_id: UserId) {
        let inner = Arc::clone(self);
        let handle = tokio::spawn(async move {
            inner.load_profile(tag, user_id).await;
        });
        self.set_profile_task(Some(AbortOnDrop(handle)));
    }

    /// Replacing the task aborts the one it replaces.
    fn set_profile_task(&self, task: Option<AbortOnDrop>) {
        let previous = std::mem::replace(
            &mut *self.profile_task.lock().unwrap_or_else(PoisonError::into_inner),
            task,
        );
        drop(previous);
    }

    async fn load_profile(&self, tag: u64, user_id: UserId) {
        let profile =
            fetch_profile(self.conn.db.as_ref(), user_id, &self.timings.profile_policy()).await;
        if !self.store.commit_profile(tag, profile) {
            tracing::debug!(tag, "discarded profile for a superseded session");
        }
    }

    /// Apply a session returned by an action and wait for its profile.
    async fn adopt(&self, session: Session) -> SessionChange {
        let change = self.store.apply_session(Some(session));
        if let Some(user_id) = change.user_id {
            self.load_profile(change.tag, user_id).await;
        }
        change
    }

    fn signed_in_user(&self) -> Result<UserId, AuthError> {
        self.store.snapshot().user_id().ok_or(AuthError::NotSignedIn)
    }
}

async fn bootstrap(inner: Arc<Inner>) {
    let tag = inner.store.tag();
    let auth = &inner.conn.auth;
    let result = call_with_retry(&inner.timings.session_policy(), "session fetch", || {
        auth.get_session()
    })
    .await;

    match result {
        Ok(session) => match inner.store.apply_session_if(tag, session) {
            Some(change) => {
                if let Some(user_id) = change.user_id {
                    inner.load_profile(change.tag, user_id).await;
                }
            }
            None => tracing::debug!("initial session superseded"),
        },
        Err(e) => {
            tracing::warn!(error = %e, "initial session fetch failed");
            inner.store.finish_loading(tag);
        }
    }
}

async fn listen(inner: Arc<Inner>, mut events: broadcast::Receiver<AuthEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                tracing::debug!(kind = ?event.kind, "auth event");
                inner.handle_session(event.session, event.kind == AuthChangeEvent::UserUpdated);
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "auth events lagged, resyncing session");
                let auth = &inner.conn.auth;
                match call_with_retry(&inner.timings.session_policy(), "session resync", || {
                    auth.get_session()
                })
                .await
                {
                    Ok(session) => inner.handle_session(session, true),
                    Err(e) => tracing::warn!(error = %e, "session resync failed"),
                }
            }
            Err(RecvError::Closed) => break,
        }
    }
}

async fn emergency_timer(inner: Arc<Inner>) {
    tokio::time::sleep(inner.timings.emergency_timeout).await;
    if inner.store.force_loading_false() {
        tracing::warn!(
            timeout_ms = inner.timings.emergency_timeout.as_millis(),
            "auth still loading at emergency timeout, forcing loading off"
        );
    }
}

/// One visitor's auth state and actions.
pub struct AuthContext {
    inner: Arc<Inner>,
    _tasks: [AbortOnDrop; 3],
}

impl AuthContext {
    /// Start tracking a fresh connection. Must be called inside a Tokio
    /// runtime.
    #[must_use]
    pub fn start(conn: Connection, timings: AuthTimings, base_url: &str) -> Self {
        let inner = Arc::new(Inner {
            store: AuthStore::new(),
            conn,
            timings,
            reset_redirect: format!("{}/reset-password", base_url.trim_end_matches('/')),
            profile_task: Mutex::new(None),
        });

        // Subscribe first so no transition between the fetch and the
        // listener starting is lost.
        let events = inner.conn.auth.subscribe();
        let tasks = [
            AbortOnDrop(tokio::spawn(listen(Arc::clone(&inner), events))),
            AbortOnDrop(tokio::spawn(bootstrap(Arc::clone(&inner)))),
            AbortOnDrop(tokio::spawn(emergency_timer(Arc::clone(&inner)))),
        ];

        Self {
            inner,
            _tasks: tasks,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthSnapshot {
        self.inner.store.snapshot()
    }

    /// Snapshot after waiting up to `max_wait` for loading to finish.
    pub async fn settled(&self, max_wait: Duration) -> AuthSnapshot {
        self.inner.store.settled(max_wait).await
    }

    /// Row access under this visitor's session.
    #[must_use]
    pub fn db(&self) -> &dyn Datastore {
        self.inner.conn.db.as_ref()
    }

    /// Create an account. Returns with the visitor signed in when the
    /// project auto-confirms emails.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidEmail`] or [`AuthError::WeakPassword`] for
    /// bad input, and the backend error otherwise.
    #[instrument(skip(self, password, data))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        data: &SignUpData,
    ) -> Result<SignUpOutcome, AuthError> {
        let email = Email::parse_normalized(email)?;
        check_password(password)?;

        let auth = &self.inner.conn.auth;
        let outcome = call_with_retry(&self.inner.timings.session_policy(), "sign up", || {
            auth.sign_up(email.as_str(), password, data)
        })
        .await?;

        if let Some(session) = outcome.session.clone() {
            self.inner.adopt(session).await;
        }
        tracing::info!(confirm = outcome.needs_confirmation(), "signed up");
        Ok(outcome)
    }

    /// Sign in and wait for the profile before returning.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for a wrong email or
    /// password, [`AuthError::Timeout`] if GoTrue does not answer in time.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSnapshot, AuthError> {
        let email = Email::parse_normalized(email)?;

        let auth = &self.inner.conn.auth;
        let session = call_with_retry(&self.inner.timings.session_policy(), "sign in", || {
            auth.sign_in_with_password(email.as_str(), password)
        })
        .await?;

        let change = self.inner.adopt(session).await;
        let snapshot = self.snapshot();
        tracing::info!(
            user_id = ?change.user_id,
            admin = snapshot.is_admin(),
            "signed in"
        );
        Ok(snapshot)
    }

    /// Clear local state, then revoke the session.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the visitor is signed out locally either
    /// way.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.inner.handle_session(None, false);

        let auth = &self.inner.conn.auth;
        call_with_retry(&self.inner.timings.session_policy(), "sign out", || {
            auth.sign_out()
        })
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "sign out request failed");
            AuthError::from(e)
        })?;
        tracing::info!("signed out");
        Ok(())
    }

    /// Send a password reset email pointing at `/reset-password`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidEmail`] or the backend error.
    #[instrument(skip(self))]
    pub async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        let email = Email::parse_normalized(email)?;
        let auth = &self.inner.conn.auth;
        let redirect = self.inner.reset_redirect.as_str();
        call_with_retry(&self.inner.timings.session_policy(), "password reset", || {
            auth.reset_password_for_email(email.as_str(), redirect)
        })
        .await?;
        Ok(())
    }

    /// Sign in from a password recovery link so the password can be set.
    ///
    /// # Errors
    ///
    /// Returns the backend error for an expired or reused link.
    #[instrument(skip(self, token_hash))]
    pub async fn verify_recovery(&self, token_hash: &str) -> Result<AuthSnapshot, AuthError> {
        let auth = &self.inner.conn.auth;
        let session = call_with_retry(&self.inner.timings.session_policy(), "recovery", || {
            auth.verify_recovery(token_hash)
        })
        .await?;
        self.inner.adopt(session).await;
        tracing::info!("recovery link accepted");
        Ok(self.snapshot())
    }

    /// Update the visitor's own profile and replace the local copy.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotSignedIn`] for anonymous visitors.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<UserProfile, AuthError> {
        let user_id = self.inner.signed_in_user()?;
        let tag = self.inner.store.tag();

        let db = self.inner.conn.db.as_ref();
        let update = update.trimmed();
        let profile = call_with_retry(&self.inner.timings.session_policy(), "profile update", || {
            profile::update_profile(db, user_id, &update)
        })
        .await?;

        self.inner.store.commit_profile(tag, Some(profile.clone()));
        tracing::info!("profile updated");
        Ok(profile)
    }

    /// # Errors
    ///
    /// Returns [`AuthError::NotSignedIn`], [`AuthError::WeakPassword`] or the
    /// backend error.
    #[instrument(skip(self, password))]
    pub async fn update_password(&self, password: &str) -> Result<(), AuthError> {
        self.inner.signed_in_user()?;
        check_password(password)?;

        let attributes = UserAttributes {
            password: Some(password.to_owned()),
            ..UserAttributes::default()
        };
        let auth = &self.inner.conn.auth;
        call_with_retry(&self.inner.timings.session_policy(), "password update", || {
            auth.update_user(&attributes)
        })
        .await?;
        tracing::info!("password updated");
        Ok(())
    }

    /// Reload the profile, e.g. after an admin changed the visitor's role.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotSignedIn`] for anonymous visitors.
    pub async fn refresh_profile(&self) -> Result<Option<UserProfile>, AuthError> {
        let user_id = self.inner.signed_in_user()?;
        let tag = self.inner.store.tag();
        self.inner.load_profile(tag, user_id).await;
        Ok(self.snapshot().profile)
    }
}

impl Drop for AuthContext {
    fn drop(&mut self) {
        self.inner.set_profile_task(None);
    }
}

fn check_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    Ok(())
}

/// One [`AuthContext`] per visitor.
pub struct AuthRegistry {
    connector: Arc<dyn SupabaseConnector>,
    timings: AuthTimings,
    base_url: String,
    contexts: Cache<VisitorId, Arc<AuthContext>>,
}

impl AuthRegistry {
    #[must_use]
    pub fn new(connector: Arc<dyn SupabaseConnector>, timings: AuthTimings, base_url: &str) -> Self {
        let contexts = Cache::builder()
            .max_capacity(MAX_VISITORS)
            .time_to_idle(VISITOR_IDLE_TIMEOUT)
            .build();
        Self {
            connector,
            timings,
            base_url: base_url.to_owned(),
            contexts,
        }
    }

    /// The visitor's context, started on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if a connection cannot be built.
    pub async fn context_for(&self, visitor: VisitorId) -> Result<Arc<AuthContext>, SupabaseError> {
        if let Some(context) = self.contexts.get(&visitor).await {
            return Ok(context);
        }

        let conn = self.connector.connect()?;
        let timings = self.timings;
        let base_url = self.base_url.as_str();
        let entry = self
            .contexts
            .entry(visitor)
            .or_insert_with(async move { Arc::new(AuthContext::start(conn, timings, base_url)) })
            .await;
        if entry.is_fresh() {
            tracing::debug!(%visitor, "started auth context");
        }
        Ok(entry.into_value())
    }

    /// Drop a visitor's context.
    pub async fn forget(&self, visitor: VisitorId) {
        self.contexts.invalidate(&visitor).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use nullbyte_core::Role;
    use tokio::time::Instant;

    use super::*;
    use crate::auth::profile::PROFILES_TABLE;
    use crate::testing::{FakeConnector, profile_row};

    const SETTLE: Duration = Duration::from_secs(30);

    fn start(connector: &FakeConnector) -> AuthContext {
        AuthContext::start(
            connector.connect().unwrap(),
            AuthTimings::default(),
            "https://shop.example.com/",
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_anonymous_visitor_settles_immediately() {
        let connector = FakeConnector::new();
        let ctx = start(&connector);

        let snapshot = ctx.settled(SETTLE).await;

        assert!(!snapshot.loading);
        assert!(!snapshot.is_signed_in());
    }

    #[tokio::test(start_paused = true)]
    async fn test_existing_session_loads_profile() {
        let connector = FakeConnector::new();
        let ada = connector.accounts.add("ada@example.com", "hunter22", Some("Ada"));
        connector.db.seed(PROFILES_TABLE, [profile_row(ada.id, "Ada", Role::Admin)]);
        connector.resume_session_as(&ada);

        let snapshot = start(&connector).settled(SETTLE).await;

        assert!(!snapshot.loading);
        assert_eq!(snapshot.user_id(), Some(ada.id));
        assert!(snapshot.is_admin());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_session_fetch_ends_loading_at_session_timeout() {
        let connector = FakeConnector::new();
        connector.hang_sessions();
        let ctx = start(&connector);
        let begin = Instant::now();

        let snapshot = ctx.settled(SETTLE).await;

        assert!(!snapshot.loading);
        assert!(!snapshot.is_signed_in());
        assert_eq!(begin.elapsed(), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_emergency_timer_ends_loading() {
        let connector = FakeConnector::new();
        connector.hang_sessions();
        let timings = AuthTimings {
            session_timeout: Duration::from_secs(60),
            ..AuthTimings::default()
        };
        let ctx = AuthContext::start(connector.connect().unwrap(), timings, "http://localhost");
        let begin = Instant::now();

        let snapshot = ctx.settled(SETTLE).await;

        assert!(!snapshot.loading);
        assert_eq!(begin.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_profile_leaves_user_without_admin() {
        let connector = FakeConnector::new();
        let ada = connector.accounts.add("ada@example.com", "hunter22", None);
        connector.db.seed(PROFILES_TABLE, [profile_row(ada.id, "Ada", Role::Admin)]);
        connector.db.hang_table(PROFILES_TABLE);
        connector.resume_session_as(&ada);

        let snapshot = start(&connector).settled(SETTLE).await;

        assert!(!snapshot.loading);
        assert_eq!(snapshot.user_id(), Some(ada.id));
        assert!(snapshot.profile.is_none());
        assert!(!snapshot.is_admin());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_profile_row_is_not_an_error() {
        let connector = FakeConnector::new();
        connector.accounts.add("new@example.com", "hunter22", None);
        let ctx = start(&connector);
        ctx.settled(SETTLE).await;

        let snapshot = ctx.sign_in("new@example.com", "hunter22").await.unwrap();

        assert!(snapshot.is_signed_in());
        assert!(snapshot.profile.is_none());
        assert!(!snapshot.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_in_waits_for_profile() {
        let connector = FakeConnector::new();
        let ada = connector.accounts.add("ada@example.com", "hunter22", None);
        connector.db.seed(PROFILES_TABLE, [profile_row(ada.id, "Ada", Role::Admin)]);
        connector.db.delay_table(PROFILES_TABLE, Duration::from_secs(2));
        let ctx = start(&connector);
        ctx.settled(SETTLE).await;

        let snapshot = ctx.sign_in(" Ada@Example.com ", "hunter22").await.unwrap();

        assert!(snapshot.is_admin());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_password_is_invalid_credentials() {
        let connector = FakeConnector::new();
        connector.accounts.add("ada@example.com", "hunter22", None);
        let ctx = start(&connector);

        let err = ctx.sign_in("ada@example.com", "wrong").await.unwrap_err();

        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(!ctx.snapshot().is_signed_in());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_profile_after_sign_out_is_discarded() {
        let connector = FakeConnector::new();
        let ada = connector.accounts.add("ada@example.com", "hunter22", None);
        connector.db.seed(PROFILES_TABLE, [profile_row(ada.id, "Ada", Role::Admin)]);
        connector.db.delay_table(PROFILES_TABLE, Duration::from_secs(2));
        connector.resume_session_as(&ada);
        let ctx = start(&connector);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(ctx.snapshot().is_signed_in());
        ctx.sign_out().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        let snapshot = ctx.snapshot();
        assert!(!snapshot.is_signed_in());
        assert!(snapshot.profile.is_none());
        assert!(!snapshot.is_admin());
        assert!(!snapshot.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_up_validates_input() {
        let connector = FakeConnector::new();
        let ctx = start(&connector);

        let err = ctx
            .sign_up("not-an-email", "hunter22", &SignUpData::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidEmail(_)));

        let err = ctx
            .sign_up("ada@example.com", "short", &SignUpData::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::WeakPassword { min: 6 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_up_without_autoconfirm_needs_confirmation() {
        let connector = FakeConnector::new();
        let ctx = start(&connector);

        let outcome = ctx
            .sign_up(
                "ada@example.com",
                "hunter22",
                &SignUpData {
                    full_name: Some("Ada".to_owned()),
                },
            )
            .await
            .unwrap();

        assert!(outcome.needs_confirmation());
        assert!(!ctx.snapshot().is_signed_in());
        assert!(connector.accounts.find("ada@example.com").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_password_redirects_to_reset_page() {
        let connector = FakeConnector::new();
        let ctx = start(&connector);

        ctx.reset_password("ada@example.com").await.unwrap();

        assert_eq!(
            connector.recovery_requests(),
            vec![(
                "ada@example.com".to_owned(),
                "https://shop.example.com/reset-password".to_owned()
            )]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovery_link_signs_in_for_password_change() {
        let connector = FakeConnector::new();
        connector.accounts.add("ada@example.com", "forgotten", None);
        let ctx = start(&connector);
        ctx.settled(SETTLE).await;

        let snapshot = ctx.verify_recovery("ada@example.com").await.unwrap();
        assert!(snapshot.is_signed_in());

        ctx.update_password("brand-new").await.unwrap();
        assert!(connector.accounts.check("ada@example.com", "brand-new").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_recovery_link_is_rejected() {
        let connector = FakeConnector::new();
        let ctx = start(&connector);

        let err = ctx.verify_recovery("nobody@example.com").await.unwrap_err();

        assert!(matches!(err, AuthError::Provider(SupabaseError::Api { status: 403, .. })));
        assert!(!ctx.snapshot().is_signed_in());
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_profile_requires_sign_in() {
        let connector = FakeConnector::new();
        let ctx = start(&connector);
        ctx.settled(SETTLE).await;

        let err = ctx.update_profile(ProfileUpdate::default()).await.unwrap_err();

        assert!(matches!(err, AuthError::NotSignedIn));
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_profile_replaces_local_copy() {
        let connector = FakeConnector::new();
        let ada = connector.accounts.add("ada@example.com", "hunter22", None);
        connector.db.seed(PROFILES_TABLE, [profile_row(ada.id, "Ada", Role::User)]);
        let ctx = start(&connector);
        ctx.sign_in("ada@example.com", "hunter22").await.unwrap();

        let updated = ctx
            .update_profile(ProfileUpdate {
                full_name: Some("Ada Lovelace".to_owned()),
                avatar_url: None,
            })
            .await
            .unwrap();

        assert_eq!(updated.full_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(
            ctx.snapshot().display_name().as_deref(),
            Some("Ada Lovelace")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_profile_picks_up_role_change() {
        let connector = FakeConnector::new();
        let ada = connector.accounts.add("ada@example.com", "hunter22", None);
        connector.db.seed(PROFILES_TABLE, [profile_row(ada.id, "Ada", Role::User)]);
        let ctx = start(&connector);
        ctx.sign_in("ada@example.com", "hunter22").await.unwrap();
        assert!(!ctx.snapshot().is_admin());

        connector.db.replace(PROFILES_TABLE, [profile_row(ada.id, "Ada", Role::Admin)]);
        let profile = ctx.refresh_profile().await.unwrap();

        assert!(profile.unwrap().is_admin());
        assert!(ctx.snapshot().is_admin());
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_password_checks_length() {
        let connector = FakeConnector::new();
        connector.accounts.add("ada@example.com", "hunter22", None);
        let ctx = start(&connector);
        ctx.sign_in("ada@example.com", "hunter22").await.unwrap();

        let err = ctx.update_password("123").await.unwrap_err();
        assert!(matches!(err, AuthError::WeakPassword { .. }));

        ctx.update_password("correct horse").await.unwrap();
        ctx.sign_out().await.unwrap();
        ctx.sign_in("ada@example.com", "correct horse").await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_reuses_context_per_visitor() {
        let connector = Arc::new(FakeConnector::new());
        let registry = AuthRegistry::new(connector.clone(), AuthTimings::default(), "http://localhost");
        let visitor = VisitorId::random();

        let first = registry.context_for(visitor).await.unwrap();
        let again = registry.context_for(visitor).await.unwrap();
        let other = registry.context_for(VisitorId::random()).await.unwrap();

        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(connector.connections(), 2);
    }
}
