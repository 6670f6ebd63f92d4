//! Auth state for one visitor.
//!
//! Every write goes through `send_if_modified` on a watch channel. Session
//! changes bump a tag; work started against an older tag (the initial
//! session fetch, profile fetches) is dropped when it resolves, so a slow
//! response can never overwrite a newer sign-in or sign-out.

use std::time::Duration;

use nullbyte_core::UserId;
use tokio::sync::watch;

use crate::models::UserProfile;
use crate::supabase::{Session, User};

/// What a route sees of the visitor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub user: Option<User>,
    pub session: Option<Session>,
    pub profile: Option<UserProfile>,
    pub loading: bool,
}

impl AuthSnapshot {
    /// Derived from the live profile on every call.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.profile.as_ref().is_some_and(UserProfile::is_admin)
    }

    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.user.as_ref().map(|u| u.id)
    }

    /// Profile name, then the sign-up name, then the email.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        let user = self.user.as_ref()?;
        self.profile
            .as_ref()
            .and_then(|p| p.full_name.as_deref())
            .or_else(|| user.metadata_str("full_name"))
            .or(user.email.as_deref())
            .map(str::to_owned)
    }
}

#[derive(Debug, Default)]
struct StoreState {
    snapshot: AuthSnapshot,
    tag: u64,
}

/// Result of applying a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionChange {
    /// Tag to pass back when committing work for this session.
    pub tag: u64,
    pub user_id: Option<UserId>,
    /// False when the session carried the same access token as before.
    pub changed: bool,
}

/// Watch-backed auth state with tag-checked writes.
pub struct AuthStore {
    state: watch::Sender<StoreState>,
}

impl Default for AuthStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthStore {
    /// A signed-out store that is still loading.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(StoreState {
            snapshot: AuthSnapshot {
                loading: true,
                ..AuthSnapshot::default()
            },
            tag: 0,
        });
        Self { state }
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().snapshot.clone()
    }

    #[must_use]
    pub fn tag(&self) -> u64 {
        self.state.borrow().tag
    }

    /// Wait up to `max_wait` for loading to finish, then take a snapshot.
    pub async fn settled(&self, max_wait: Duration) -> AuthSnapshot {
        let mut rx = self.state.subscribe();
        if tokio::time::timeout(max_wait, rx.wait_for(|s| !s.snapshot.loading))
            .await
            .is_err()
        {
            tracing::debug!(wait_ms = max_wait.as_millis(), "auth still loading");
        }
        self.snapshot()
    }

    /// Apply a session from any source.
    ///
    /// A new access token bumps the tag; a different user also clears the
    /// profile. Signing out ends loading.
    pub fn apply_session(&self, session: Option<Session>) -> SessionChange {
        let mut change = SessionChange {
            tag: 0,
            user_id: None,
            changed: false,
        };
        self.state.send_modify(|state| change = apply(state, session));
        change
    }

    /// Apply a session only if nothing else has been applied since `tag`.
    pub fn apply_session_if(&self, tag: u64, session: Option<Session>) -> Option<SessionChange> {
        let mut change = None;
        self.state.send_if_modified(|state| {
            if state.tag != tag {
                return false;
            }
            change = Some(apply(state, session));
            true
        });
        change
    }

    /// Store a fetched profile and end loading, unless the session moved on.
    pub fn commit_profile(&self, tag: u64, profile: Option<UserProfile>) -> bool {
        self.state.send_if_modified(|state| {
            if state.tag != tag {
                return false;
            }
            state.snapshot.profile = profile;
            state.snapshot.loading = false;
            true
        })
    }

    /// End loading, unless the session moved on.
    pub fn finish_loading(&self, tag: u64) -> bool {
        self.state.send_if_modified(|state| {
            if state.tag != tag || !state.snapshot.loading {
                return false;
            }
            state.snapshot.loading = false;
            true
        })
    }

    /// End loading regardless of what is in flight.
    pub fn force_loading_false(&self) -> bool {
        self.state.send_if_modified(|state| {
            let was_loading = state.snapshot.loading;
            state.snapshot.loading = false;
            was_loading
        })
    }
}

fn apply(state: &mut StoreState, session: Option<Session>) -> SessionChange {
    let same = match (&state.snapshot.session, &session) {
        (None, None) => true,
        (Some(current), Some(next)) => current.same_token(next),
        _ => false,
    };
    let user_id = session.as_ref().map(|s| s.user.id);

    if !same {
        state.tag += 1;
        if state.snapshot.user_id() != user_id {
            state.snapshot.profile = None;
        }
    }
    state.snapshot.user = session.as_ref().map(|s| s.user.clone());
    state.snapshot.session = session;
    if user_id.is_none() {
        state.snapshot.loading = false;
    }

    SessionChange {
        tag: state.tag,
        user_id,
        changed: !same,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use nullbyte_core::Role;

    use super::*;
    use crate::testing::{profile_for, session_for, user};

    #[test]
    fn test_new_store_is_loading_and_signed_out() {
        let store = AuthStore::new();
        let snapshot = store.snapshot();
        assert!(snapshot.loading);
        assert!(!snapshot.is_signed_in());
        assert!(!snapshot.is_admin());
    }

    #[test]
    fn test_signed_out_session_ends_loading() {
        let store = AuthStore::new();
        let change = store.apply_session(None);
        assert!(!change.changed);
        assert!(!store.snapshot().loading);
    }

    #[test]
    fn test_sign_in_keeps_loading_until_profile_commits() {
        let store = AuthStore::new();
        let ada = user("ada@example.com");
        let change = store.apply_session(Some(session_for(&ada, "t1")));

        assert!(change.changed);
        assert_eq!(change.user_id, Some(ada.id));
        assert!(store.snapshot().loading);

        assert!(store.commit_profile(change.tag, Some(profile_for(&ada, Role::Admin))));
        let snapshot = store.snapshot();
        assert!(!snapshot.loading);
        assert!(snapshot.is_admin());
    }

    #[test]
    fn test_same_token_does_not_bump_tag() {
        let store = AuthStore::new();
        let ada = user("ada@example.com");
        let first = store.apply_session(Some(session_for(&ada, "t1")));
        let second = store.apply_session(Some(session_for(&ada, "t1")));
        assert!(!second.changed);
        assert_eq!(first.tag, second.tag);
    }

    #[test]
    fn test_stale_profile_is_discarded_after_sign_out() {
        let store = AuthStore::new();
        let ada = user("ada@example.com");
        let signed_in = store.apply_session(Some(session_for(&ada, "t1")));
        store.apply_session(None);

        assert!(!store.commit_profile(signed_in.tag, Some(profile_for(&ada, Role::Admin))));
        let snapshot = store.snapshot();
        assert!(snapshot.profile.is_none());
        assert!(!snapshot.is_admin());
    }

    #[test]
    fn test_token_refresh_keeps_profile_for_same_user() {
        let store = AuthStore::new();
        let ada = user("ada@example.com");
        let change = store.apply_session(Some(session_for(&ada, "t1")));
        store.commit_profile(change.tag, Some(profile_for(&ada, Role::Admin)));

        let refreshed = store.apply_session(Some(session_for(&ada, "t2")));

        assert!(refreshed.changed);
        assert!(store.snapshot().is_admin());
    }

    #[test]
    fn test_switching_user_clears_profile() {
        let store = AuthStore::new();
        let ada = user("ada@example.com");
        let grace = user("grace@example.com");
        let change = store.apply_session(Some(session_for(&ada, "t1")));
        store.commit_profile(change.tag, Some(profile_for(&ada, Role::Admin)));

        store.apply_session(Some(session_for(&grace, "t2")));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.user_id(), Some(grace.id));
        assert!(snapshot.profile.is_none());
        assert!(!snapshot.is_admin());
    }

    #[test]
    fn test_initial_session_is_dropped_once_superseded() {
        let store = AuthStore::new();
        let issued_at = store.tag();
        let ada = user("ada@example.com");
        store.apply_session(Some(session_for(&ada, "fresh")));

        let stale = store.apply_session_if(issued_at, None);

        assert!(stale.is_none());
        assert_eq!(store.snapshot().user_id(), Some(ada.id));
    }

    #[test]
    fn test_finish_loading_respects_tag() {
        let store = AuthStore::new();
        let issued_at = store.tag();
        store.apply_session(Some(session_for(&user("ada@example.com"), "t1")));
        assert!(!store.finish_loading(issued_at));
        assert!(store.snapshot().loading);
        assert!(store.force_loading_false());
        assert!(!store.snapshot().loading);
    }

    #[test]
    fn test_display_name_fallbacks() {
        let store = AuthStore::new();
        let ada = user("ada@example.com");
        let change = store.apply_session(Some(session_for(&ada, "t1")));
        assert_eq!(store.snapshot().display_name().as_deref(), Some("ada@example.com"));

        store.commit_profile(change.tag, Some(profile_for(&ada, Role::User)));
        assert_eq!(store.snapshot().display_name().as_deref(), Some("Test User"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_waits_for_loading() {
        let store = std::sync::Arc::new(AuthStore::new());
        let writer = store.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            writer.apply_session(None);
        });

        let snapshot = store.settled(Duration::from_secs(1)).await;
        assert!(!snapshot.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_gives_up_after_max_wait() {
        let store = AuthStore::new();
        let snapshot = store.settled(Duration::from_millis(50)).await;
        assert!(snapshot.loading);
    }
}
