//! Visitor authentication state.
//!
//! Each browser session owns an [`AuthContext`]: a GoTrue session, the
//! matching `user_profiles` row, and a `loading` flag that clears once the
//! initial session fetch settles or the emergency timer fires. Routes read
//! an [`AuthSnapshot`] from the context and never cache what it says about
//! roles.
//!
//! - [`store`] keeps the state and applies session changes.
//! - [`profile`] fetches and updates profiles under the retry policy.
//! - [`context`] binds a store to its connection and holds one per visitor.

pub mod context;
mod error;
pub mod profile;
pub mod store;

pub use context::{AuthContext, AuthRegistry, VisitorId};
pub use error::AuthError;
pub use store::{AuthSnapshot, AuthStore};

use std::time::Duration;

use crate::retry::RetryPolicy;

/// Minimum password length accepted at sign-up and password change.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Timeouts and retry budget for the auth flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthTimings {
    /// Budget for the initial session fetch.
    pub session_timeout: Duration,
    /// Budget for one profile fetch attempt.
    pub profile_attempt_timeout: Duration,
    /// Profile fetch attempts after the first.
    pub profile_retries: u32,
    /// Delay between profile fetch attempts.
    pub retry_backoff: Duration,
    /// Budget for all profile fetch attempts together.
    pub profile_deadline: Duration,
    /// `loading` is forced off after this long no matter what.
    pub emergency_timeout: Duration,
}

impl Default for AuthTimings {
    fn default() -> Self {
        Self {
            session_timeout: Duration::from_secs(8),
            profile_attempt_timeout: Duration::from_secs(3),
            profile_retries: 2,
            retry_backoff: Duration::from_secs(1),
            profile_deadline: Duration::from_secs(8),
            emergency_timeout: Duration::from_secs(10),
        }
    }
}

impl AuthTimings {
    #[must_use]
    pub const fn profile_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempt_timeout: self.profile_attempt_timeout,
            retries: self.profile_retries,
            backoff: self.retry_backoff,
            deadline: self.profile_deadline,
        }
    }

    /// Session calls and auth actions get one attempt.
    #[must_use]
    pub const fn session_policy(&self) -> RetryPolicy {
        RetryPolicy::once(self.session_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timings() {
        let timings = AuthTimings::default();
        assert_eq!(timings.session_timeout, Duration::from_secs(8));
        assert_eq!(timings.emergency_timeout, Duration::from_secs(10));

        let profile = timings.profile_policy();
        assert_eq!(profile.attempt_timeout, Duration::from_secs(3));
        assert_eq!(profile.retries, 2);
        assert_eq!(profile.backoff, Duration::from_secs(1));
        assert_eq!(profile.deadline, Duration::from_secs(8));
    }

    #[test]
    fn test_emergency_timer_outlasts_session_fetch() {
        let timings = AuthTimings::default();
        assert!(timings.emergency_timeout > timings.session_timeout);
    }
}
