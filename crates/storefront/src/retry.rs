//! Timeout and bounded retry for backend calls.
//!
//! One policy shape for every call that needs it: each attempt gets its own
//! timeout, transient failures are retried after a fixed backoff, and the
//! whole sequence is capped by an overall deadline. Timeouts only stop the
//! local wait; the remote request may still complete, so callers that write
//! shared state must check the result is still wanted.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::supabase::SupabaseError;

/// Timeout and retry settings for one kind of call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Budget for a single attempt.
    pub attempt_timeout: Duration,
    /// Attempts after the first one.
    pub retries: u32,
    /// Fixed delay between attempts.
    pub backoff: Duration,
    /// Budget for all attempts and backoffs together.
    pub deadline: Duration,
}

impl RetryPolicy {
    /// One attempt, no retries.
    #[must_use]
    pub const fn once(timeout: Duration) -> Self {
        Self {
            attempt_timeout: timeout,
            retries: 0,
            backoff: Duration::ZERO,
            deadline: timeout,
        }
    }
}

/// Why a retried call gave up.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// An attempt or the overall deadline elapsed. Raised locally, never by
    /// the backend.
    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    /// The last attempt failed, or the failure was not worth retrying.
    #[error(transparent)]
    Failed(E),
}

impl<E> RetryError<E> {
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Errors that know whether another attempt might succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for SupabaseError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}

/// Run `call` under `policy`.
///
/// # Errors
///
/// Returns [`RetryError::Timeout`] if the last attempt or the overall
/// deadline timed out, and [`RetryError::Failed`] with the last error
/// otherwise.
pub async fn call_with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut call: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let attempts = policy.retries.saturating_add(1);

    let run = async {
        let mut attempt = 1;
        loop {
            let failure = match tokio::time::timeout(policy.attempt_timeout, call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) if !e.is_retryable() => return Err(RetryError::Failed(e)),
                Ok(Err(e)) => {
                    tracing::warn!(operation, attempt, error = %e, "attempt failed");
                    RetryError::Failed(e)
                }
                Err(_) => {
                    tracing::warn!(operation, attempt, "attempt timed out");
                    RetryError::Timeout { operation }
                }
            };

            if attempt >= attempts {
                return Err(failure);
            }
            tokio::time::sleep(policy.backoff).await;
            attempt += 1;
        }
    };

    tokio::time::timeout(policy.deadline, run)
        .await
        .unwrap_or_else(|_| {
            tracing::warn!(operation, deadline_ms = policy.deadline.as_millis(), "deadline exceeded");
            Err(RetryError::Timeout { operation })
        })
}
