//! Per-call cancellation and deadline context.
//!
//! Every [`Request`](crate::Request) carries a [`CallContext`]. Layers check it
//! at their suspension points: the retry layer before each attempt and while
//! waiting out a backoff, the timeout interceptor around its delegated call,
//! and the hyper transport around the in-flight request.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::ClientError;

/// Cancellation token plus an optional deadline.
///
/// Cloning is cheap and clones observe the same token. Deriving a context with
/// [`with_timeout`](CallContext::with_timeout) or
/// [`with_deadline`](CallContext::with_deadline) creates a child token: canceling
/// the parent cancels the child, but not the other way around.
#[derive(Clone, Debug)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CallContext {
    /// A fresh context with no deadline that is never canceled unless
    /// [`cancel`](CallContext::cancel) is called.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// A context driven by an existing cancellation token.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Derive a child context that expires at `deadline`.
    ///
    /// If this context already has an earlier deadline, the earlier one is kept.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) if existing <= deadline => existing,
            _ => deadline,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// Derive a child context that expires `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Cancel this context and every context derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The underlying cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The effective deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the deadline, saturating at zero.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Returns a guard that cancels this context when dropped.
    ///
    /// Used to release a derived context on every exit path of the scope that
    /// created it.
    pub fn cancel_on_drop(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }

    /// The error this context resolves to if it has already fired.
    ///
    /// Explicit cancellation takes precedence over an expired deadline.
    pub fn err(&self) -> Option<ClientError> {
        if self.token.is_cancelled() {
            return Some(ClientError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ClientError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context is canceled or its deadline passes.
    ///
    /// The deadline timer lives inside the returned future; dropping the future
    /// drops the timer.
    pub async fn done(&self) -> ClientError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => ClientError::Canceled,
                    _ = tokio::time::sleep_until(deadline) => ClientError::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                ClientError::Canceled
            }
        }
    }
}
