//! The retry executor.
//!
//! [`RetryTransport`] decorates an inner transport and repeats a request while
//! the [`RetryPolicy`] predicate asks for it, up to `max_retries` extra
//! attempts. Between attempts it waits the jittered backoff, racing the wait
//! against the request's [`CallContext`](roundtrip_core::CallContext) so a
//! canceled or expired call stops immediately.

use roundtrip_core::{BoxFuture, ClientError, Request, Response, SharedTransport, Transport};

use crate::config::{RetryPolicy, saturating_millis};

/// A transport that retries its inner transport according to a [`RetryPolicy`].
#[derive(Clone)]
pub struct RetryTransport {
    inner: SharedTransport,
    policy: RetryPolicy,
}

impl std::fmt::Debug for RetryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryTransport")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RetryTransport {
    pub fn new(inner: SharedTransport, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn execute(&self, request: Request) -> Result<Response, ClientError> {
        let ctx = request.context().clone();
        let max_retries = self.policy.max_retries;
        let mut attempt: u32 = 0;

        loop {
            if let Some(err) = ctx.err() {
                return Err(err);
            }

            let outcome = self.inner.round_trip(request.clone()).await;

            if !self.policy.should_retry(&outcome) {
                return outcome;
            }
            if attempt >= max_retries {
                if max_retries > 0 {
                    tracing::warn!(
                        attempts = attempt + 1,
                        method = %request.method(),
                        uri = %request.uri(),
                        "retries exhausted"
                    );
                }
                return outcome;
            }

            let delay = self.policy.delay_for(attempt);
            match &outcome {
                Ok(response) => tracing::debug!(
                    attempt,
                    delay_ms = saturating_millis(delay),
                    status = response.status().as_u16(),
                    "retrying after retryable status"
                ),
                Err(err) => tracing::debug!(
                    attempt,
                    delay_ms = saturating_millis(delay),
                    error = %err,
                    "retrying after transient error"
                ),
            }

            // Release the connection before waiting.
            if let Ok(response) = outcome {
                response.close();
            }

            tokio::select! {
                biased;
                err = ctx.done() => return Err(err),
                _ = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}

impl Transport for RetryTransport {
    fn round_trip(&self, request: Request) -> BoxFuture<'_, Result<Response, ClientError>> {
        Box::pin(self.execute(request))
    }
}
