use roundtrip_core::{BoxFuture, ClientError, Request, Response, SharedTransport, Transport};
use tokio::time::Instant;

use super::Interceptor;
use crate::config::saturating_millis;

/// Emits one `tracing` event per request with method, target, elapsed time
/// and the status code or error.
///
/// Successful exchanges (any status) are logged at `info`, transport failures
/// at `warn`. The request and response pass through untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingInterceptor;

impl LoggingInterceptor {
    pub fn new() -> Self {
        Self
    }
}

impl Interceptor for LoggingInterceptor {
    fn wrap(&self, next: SharedTransport) -> SharedTransport {
        std::sync::Arc::new(LoggingTransport { next })
    }
}

struct LoggingTransport {
    next: SharedTransport,
}

impl Transport for LoggingTransport {
    fn round_trip(&self, request: Request) -> BoxFuture<'_, Result<Response, ClientError>> {
        Box::pin(async move {
            let method = request.method().clone();
            let uri = request.uri().clone();
            let start = Instant::now();
            tracing::debug!(%method, %uri, "--> request");

            let outcome = self.next.round_trip(request).await;
            let elapsed_ms = saturating_millis(start.elapsed());

            match &outcome {
                Ok(response) => tracing::info!(
                    %method,
                    %uri,
                    status = response.status().as_u16(),
                    elapsed_ms,
                    "<-- response"
                ),
                Err(err) => tracing::warn!(
                    %method,
                    %uri,
                    error = %err,
                    elapsed_ms,
                    "<-- request failed"
                ),
            }

            outcome
        })
    }
}
