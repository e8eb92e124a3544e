use std::sync::Arc;
use std::time::Duration;

use roundtrip_core::{BoxFuture, ClientError, Request, Response, SharedTransport, Transport};

use super::Interceptor;

/// Bounds each request by a timeout.
///
/// The request gets a child context expiring after `timeout`; an earlier
/// deadline already on the request still wins. The child context is canceled
/// when the call returns, whichever way it returns, and the delegated call is
/// raced against it so the bound holds even for transports that never look at
/// the context.
///
/// Interceptors sit outside the retry layer, so the timeout covers every
/// attempt and the waits between them.
#[derive(Clone, Copy, Debug)]
pub struct TimeoutInterceptor {
    timeout: Duration,
}

impl TimeoutInterceptor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Interceptor for TimeoutInterceptor {
    fn wrap(&self, next: SharedTransport) -> SharedTransport {
        Arc::new(TimeoutTransport {
            timeout: self.timeout,
            next,
        })
    }
}

struct TimeoutTransport {
    timeout: Duration,
    next: SharedTransport,
}

impl Transport for TimeoutTransport {
    fn round_trip(&self, request: Request) -> BoxFuture<'_, Result<Response, ClientError>> {
        Box::pin(run_with_timeout(&*self.next, request, self.timeout))
    }
}

/// Run `request` through `next` under a child context expiring after `timeout`.
pub(crate) async fn run_with_timeout(
    next: &dyn Transport,
    request: Request,
    timeout: Duration,
) -> Result<Response, ClientError> {
    let ctx = request.context().with_timeout(timeout);
    let _guard = ctx.cancel_on_drop();
    let request = request.with_context(ctx.clone());

    tokio::select! {
        biased;
        outcome = next.round_trip(request) => outcome,
        err = ctx.done() => Err(err),
    }
}
