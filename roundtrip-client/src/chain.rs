//! Composition of the request pipeline.
//!
//! ```text
//! caller -> interceptor[0] -> ... -> interceptor[n-1] -> retry -> base
//! ```
//!
//! The retry layer is innermost and only present when `max_retries > 0`.
//! Interceptors wrap it in declaration order, the first one outermost.

use std::sync::Arc;

use roundtrip_core::{BoxFuture, ClientError, Request, Response, SharedTransport, Transport};

use crate::config::RetryPolicy;
use crate::interceptor::{Interceptor, InterceptorChain};
use crate::retry::RetryTransport;

/// The composed pipeline.
///
/// Holds no per-call state, so one pipeline serves any number of concurrent
/// calls. Keeps the base transport so the chain can be rebuilt with a
/// different policy or interceptor list.
#[derive(Clone)]
pub struct Pipeline {
    base: SharedTransport,
    head: SharedTransport,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Compose `base`, the retry layer and `interceptors`.
    pub fn build(base: SharedTransport, policy: &RetryPolicy, interceptors: &InterceptorChain) -> Self {
        let mut head = base.clone();
        if policy.is_enabled() {
            head = Arc::new(RetryTransport::new(head, policy.clone()));
        }
        let head = interceptors.wrap(head);
        Self { base, head }
    }

    /// Compose again from the retained base transport.
    pub fn rebuild(&self, policy: &RetryPolicy, interceptors: &InterceptorChain) -> Self {
        Self::build(self.base.clone(), policy, interceptors)
    }

    /// The base transport this pipeline was built on.
    pub fn base(&self) -> &SharedTransport {
        &self.base
    }
}

impl Transport for Pipeline {
    fn round_trip(&self, request: Request) -> BoxFuture<'_, Result<Response, ClientError>> {
        self.head.round_trip(request)
    }
}
