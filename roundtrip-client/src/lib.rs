//! HTTP client with retries, backoff and an ordered interceptor pipeline.
//!
//! Every call travels through a [`Pipeline`]: user interceptors on the
//! outside, an optional [`RetryTransport`] below them and a base transport
//! ([`HyperTransport`] unless one is supplied) at the bottom.
//!
//! ## Features
//!
//! - Exponential backoff with jitter between retry attempts
//! - Retry predicate over the whole outcome (status or error)
//! - Logging, metrics and timeout interceptors, plus closure-based ones
//! - Cancellation and deadlines through [`CallContext`]
//! - JSON helpers on top of a fluent [`RequestBuilder`]
//!
//! ## Example
//!
//! ```ignore
//! use roundtrip_client::{Client, LoggingInterceptor, MetricsInterceptor};
//! use std::time::Duration;
//!
//! let client = Client::builder()
//!     .base_url("https://api.example.com")
//!     .timeout(Duration::from_secs(5))
//!     .max_retries(3)
//!     .interceptor(LoggingInterceptor::new())
//!     .interceptor(MetricsInterceptor::new("inventory"))
//!     .build()?;
//!
//! let items: Vec<Item> = client.get_json("/items").await?;
//! ```
//!
//! ## Interceptor Order
//!
//! Interceptors run in the order they were added: the first one sees the
//! request first and the response last. All of them sit outside the retry
//! layer, so a logging interceptor logs one line per call however many
//! attempts the call takes.
//!
//! ```ignore
//! use roundtrip_client::{Client, FnInterceptor, Next, Request};
//!
//! let stamp = FnInterceptor::new(|mut request: Request, next: Next| {
//!     Box::pin(async move {
//!         request.headers_mut().insert("x-request-id", new_request_id());
//!         next.call(request).await
//!     })
//! });
//! let client = Client::builder().interceptor(stamp).build()?;
//! ```
//!
//! ## Retries
//!
//! Retries are off by default. With [`ClientBuilder::max_retries`] set, a
//! call is retried on transport errors, `5xx` and `429`; cancellation and
//! expired deadlines are never retried. The delay before attempt `n + 1` is
//! `min(min_backoff * 2^n, max_backoff)` scaled by a random factor in
//! `[0.75, 1.25]`.
//!
//! ```ignore
//! let client = Client::builder()
//!     .max_retries(4)
//!     .retry_backoff(Duration::from_millis(50), Duration::from_secs(2))
//!     .retry_if(|outcome| matches!(outcome, Ok(r) if r.status() == 503))
//!     .build()?;
//! ```
//!
//! ## Cancellation and Timeouts
//!
//! The client timeout (default 10 seconds) bounds a whole call, backoff waits
//! included. [`RequestBuilder::timeout`] can shorten it for one call and
//! [`RequestBuilder::context`] attaches a caller-owned [`CallContext`]:
//!
//! ```ignore
//! let ctx = CallContext::new();
//! let call = client.get("/slow").context(ctx.clone()).send();
//! ctx.cancel(); // the call returns ClientError::Canceled
//! ```
//!
//! ## TLS
//!
//! The `tls` feature (default) enables rustls with the ring provider and the
//! platform's root certificates. `tls-aws-lc` and `tls-webpki-roots` select
//! the alternatives.

mod builder;
mod chain;
mod client;
mod config;
mod default_client;
mod interceptor;
mod request;
mod response;
mod retry;
pub mod transport;

pub use builder::{ClientBuildError, ClientBuilder, DEFAULT_TIMEOUT};
pub use chain::Pipeline;
pub use client::Client;
pub use config::{
    RetryPolicy, RetryPredicate, capped_backoff, compute_backoff, compute_backoff_with_jitter,
    default_retry_if, defaults,
};
pub use default_client::{default_client, get_json, post_json, set_default_client};
#[cfg(feature = "metrics")]
pub use interceptor::MetricsRecorderSink;
pub use interceptor::{
    FnInterceptor, HeaderInterceptor, Interceptor, InterceptorChain, LoggingInterceptor,
    MetricStatus, MetricsInterceptor, MetricsSink, Next, RequestMetric, TimeoutInterceptor,
    TracingSink,
};
pub use request::RequestBuilder;
pub use response::ResponseHandler;
pub use retry::RetryTransport;
pub use transport::{HyperTransport, HyperTransportBuilder};

pub use roundtrip_core::{
    BoxFuture, CallContext, CancellationToken, ClientError, HeaderMap, Method, Request,
    RequestBody, Response, ResponseBody, SharedTransport, StatusCode, Transport, TransportFn, Uri,
    header,
};
