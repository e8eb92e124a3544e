//! Interceptors for the roundtrip client.
//!
//! Interceptors add cross-cutting logic around every request, such as:
//! - Adding authentication headers
//! - Logging and metrics
//! - Per-request timeouts
//!
//! An interceptor receives the "next" transport and returns a new transport
//! with the same contract. Interceptors are applied in declaration order: the
//! first one declared sees the request first and the response last.
//!
//! # Example
//!
//! ```ignore
//! use roundtrip_client::{Client, HeaderInterceptor, LoggingInterceptor};
//!
//! let client = Client::builder()
//!     .interceptor(LoggingInterceptor::new())
//!     .interceptor(HeaderInterceptor::new("authorization", "Bearer token123")?)
//!     .build()?;
//! ```

mod logging;
mod metrics;
mod timeout;

use std::sync::Arc;

use http::header::{HeaderName, HeaderValue};
use roundtrip_core::{
    BoxFuture, ClientError, Request, Response, SharedTransport, Transport, TransportFn,
};

pub use logging::LoggingInterceptor;
#[cfg(feature = "metrics")]
pub use self::metrics::MetricsRecorderSink;
pub use self::metrics::{MetricStatus, MetricsInterceptor, MetricsSink, RequestMetric, TracingSink};
pub use timeout::TimeoutInterceptor;
pub(crate) use timeout::run_with_timeout;

/// Wraps a transport with additional behavior.
///
/// Implementations return a transport that, when invoked, runs its own logic
/// and delegates to `next` (or short-circuits without calling it).
pub trait Interceptor: Send + Sync {
    fn wrap(&self, next: SharedTransport) -> SharedTransport;
}

impl<T: Interceptor + ?Sized> Interceptor for Arc<T> {
    fn wrap(&self, next: SharedTransport) -> SharedTransport {
        (**self).wrap(next)
    }
}

/// An ordered list of interceptors.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("count", &self.interceptors.len())
            .finish()
    }
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an interceptor to the end of the chain.
    pub fn push(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.push(interceptor);
    }

    /// Append every interceptor from `other`, keeping their order.
    pub fn extend(&mut self, other: impl IntoIterator<Item = Arc<dyn Interceptor>>) {
        self.interceptors.extend(other);
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Interceptor>> {
        self.interceptors.iter()
    }
}

impl Interceptor for InterceptorChain {
    /// Applies interceptors in reverse so the first one declared is outermost.
    fn wrap(&self, next: SharedTransport) -> SharedTransport {
        let mut wrapped = next;
        for interceptor in self.interceptors.iter().rev() {
            wrapped = interceptor.wrap(wrapped);
        }
        wrapped
    }
}

impl FromIterator<Arc<dyn Interceptor>> for InterceptorChain {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Interceptor>>>(iter: I) -> Self {
        Self {
            interceptors: iter.into_iter().collect(),
        }
    }
}

/// Sets a fixed header on every outgoing request.
#[derive(Clone, Debug)]
pub struct HeaderInterceptor {
    name: HeaderName,
    value: HeaderValue,
}

impl HeaderInterceptor {
    /// Create a header interceptor, returning an error if the name or value is invalid.
    pub fn new(name: &str, value: &str) -> Result<Self, ClientError> {
        let name = name
            .parse()
            .map_err(|_| ClientError::InvalidRequest(format!("invalid header name: {name}")))?;
        let value = value
            .parse()
            .map_err(|_| ClientError::InvalidRequest(format!("invalid header value: {value}")))?;
        Ok(Self { name, value })
    }

    pub fn from_parts(name: HeaderName, value: HeaderValue) -> Self {
        Self { name, value }
    }
}

impl Interceptor for HeaderInterceptor {
    fn wrap(&self, next: SharedTransport) -> SharedTransport {
        let name = self.name.clone();
        let value = self.value.clone();
        TransportFn::shared(move |mut request: Request| {
            request.headers_mut().insert(name.clone(), value.clone());
            let next = next.clone();
            async move { next.round_trip(request).await }
        })
    }
}

/// The remainder of the pipeline, handed to [`FnInterceptor`] closures.
#[derive(Clone)]
pub struct Next {
    inner: SharedTransport,
}

impl Next {
    pub(crate) fn new(inner: SharedTransport) -> Self {
        Self { inner }
    }

    /// Proceed to the next interceptor or the base transport.
    pub async fn call(self, request: Request) -> Result<Response, ClientError> {
        self.inner.round_trip(request).await
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

/// A closure-based interceptor.
///
/// # Example
///
/// ```ignore
/// use roundtrip_client::{FnInterceptor, Next};
/// use roundtrip_core::Request;
///
/// let tagging = FnInterceptor::new(|mut request: Request, next: Next| {
///     Box::pin(async move {
///         request.headers_mut().insert("x-request-source", "batch".parse().unwrap());
///         next.call(request).await
///     })
/// });
/// ```
pub struct FnInterceptor<F> {
    func: Arc<F>,
}

impl<F> FnInterceptor<F>
where
    F: Fn(Request, Next) -> BoxFuture<'static, Result<Response, ClientError>> + Send + Sync + 'static,
{
    pub fn new(func: F) -> Self {
        Self {
            func: Arc::new(func),
        }
    }
}

impl<F> Interceptor for FnInterceptor<F>
where
    F: Fn(Request, Next) -> BoxFuture<'static, Result<Response, ClientError>> + Send + Sync + 'static,
{
    fn wrap(&self, next: SharedTransport) -> SharedTransport {
        let func = self.func.clone();
        TransportFn::shared(move |request: Request| func(request, Next::new(next.clone())))
    }
}

impl<F> Clone for FnInterceptor<F> {
    fn clone(&self) -> Self {
        Self {
            func: self.func.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roundtrip_core::{Method, StatusCode};
    use std::sync::Mutex;

    type Captured = Arc<Mutex<Option<http::HeaderMap>>>;

    fn capturing_transport() -> (SharedTransport, Captured) {
        let captured: Captured = Arc::new(Mutex::new(None));
        let captured_clone = captured.clone();
        let transport = TransportFn::shared(move |request: Request| {
            *captured_clone.lock().unwrap() = Some(request.headers().clone());
            async { Ok(Response::new(StatusCode::OK)) }
        });
        (transport, captured)
    }

    fn marker(value: &'static str) -> Arc<dyn Interceptor> {
        Arc::new(FnInterceptor::new(move |mut request: Request, next: Next| {
            Box::pin(async move {
                request
                    .headers_mut()
                    .append("x-trace", HeaderValue::from_static(value));
                next.call(request).await
            })
        }))
    }

    fn request() -> Request {
        Request::try_new(Method::GET, "http://localhost/").unwrap()
    }

    #[test]
    fn test_header_interceptor_rejects_invalid_name() {
        assert!(HeaderInterceptor::new("bad header", "v").is_err());
        assert!(HeaderInterceptor::new("x-ok", "bad\nvalue").is_err());
    }

    #[test]
    fn test_interceptor_chain_push() {
        let mut chain = InterceptorChain::new();
        assert!(chain.is_empty());
        chain.push(Arc::new(HeaderInterceptor::new("x-test", "value").unwrap()));
        assert!(!chain.is_empty());
        assert_eq!(chain.len(), 1);
    }

    #[tokio::test]
    async fn test_header_interceptor() {
        let (transport, captured) = capturing_transport();
        let wrapped = HeaderInterceptor::new("x-auth", "bearer-token")
            .unwrap()
            .wrap(transport);

        wrapped.round_trip(request()).await.unwrap();

        let headers = captured.lock().unwrap().take().unwrap();
        assert_eq!(headers.get("x-auth").unwrap(), "bearer-token");
    }

    #[tokio::test]
    async fn test_chain_order_first_declared_is_outermost() {
        let (transport, captured) = capturing_transport();
        let chain: InterceptorChain = [marker("A"), marker("B")].into_iter().collect();

        chain.wrap(transport).round_trip(request()).await.unwrap();

        let headers = captured.lock().unwrap().take().unwrap();
        let trace: Vec<&str> = headers
            .get_all("x-trace")
            .iter()
            .map(|value| value.to_str().unwrap())
            .collect();
        assert_eq!(trace, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_fn_interceptor_can_short_circuit() {
        let (transport, captured) = capturing_transport();
        let deny = FnInterceptor::new(|_request: Request, _next: Next| {
            Box::pin(async { Ok(Response::new(StatusCode::FORBIDDEN)) })
        });

        let response = deny.wrap(transport).round_trip(request()).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(captured.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_chain_is_identity() {
        let (transport, captured) = capturing_transport();
        let wrapped = InterceptorChain::new().wrap(transport);
        let response = wrapped.round_trip(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(captured.lock().unwrap().is_some());
    }
}
