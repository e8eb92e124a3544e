//! Client builder.
//!
//! Provides a fluent API for configuring and building a [`Client`].

use std::sync::Arc;
use std::time::Duration;

use http::header::{HeaderMap, HeaderName, HeaderValue};
use roundtrip_core::{ClientError, Response, SharedTransport, Transport};
use url::Url;

use crate::chain::Pipeline;
use crate::client::Client;
use crate::config::RetryPolicy;
use crate::interceptor::{Interceptor, InterceptorChain};
use crate::transport::HyperTransportBuilder;

/// Default overall timeout for a call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Builder for creating a [`Client`].
///
/// # Example
///
/// ```ignore
/// use roundtrip_client::{Client, LoggingInterceptor};
/// use std::time::Duration;
///
/// let client = Client::builder()
///     .base_url("https://api.example.com")
///     .timeout(Duration::from_secs(5))
///     .max_retries(3)
///     .retry_backoff(Duration::from_millis(50), Duration::from_secs(2))
///     .header("user-agent", "inventory-sync/1.0")
///     .interceptor(LoggingInterceptor::new())
///     .build()?;
/// ```
pub struct ClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    retry: RetryPolicy,
    headers: HeaderMap,
    interceptors: InterceptorChain,
    transport: Option<SharedTransport>,
    hyper: HyperTransportBuilder,
    error: Option<ClientBuildError>,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("headers", &self.headers)
            .field("interceptors", &self.interceptors)
            .field("transport", &self.transport.is_some())
            .field("hyper", &self.hyper)
            .finish()
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout: Some(DEFAULT_TIMEOUT),
            retry: RetryPolicy::default(),
            headers: HeaderMap::new(),
            interceptors: InterceptorChain::new(),
            transport: None,
            hyper: HyperTransportBuilder::new(),
            error: None,
        }
    }

    /// Prefix for relative request URLs.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Overall timeout for a call, covering every attempt and backoff wait.
    ///
    /// Default: 10 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Disable the overall timeout.
    pub fn no_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Number of extra attempts for retryable outcomes. Default: 0.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.retry = self.retry.max_retries(max_retries);
        self
    }

    /// Backoff bounds between attempts. Default: 100ms to 5s.
    pub fn retry_backoff(mut self, min_backoff: Duration, max_backoff: Duration) -> Self {
        self.retry = self.retry.backoff(min_backoff, max_backoff);
        self
    }

    /// Replace the retry predicate.
    pub fn retry_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Result<Response, ClientError>) -> bool + Send + Sync + 'static,
    {
        self.retry = self.retry.retry_if(predicate);
        self
    }

    /// Replace the whole retry policy.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Set a header sent with every request unless the request sets it.
    /// A later call with the same name replaces the earlier value.
    ///
    /// An invalid name or value is reported by [`build`](Self::build).
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (name.parse::<HeaderName>(), value.parse::<HeaderValue>()) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => {
                self.error.get_or_insert(ClientBuildError::InvalidHeader(name.to_string()));
            }
        }
        self
    }

    /// Set default headers from a map, replacing earlier values per name.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        for name in headers.keys() {
            self.headers.remove(name);
            for value in headers.get_all(name) {
                self.headers.append(name.clone(), value.clone());
            }
        }
        self
    }

    /// Append an interceptor. The first one added is outermost.
    pub fn interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Append an already shared interceptor.
    pub fn interceptor_arc(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Use `transport` as the base transport instead of [`HyperTransport`](crate::HyperTransport).
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Use an already shared base transport.
    pub fn shared_transport(mut self, transport: SharedTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Configure the default hyper transport. Ignored when a custom transport is set.
    pub fn hyper(mut self, hyper: HyperTransportBuilder) -> Self {
        self.hyper = hyper;
        self
    }

    /// Force HTTP/2 on the default hyper transport.
    pub fn http2_only(mut self, enabled: bool) -> Self {
        self.hyper = self.hyper.http2_only(enabled);
        self
    }

    /// TCP keep-alive for the default hyper transport.
    pub fn tcp_keepalive(mut self, interval: Duration) -> Self {
        self.hyper = self.hyper.tcp_keepalive(interval);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<Client, ClientBuildError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        self.retry
            .validate()
            .map_err(ClientBuildError::InvalidRetryPolicy)?;

        let base_url = self
            .base_url
            .map(|raw| {
                Url::parse(&raw).map_err(|e| ClientBuildError::InvalidBaseUrl {
                    url: raw.clone(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let base: SharedTransport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(self.hyper.build()?),
        };
        let pipeline = Pipeline::build(base, &self.retry, &self.interceptors);

        tracing::debug!(
            base_url = ?base_url.as_ref().map(Url::as_str),
            timeout = ?self.timeout,
            max_retries = self.retry.max_retries,
            interceptors = self.interceptors.len(),
            "built client"
        );

        Ok(Client::from_parts(
            pipeline,
            self.retry,
            self.interceptors,
            self.headers,
            self.timeout,
            base_url,
        ))
    }
}

/// Error building a client.
#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    /// No usable TLS configuration.
    #[error("TLS configuration failed: {0}")]
    Tls(String),

    #[error("invalid base url {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("invalid retry policy: {0}")]
    InvalidRetryPolicy(&'static str),
}

impl From<ClientBuildError> for ClientError {
    fn from(err: ClientBuildError) -> Self {
        ClientError::Config(err.to_string())
    }
}
