//! The HTTP client.
//!
//! A [`Client`] owns a composed [`Pipeline`] plus the settings applied around
//! it on every call: default headers, the overall timeout and the base URL
//! used by the [`RequestBuilder`].

use std::sync::Arc;
use std::time::Duration;

use http::HeaderMap;
use roundtrip_core::{BoxFuture, ClientError, Method, Request, Response, Transport};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::builder::{ClientBuildError, ClientBuilder};
use crate::chain::Pipeline;
use crate::config::RetryPolicy;
use crate::interceptor::{Interceptor, InterceptorChain, run_with_timeout};
use crate::request::RequestBuilder;

/// HTTP client with retry and an ordered interceptor pipeline.
///
/// Cloning is cheap and clones share the underlying connection pool.
///
/// # Example
///
/// ```ignore
/// use roundtrip_client::Client;
///
/// let client = Client::builder()
///     .base_url("http://localhost:3000")
///     .max_retries(2)
///     .build()?;
///
/// let user: User = client.get_json("/users/1").await?;
/// ```
#[derive(Clone)]
pub struct Client {
    pipeline: Pipeline,
    retry: RetryPolicy,
    interceptors: InterceptorChain,
    headers: Arc<HeaderMap>,
    timeout: Option<Duration>,
    base_url: Option<Url>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("interceptors", &self.interceptors)
            .field("headers", &self.headers)
            .finish()
    }
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a client with default settings over the hyper transport.
    pub fn new() -> Result<Self, ClientBuildError> {
        ClientBuilder::new().build()
    }

    pub(crate) fn from_parts(
        pipeline: Pipeline,
        retry: RetryPolicy,
        interceptors: InterceptorChain,
        headers: HeaderMap,
        timeout: Option<Duration>,
        base_url: Option<Url>,
    ) -> Self {
        Self {
            pipeline,
            retry,
            interceptors,
            headers: Arc::new(headers),
            timeout,
            base_url,
        }
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn default_headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a client with `interceptor` appended, rebuilt from the base transport.
    pub fn with_interceptor(self, interceptor: impl Interceptor + 'static) -> Self {
        self.with_interceptors([Arc::new(interceptor) as Arc<dyn Interceptor>])
    }

    /// Returns a client with `interceptors` appended in order, rebuilt from
    /// the base transport.
    pub fn with_interceptors(
        mut self,
        interceptors: impl IntoIterator<Item = Arc<dyn Interceptor>>,
    ) -> Self {
        self.interceptors.extend(interceptors);
        self.pipeline = self.pipeline.rebuild(&self.retry, &self.interceptors);
        self
    }

    /// Returns a client with a different retry policy, rebuilt from the base transport.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Result<Self, ClientBuildError> {
        policy.validate().map_err(ClientBuildError::InvalidRetryPolicy)?;
        self.retry = policy;
        self.pipeline = self.pipeline.rebuild(&self.retry, &self.interceptors);
        Ok(self)
    }

    /// Returns a client with a different overall timeout.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let mut client = self.clone();
        client.timeout = Some(timeout);
        client
    }

    /// Returns a client with a different base URL.
    pub fn with_base_url(&self, base_url: &str) -> Result<Self, ClientBuildError> {
        let url = Url::parse(base_url).map_err(|e| ClientBuildError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        let mut client = self.clone();
        client.base_url = Some(url);
        Ok(client)
    }

    /// Start building a request.
    pub fn request(&self, method: Method, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(self.clone(), method, url.into())
    }

    pub fn get(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    pub fn post(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    pub fn put(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::PUT, url)
    }

    pub fn delete(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::DELETE, url)
    }

    /// GET `url` and decode a JSON response.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ClientError> {
        self.get(url).send().await.json().await
    }

    /// POST `body` as JSON to `url` and decode a JSON response.
    pub async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.post(url).json(body).send().await.json().await
    }

    /// PUT `body` as JSON to `url` and decode a JSON response.
    pub async fn put_json<B, T>(&self, url: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.put(url).json(body).send().await.json().await
    }

    /// DELETE `url` and decode a JSON response.
    pub async fn delete_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ClientError> {
        self.delete(url).send().await.json().await
    }

    /// Send `request` through the pipeline.
    ///
    /// Default headers are added for names the request does not set. The
    /// overall timeout bounds the whole call including retries; a deadline
    /// already on the request still applies if it is earlier. Reading the
    /// response body afterwards is not bounded by the timeout.
    pub async fn execute(&self, request: Request) -> Result<Response, ClientError> {
        self.execute_with_timeout(request, None).await
    }

    pub(crate) async fn execute_with_timeout(
        &self,
        mut request: Request,
        timeout: Option<Duration>,
    ) -> Result<Response, ClientError> {
        merge_default_headers(request.headers_mut(), &self.headers);

        let timeout = match (self.timeout, timeout) {
            (Some(client), Some(call)) => Some(client.min(call)),
            (client, call) => client.or(call),
        };
        match timeout {
            Some(timeout) => run_with_timeout(&self.pipeline, request, timeout).await,
            None => self.pipeline.round_trip(request).await,
        }
    }
}

impl Transport for Client {
    fn round_trip(&self, request: Request) -> BoxFuture<'_, Result<Response, ClientError>> {
        Box::pin(self.execute(request))
    }
}

/// Add each default header whose name the request does not already carry.
fn merge_default_headers(headers: &mut HeaderMap, defaults: &HeaderMap) {
    for name in defaults.keys() {
        if headers.contains_key(name) {
            continue;
        }
        for value in defaults.get_all(name) {
            headers.append(name.clone(), value.clone());
        }
    }
}
