//! Hyper-based base transport.
//!
//! [`HyperTransport`] sends requests with hyper_util's pooled legacy client.

use std::time::Duration;

use http_body_util::BodyExt;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::{TokioExecutor, TokioTimer};
use roundtrip_core::{
    BoxFuture, ClientError, Request, Response, ResponseBody, Transport, TransportBody,
};
use rustls::ClientConfig;

use super::connector::{build_http_connector, build_https_connector, default_tls_config};
use crate::builder::ClientBuildError;

/// Default configuration values.
pub mod defaults {
    use std::time::Duration;

    /// Maximum idle connections kept per host.
    pub const POOL_MAX_IDLE_PER_HOST: usize = 10;

    /// Idle connections older than this are closed.
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// TCP connect timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// TCP keep-alive interval.
    pub const TCP_KEEPALIVE: Duration = Duration::from_secs(30);
}

type HyperClient = Client<HttpsConnector<HttpConnector>, TransportBody>;

/// HTTP transport using hyper_util's legacy client.
///
/// HTTP/1.1 and HTTP/2 with TLS, connection pooling and ALPN negotiation.
/// Each call opens a fresh request body and races the exchange against the
/// request's context, so a canceled or expired call returns at once and the
/// in-flight connection is dropped.
///
/// # Example
///
/// ```ignore
/// use roundtrip_client::HyperTransport;
/// use std::time::Duration;
///
/// let transport = HyperTransport::builder()
///     .pool_max_idle_per_host(32)
///     .connect_timeout(Duration::from_secs(5))
///     .build()?;
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    client: HyperClient,
    http2_only: bool,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("http2_only", &self.http2_only)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::new()
    }

    /// Create a transport with default settings.
    pub fn new() -> Result<Self, ClientBuildError> {
        Self::builder().build()
    }

    pub fn is_http2_only(&self) -> bool {
        self.http2_only
    }

    async fn send(&self, request: Request) -> Result<Response, ClientError> {
        let ctx = request.context().clone();
        if let Some(err) = ctx.err() {
            return Err(err);
        }

        let http_request = request.to_http()?;
        let response = tokio::select! {
            biased;
            err = ctx.done() => return Err(err),
            result = self.client.request(http_request) => {
                result.map_err(|e| ClientError::transport(error_chain(&e)))?
            }
        };

        let (parts, body) = response.into_parts();
        let body = ResponseBody::new(body.map_err(ClientError::transport));
        Ok(Response::from_http(http::Response::from_parts(parts, body)))
    }
}

impl Transport for HyperTransport {
    fn round_trip(&self, request: Request) -> BoxFuture<'_, Result<Response, ClientError>> {
        Box::pin(self.send(request))
    }
}

/// Render an error with its sources, e.g.
/// `client error (Connect): tcp connect error: Connection refused`.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Builder for [`HyperTransport`].
pub struct HyperTransportBuilder {
    tls_config: Option<ClientConfig>,
    http2_only: bool,
    pool_idle_timeout: Option<Duration>,
    pool_max_idle_per_host: usize,
    connect_timeout: Option<Duration>,
    tcp_keepalive: Option<Duration>,
}

impl Default for HyperTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperTransportBuilder {
    pub fn new() -> Self {
        Self {
            tls_config: None,
            http2_only: false,
            pool_idle_timeout: Some(defaults::POOL_IDLE_TIMEOUT),
            pool_max_idle_per_host: defaults::POOL_MAX_IDLE_PER_HOST,
            connect_timeout: Some(defaults::CONNECT_TIMEOUT),
            tcp_keepalive: Some(defaults::TCP_KEEPALIVE),
        }
    }

    /// Use a custom TLS configuration instead of the feature-selected default.
    pub fn tls_config(mut self, config: ClientConfig) -> Self {
        self.tls_config = Some(config);
        self
    }

    /// Speak HTTP/2 without negotiation (h2c for `http://` targets).
    pub fn http2_only(mut self, enabled: bool) -> Self {
        self.http2_only = enabled;
        self
    }

    /// Close pooled connections idle for longer than `timeout`.
    ///
    /// Default: 90 seconds.
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Keep idle pooled connections indefinitely.
    pub fn pool_idle_timeout_none(mut self) -> Self {
        self.pool_idle_timeout = None;
        self
    }

    /// Default: 10.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Default: 30 seconds.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Default: 30 seconds.
    pub fn tcp_keepalive(mut self, interval: Duration) -> Self {
        self.tcp_keepalive = Some(interval);
        self
    }

    pub fn build(self) -> Result<HyperTransport, ClientBuildError> {
        let tls_config = match self.tls_config {
            Some(config) => config,
            None => default_tls_config()?,
        };

        let http = build_http_connector(self.connect_timeout, self.tcp_keepalive);
        let https = build_https_connector(http, tls_config);

        let mut builder = Client::builder(TokioExecutor::new());
        // Required for pool_idle_timeout to take effect.
        builder.pool_timer(TokioTimer::new());
        builder.pool_idle_timeout(self.pool_idle_timeout);
        builder.pool_max_idle_per_host(self.pool_max_idle_per_host);
        if self.http2_only {
            builder.http2_only(true);
        }

        Ok(HyperTransport {
            client: builder.build(https),
            http2_only: self.http2_only,
        })
    }
}

impl std::fmt::Debug for HyperTransportBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransportBuilder")
            .field("tls_config", &self.tls_config.is_some())
            .field("http2_only", &self.http2_only)
            .field("pool_idle_timeout", &self.pool_idle_timeout)
            .field("pool_max_idle_per_host", &self.pool_max_idle_per_host)
            .field("connect_timeout", &self.connect_timeout)
            .field("tcp_keepalive", &self.tcp_keepalive)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = HyperTransportBuilder::new();
        assert!(!builder.http2_only);
        assert_eq!(builder.pool_max_idle_per_host, 10);
        assert_eq!(builder.pool_idle_timeout, Some(Duration::from_secs(90)));
        assert_eq!(builder.connect_timeout, Some(Duration::from_secs(30)));
        assert_eq!(builder.tcp_keepalive, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_builder_pool_settings() {
        let builder = HyperTransportBuilder::new()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(4)
            .connect_timeout(Duration::from_secs(2))
            .http2_only(true);
        assert_eq!(builder.pool_idle_timeout, Some(Duration::from_secs(60)));
        assert_eq!(builder.pool_max_idle_per_host, 4);
        assert_eq!(builder.connect_timeout, Some(Duration::from_secs(2)));
        assert!(builder.http2_only);

        let builder = builder.pool_idle_timeout_none();
        assert_eq!(builder.pool_idle_timeout, None);
    }

    #[cfg(all(
        any(feature = "tls-ring", feature = "tls-aws-lc"),
        any(feature = "tls-native-roots", feature = "tls-webpki-roots")
    ))]
    mod live {
        use super::*;
        use axum::{Router, routing::get, routing::post};
        use http::Method;
        use roundtrip_core::{CallContext, StatusCode};

        async fn serve(app: Router) -> String {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            format!("http://{addr}")
        }

        #[tokio::test]
        async fn test_round_trip_against_server() {
            let app = Router::new()
                .route("/echo", post(|body: String| async move { body }))
                .route("/missing", get(|| async { StatusCode::NOT_FOUND }));
            let base = serve(app).await;
            let transport = HyperTransport::new().unwrap();

            let request = Request::try_new(Method::POST, &format!("{base}/echo"))
                .unwrap()
                .with_body("ping");
            let response = transport.round_trip(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.into_body().collect_bytes().await.unwrap(), "ping");

            let request = Request::try_new(Method::GET, &format!("{base}/missing")).unwrap();
            let response = transport.round_trip(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }

        #[tokio::test]
        async fn test_connection_refused_is_transport_error() {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            drop(listener);

            let transport = HyperTransport::new().unwrap();
            let request = Request::try_new(Method::GET, &format!("http://{addr}/")).unwrap();
            let err = transport.round_trip(request).await.unwrap_err();
            assert!(err.is_transport(), "{err:?}");
        }

        #[tokio::test]
        async fn test_deadline_aborts_slow_exchange() {
            let app = Router::new().route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    "late"
                }),
            );
            let base = serve(app).await;
            let transport = HyperTransport::new().unwrap();

            let ctx = CallContext::new().with_timeout(Duration::from_millis(100));
            let request = Request::try_new(Method::GET, &format!("{base}/slow"))
                .unwrap()
                .with_context(ctx);
            let err = transport.round_trip(request).await.unwrap_err();
            assert!(matches!(err, ClientError::DeadlineExceeded));
        }
    }
}
