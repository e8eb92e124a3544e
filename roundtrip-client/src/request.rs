//! Fluent request construction.
//!
//! Errors found while building (bad header, unserializable JSON, malformed
//! URL) are held until [`RequestBuilder::send`] and surface through the
//! returned [`ResponseHandler`].

use std::time::Duration;

use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use roundtrip_core::{CallContext, ClientError, Method, Request, RequestBody, Uri};
use serde::Serialize;
use url::Url;

use crate::client::Client;
use crate::response::ResponseHandler;

/// A request under construction, created by [`Client::request`] and friends.
///
/// # Example
///
/// ```ignore
/// let items: Vec<Item> = client
///     .get("/items")
///     .query("page", "2")
///     .header("x-request-id", "r-123")
///     .timeout(Duration::from_secs(2))
///     .send()
///     .await
///     .json()
///     .await?;
/// ```
#[derive(Debug)]
pub struct RequestBuilder {
    client: Client,
    method: Method,
    url: String,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    body: RequestBody,
    context: Option<CallContext>,
    timeout: Option<Duration>,
    error: Option<ClientError>,
}

impl RequestBuilder {
    pub(crate) fn new(client: Client, method: Method, url: String) -> Self {
        Self {
            client,
            method,
            url,
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: RequestBody::Empty,
            context: None,
            timeout: None,
            error: None,
        }
    }

    fn fail(&mut self, err: ClientError) {
        self.error.get_or_insert(err);
    }

    /// Set a header, replacing any previous value for the name.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (name.parse::<HeaderName>(), value.parse::<HeaderValue>()) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            (Err(_), _) => {
                self.fail(ClientError::InvalidRequest(format!("invalid header name: {name}")))
            }
            (_, Err(_)) => {
                self.fail(ClientError::InvalidRequest(format!("invalid header value for {name}")))
            }
        }
        self
    }

    /// Set every header in `headers`, replacing previous values per name.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        let mut last = None;
        for (name, value) in headers {
            // Subsequent values of a multi-valued name come with `None`.
            match name {
                Some(name) => {
                    self.headers.insert(name.clone(), value);
                    last = Some(name);
                }
                None => {
                    if let Some(name) = &last {
                        self.headers.append(name.clone(), value);
                    }
                }
            }
        }
        self
    }

    /// Append a query parameter. Repeated keys are kept.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append several query parameters.
    pub fn query_pairs<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set the body.
    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = body.into();
        self
    }

    /// Serialize `value` as the JSON body and set `content-type: application/json`.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(data) => {
                self.body = RequestBody::full(data);
                self.headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }
            Err(e) => self.fail(ClientError::Encode(format!("marshal json body: {e}"))),
        }
        self
    }

    /// Attach a context for cancellation and deadlines.
    pub fn context(mut self, context: CallContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Bound this call; the client's own timeout still applies if shorter.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Resolve into the client, the final request and the per-call timeout.
    fn into_parts(self) -> Result<(Client, Request, Option<Duration>), ClientError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let uri = resolve_uri(self.client.base_url(), &self.url, &self.query)?;
        let mut request = Request::new(self.method, uri)
            .with_body(self.body)
            .with_context(self.context.unwrap_or_default());
        *request.headers_mut() = self.headers;
        Ok((self.client, request, self.timeout))
    }

    /// Send the request through the client's pipeline.
    pub async fn send(self) -> ResponseHandler {
        let outcome = match self.into_parts() {
            Ok((client, request, timeout)) => client.execute_with_timeout(request, timeout).await,
            Err(err) => Err(err),
        };
        ResponseHandler::new(outcome)
    }
}

/// Join `url` onto `base` (plain concatenation for relative targets) and
/// append `query`.
fn resolve_uri(base: Option<&Url>, url: &str, query: &[(String, String)]) -> Result<Uri, ClientError> {
    let mut target = match Url::parse(url) {
        Ok(absolute) => absolute,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = base.ok_or_else(|| {
                ClientError::InvalidRequest(format!("relative url {url:?} without a base url"))
            })?;
            let joined = format!(
                "{}/{}",
                base.as_str().trim_end_matches('/'),
                url.trim_start_matches('/')
            );
            Url::parse(&joined)
                .map_err(|e| ClientError::InvalidRequest(format!("parse url {joined:?}: {e}")))?
        }
        Err(e) => return Err(ClientError::InvalidRequest(format!("parse url {url:?}: {e}"))),
    };

    if !query.is_empty() {
        let mut pairs = target.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }

    target
        .as_str()
        .parse::<Uri>()
        .map_err(|e| ClientError::InvalidRequest(format!("invalid uri {:?}: {e}", target.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use roundtrip_core::{Response, SharedTransport, StatusCode, TransportFn};
    use std::sync::{Arc, Mutex};

    fn client_with(base_url: Option<&str>) -> (Client, Arc<Mutex<Vec<Request>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let transport: SharedTransport = TransportFn::shared(move |request: Request| {
            seen_clone.lock().unwrap().push(request);
            async { Ok(Response::new(StatusCode::OK)) }
        });
        let mut builder = Client::builder()
            .header("x-default", "1")
            .shared_transport(transport);
        if let Some(base_url) = base_url {
            builder = builder.base_url(base_url);
        }
        (builder.build().unwrap(), seen)
    }

    #[test]
    fn test_resolve_uri_with_base_and_query() {
        let base = Url::parse("http://localhost:8080/api").unwrap();
        let query = vec![
            ("q".to_string(), "a b".to_string()),
            ("tag".to_string(), "x".to_string()),
            ("tag".to_string(), "y".to_string()),
        ];
        let uri = resolve_uri(Some(&base), "/search", &query).unwrap();
        assert_eq!(uri, "http://localhost:8080/api/search?q=a+b&tag=x&tag=y");
    }

    #[test]
    fn test_resolve_uri_absolute_ignores_base() {
        let base = Url::parse("http://localhost:8080").unwrap();
        let uri = resolve_uri(Some(&base), "https://example.com/x?y=1", &[]).unwrap();
        assert_eq!(uri, "https://example.com/x?y=1");
    }

    #[test]
    fn test_resolve_uri_relative_without_base() {
        let err = resolve_uri(None, "/items", &[]).unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_send_builds_request() {
        let (client, seen) = client_with(Some("http://localhost:8080"));

        let handler = client
            .post("/items")
            .query("dry_run", "true")
            .header("x-request-id", "r-1")
            .json(&serde_json::json!({"name": "widget"}))
            .send()
            .await;
        assert_eq!(handler.status(), Some(StatusCode::OK));

        let seen = seen.lock().unwrap();
        let request = &seen[0];
        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.uri(), "http://localhost:8080/items?dry_run=true");
        assert_eq!(request.headers()["x-request-id"], "r-1");
        assert_eq!(request.headers()["x-default"], "1");
        assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
        match request.body() {
            RequestBody::Full(data) => assert_eq!(&data[..], br#"{"name":"widget"}"#),
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_builder_error_deferred_to_send() {
        let (client, seen) = client_with(None);

        let err = client
            .get("http://localhost/")
            .header("bad header", "v")
            .header("x-ok", "1")
            .send()
            .await
            .raw()
            .unwrap_err();

        assert!(matches!(err, ClientError::InvalidRequest(_)));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_headers_map_replaces_per_name() {
        let (client, _seen) = client_with(None);
        let mut extra = HeaderMap::new();
        extra.append("x-multi", HeaderValue::from_static("a"));
        extra.append("x-multi", HeaderValue::from_static("b"));

        let (_client, request, _timeout) = client
            .get("http://localhost/")
            .header("x-multi", "old")
            .headers(extra)
            .into_parts()
            .unwrap();

        let values: Vec<&str> = request
            .headers()
            .get_all("x-multi")
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(values, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_context_is_attached() {
        let (client, _seen) = client_with(None);
        let ctx = CallContext::new();
        let (_client, request, _timeout) = client
            .get("http://localhost/")
            .context(ctx.clone())
            .into_parts()
            .unwrap();

        ctx.cancel();
        assert!(matches!(request.context().err(), Some(ClientError::Canceled)));
    }
}
