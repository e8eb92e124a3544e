//! Request and response values passed through the pipeline.

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, StatusCode, Uri};

use crate::{CallContext, ClientError, RequestBody, ResponseBody, TransportBody};

/// An outbound request.
///
/// Cloning a request is cheap: the body is either empty, a shared buffer, or a
/// shared factory, and the context shares its cancellation token.
#[derive(Clone, Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: RequestBody,
    context: CallContext,
}

impl Request {
    /// Create a request with no headers, an empty body and a fresh context.
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            context: CallContext::new(),
        }
    }

    /// Create a request from a method and a string target.
    pub fn try_new(method: Method, uri: &str) -> Result<Self, ClientError> {
        let uri = uri
            .parse::<Uri>()
            .map_err(|e| ClientError::InvalidRequest(format!("invalid uri {uri:?}: {e}")))?;
        Ok(Self::new(method, uri))
    }

    /// Set a header, replacing existing values.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replace the body.
    pub fn with_body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = body.into();
        self
    }

    /// Replace the call context.
    pub fn with_context(mut self, context: CallContext) -> Self {
        self.context = context;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn context(&self) -> &CallContext {
        &self.context
    }

    /// Build the `http::Request` for one attempt, opening a fresh body.
    pub fn to_http(&self) -> Result<http::Request<TransportBody>, ClientError> {
        let mut builder = http::Request::builder()
            .method(self.method.clone())
            .uri(self.uri.clone());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(self.headers.clone());
        }
        builder
            .body(self.body.open())
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))
    }
}

/// A received response.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: ResponseBody,
}

impl Response {
    /// Create a response with the given status, no headers and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: ResponseBody::empty(),
        }
    }

    /// Convert an `http::Response` whose body is already a [`ResponseBody`].
    pub fn from_http(response: http::Response<ResponseBody>) -> Self {
        let (parts, body) = response.into_parts();
        Self {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }

    /// Set a header, replacing existing values.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replace the body. The previous body is closed.
    pub fn with_body(mut self, body: ResponseBody) -> Self {
        self.body = body;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body_mut(&mut self) -> &mut ResponseBody {
        &mut self.body
    }

    /// Take ownership of the body.
    pub fn into_body(self) -> ResponseBody {
        self.body
    }

    /// Split into status, headers and body.
    pub fn into_parts(self) -> (StatusCode, HeaderMap, ResponseBody) {
        (self.status, self.headers, self.body)
    }

    /// Close the body without reading it.
    pub fn close(self) {
        self.body.close();
    }
}
