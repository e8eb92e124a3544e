//! Response handling.
//!
//! [`ResponseHandler`] turns the outcome of a call into bytes, text or a
//! decoded JSON value. A non-2xx status becomes [`ClientError::Status`]
//! carrying the response body. Every terminal method consumes the body, which
//! closes it.

use bytes::Bytes;
use roundtrip_core::{ClientError, Response, StatusCode};
use serde::de::DeserializeOwned;

/// The outcome of [`RequestBuilder::send`](crate::RequestBuilder::send).
#[derive(Debug)]
pub struct ResponseHandler {
    outcome: Result<Response, ClientError>,
}

impl ResponseHandler {
    pub fn new(outcome: Result<Response, ClientError>) -> Self {
        Self { outcome }
    }

    /// The response status, or `None` if the call failed.
    pub fn status(&self) -> Option<StatusCode> {
        self.outcome.as_ref().ok().map(Response::status)
    }

    /// Returns true if a response arrived with a 2xx status.
    pub fn is_success(&self) -> bool {
        self.status().is_some_and(|status| status.is_success())
    }

    /// The raw response, whatever its status. The caller owns the body.
    pub fn raw(self) -> Result<Response, ClientError> {
        self.outcome
    }

    /// Read the body of a 2xx response.
    pub async fn bytes(self) -> Result<Bytes, ClientError> {
        let response = self.outcome?;
        let status = response.status();
        if !status.is_success() {
            // The status is the error; a body read failure only loses detail.
            let body = response.into_body().collect_bytes().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }
        response.into_body().collect_bytes().await
    }

    /// Read the body of a 2xx response as UTF-8 text.
    pub async fn text(self) -> Result<String, ClientError> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| ClientError::Decode(format!("response body is not utf-8: {e}")))
    }

    /// Decode the body of a 2xx response as JSON.
    ///
    /// An empty body decodes as JSON `null`, so `()` and `Option<T>` accept
    /// bodiless responses such as `204 No Content`.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T, ClientError> {
        let bytes = self.bytes().await?;
        let input: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
        serde_json::from_slice(input)
            .map_err(|e| ClientError::Decode(format!("decode json response: {e}")))
    }
}

impl From<Result<Response, ClientError>> for ResponseHandler {
    fn from(outcome: Result<Response, ClientError>) -> Self {
        Self::new(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roundtrip_core::ResponseBody;
    use serde::Deserialize;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn handler(status: StatusCode, body: &'static str) -> ResponseHandler {
        ResponseHandler::new(Ok(Response::new(status).with_body(ResponseBody::full(body))))
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
    }

    #[tokio::test]
    async fn test_json_success() {
        let item: Item = handler(StatusCode::OK, r#"{"id":3}"#).json().await.unwrap();
        assert_eq!(item, Item { id: 3 });
    }

    #[tokio::test]
    async fn test_non_2xx_becomes_status_error_with_body() {
        let err = handler(StatusCode::NOT_FOUND, "no such item")
            .json::<Item>()
            .await
            .unwrap_err();

        assert!(err.is_status(404));
        assert_eq!(err.body().map(|b| &b[..]), Some(&b"no such item"[..]));
        assert_eq!(err.to_string(), "http 404: no such item");
    }

    #[tokio::test]
    async fn test_empty_body_decodes_as_null() {
        handler(StatusCode::NO_CONTENT, "").json::<()>().await.unwrap();
        let missing: Option<Item> = handler(StatusCode::OK, "").json().await.unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn test_decode_error() {
        let err = handler(StatusCode::OK, "not json").json::<Item>().await.unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[tokio::test]
    async fn test_text_and_status() {
        let handler = handler(StatusCode::CREATED, "made");
        assert_eq!(handler.status(), Some(StatusCode::CREATED));
        assert!(handler.is_success());
        assert_eq!(handler.text().await.unwrap(), "made");
    }

    #[tokio::test]
    async fn test_transport_error_passes_through() {
        let handler = ResponseHandler::new(Err(ClientError::transport("refused")));
        assert_eq!(handler.status(), None);
        assert!(!handler.is_success());
        assert!(handler.bytes().await.unwrap_err().is_transport());
    }

    #[tokio::test]
    async fn test_body_closed_after_read() {
        let closed = Arc::new(AtomicBool::new(false));
        let closed_clone = closed.clone();
        let body = ResponseBody::full("x").on_close(move || closed_clone.store(true, Ordering::SeqCst));
        let handler = ResponseHandler::new(Ok(Response::new(StatusCode::BAD_GATEWAY).with_body(body)));

        let _ = handler.bytes().await;
        assert!(closed.load(Ordering::SeqCst));
    }
}
