//! Client error types.
//!
//! This module provides [`ClientError`], the single error type carried through
//! the request pipeline, the request builder and the response handler.

use bytes::Bytes;
use http::StatusCode;

/// Errors produced while executing an outbound request.
///
/// Only [`Transport`](ClientError::Transport), [`Canceled`](ClientError::Canceled)
/// and [`DeadlineExceeded`](ClientError::DeadlineExceeded) are produced by the
/// pipeline itself. A non-2xx response is not an error at that layer; it only
/// becomes [`Status`](ClientError::Status) when a response handler decodes it.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ClientError {
    /// Network or connection failure surfaced by the base transport.
    #[error("transport error: {0}")]
    Transport(String),

    /// The call's cancellation token fired.
    #[error("request canceled")]
    Canceled,

    /// The call's deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// A final response carried a non-2xx status.
    #[error("http {}: {}", status.as_u16(), body_or_reason(status, body))]
    Status { status: StatusCode, body: Bytes },

    /// The request could not be built (bad URL, header, method).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Request body encoding failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// Response body decoding failed.
    #[error("decode error: {0}")]
    Decode(String),

    /// The client could not be constructed (TLS setup, base URL, policy).
    #[error("client configuration error: {0}")]
    Config(String),
}

fn body_or_reason(status: &StatusCode, body: &Bytes) -> String {
    if body.is_empty() {
        status.canonical_reason().unwrap_or("").to_string()
    } else {
        String::from_utf8_lossy(body).into_owned()
    }
}

impl ClientError {
    /// Create a transport error from anything displayable.
    pub fn transport<E: std::fmt::Display>(err: E) -> Self {
        ClientError::Transport(err.to_string())
    }

    /// Returns true for [`Canceled`](ClientError::Canceled) and
    /// [`DeadlineExceeded`](ClientError::DeadlineExceeded).
    ///
    /// Cancellation errors are never retried.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ClientError::Canceled | ClientError::DeadlineExceeded)
    }

    /// Returns true if the call ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::DeadlineExceeded)
    }

    /// Returns true for network-level failures.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }

    /// The HTTP status of a [`Status`](ClientError::Status) error.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if this is a status error with the given code.
    pub fn is_status(&self, code: u16) -> bool {
        self.status_code().is_some_and(|s| s.as_u16() == code)
    }

    /// The response body of a [`Status`](ClientError::Status) error.
    pub fn body(&self) -> Option<&Bytes> {
        match self {
            ClientError::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}
