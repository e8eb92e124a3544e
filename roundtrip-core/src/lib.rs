//! Core types for the roundtrip HTTP client.
//!
//! This crate provides the values and the abstraction shared by every layer of
//! the request pipeline in `roundtrip-client`.
//!
//! ## Modules
//!
//! - [`error`]: The [`ClientError`] type
//! - [`context`]: Per-call cancellation and deadlines
//! - [`body`]: Replayable request bodies and closable response bodies
//! - [`message`]: [`Request`] and [`Response`]
//! - [`transport`]: The [`Transport`] trait and closure adapter

pub mod body;
pub mod context;
pub mod error;
pub mod message;
pub mod transport;

pub use body::{BodyStream, RequestBody, ResponseBody, TransportBody};
pub use context::CallContext;
pub use error::ClientError;
pub use message::{Request, Response};
pub use transport::{BoxFuture, SharedTransport, Transport, TransportFn};

/// Re-export commonly used types.
pub use http::{HeaderMap, Method, StatusCode, Uri, header};
pub use tokio_util::sync::CancellationToken;
