//! The single-operation transport abstraction.
//!
//! Everything in the request pipeline is a [`Transport`]: the base network
//! client, the retry layer, every interceptor layer and the composed pipeline
//! itself. Layers are stacked by decoration, each holding the next one as a
//! [`SharedTransport`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::{ClientError, Request, Response};

/// Type alias for a boxed future returning a result.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Execute one request and return its response or an error.
///
/// Implementations must tolerate concurrent calls with independent requests.
/// A non-2xx status is a successful outcome at this level.
pub trait Transport: Send + Sync {
    fn round_trip(&self, request: Request) -> BoxFuture<'_, Result<Response, ClientError>>;
}

/// A reference-counted transport trait object.
pub type SharedTransport = Arc<dyn Transport>;

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn round_trip(&self, request: Request) -> BoxFuture<'_, Result<Response, ClientError>> {
        (**self).round_trip(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn round_trip(&self, request: Request) -> BoxFuture<'_, Result<Response, ClientError>> {
        (**self).round_trip(request)
    }
}

/// Adapts a closure into a [`Transport`].
///
/// # Example
///
/// ```ignore
/// use roundtrip_core::{Response, TransportFn};
/// use http::StatusCode;
///
/// let ok = TransportFn::new(|_request| async { Ok(Response::new(StatusCode::OK)) });
/// ```
#[derive(Clone)]
pub struct TransportFn<F> {
    func: F,
}

impl<F, Fut> TransportFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, ClientError>> + Send + 'static,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }

    /// Wrap into a [`SharedTransport`].
    pub fn shared(func: F) -> SharedTransport
    where
        F: 'static,
    {
        Arc::new(Self::new(func))
    }
}

impl<F, Fut> Transport for TransportFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, ClientError>> + Send + 'static,
{
    fn round_trip(&self, request: Request) -> BoxFuture<'_, Result<Response, ClientError>> {
        Box::pin((self.func)(request))
    }
}

impl<F> std::fmt::Debug for TransportFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportFn").finish()
    }
}
