//! Request and response body types.
//!
//! - [`RequestBody`]: what a caller attaches to a request. It is replayable by
//!   construction so the retry layer can send it once per attempt.
//! - [`TransportBody`]: the single-use `http_body::Body` a transport sends for
//!   one attempt, produced by [`RequestBody::open`].
//! - [`ResponseBody`]: the body of a received response. Whoever owns it last
//!   closes it, either explicitly or by dropping it.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use http_body::{Body, Frame, SizeHint};
use http_body_util::BodyExt;
use http_body_util::combinators::UnsyncBoxBody;
use pin_project_lite::pin_project;

use crate::ClientError;

/// A boxed stream of body chunks.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, ClientError>> + Send>>;

type BodyFactory = Arc<dyn Fn() -> BodyStream + Send + Sync>;

/// A request body that can be supplied afresh for every attempt.
///
/// Streaming bodies are attached as a factory that builds a new stream each
/// time the body is opened; a one-shot stream cannot be attached.
#[derive(Clone, Default)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// An in-memory body. Cloning shares the buffer.
    Full(Bytes),
    /// A factory invoked once per attempt.
    Factory(BodyFactory),
}

impl RequestBody {
    /// Create an empty body.
    pub fn empty() -> Self {
        RequestBody::Empty
    }

    /// Create a body from an in-memory buffer.
    pub fn full(data: impl Into<Bytes>) -> Self {
        RequestBody::Full(data.into())
    }

    /// Create a streaming body from a factory.
    ///
    /// The factory is called once per attempt and must return a fresh stream
    /// each time.
    pub fn factory<F, S>(factory: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: Stream<Item = Result<Bytes, ClientError>> + Send + 'static,
    {
        RequestBody::Factory(Arc::new(move || Box::pin(factory()) as BodyStream))
    }

    /// Returns true if the body is known to be empty.
    pub fn is_empty(&self) -> bool {
        match self {
            RequestBody::Empty => true,
            RequestBody::Full(data) => data.is_empty(),
            RequestBody::Factory(_) => false,
        }
    }

    /// Produce the body for one attempt.
    pub fn open(&self) -> TransportBody {
        match self {
            RequestBody::Empty => TransportBody::empty(),
            RequestBody::Full(data) => TransportBody::full(data.clone()),
            RequestBody::Factory(factory) => TransportBody::Streaming { stream: factory() },
        }
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Empty => write!(f, "RequestBody::Empty"),
            RequestBody::Full(data) => f
                .debug_struct("RequestBody::Full")
                .field("len", &data.len())
                .finish(),
            RequestBody::Factory(_) => write!(f, "RequestBody::Factory"),
        }
    }
}

impl From<Bytes> for RequestBody {
    fn from(data: Bytes) -> Self {
        RequestBody::Full(data)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(data: Vec<u8>) -> Self {
        RequestBody::Full(data.into())
    }
}

impl From<String> for RequestBody {
    fn from(data: String) -> Self {
        RequestBody::Full(data.into())
    }
}

impl From<&'static str> for RequestBody {
    fn from(data: &'static str) -> Self {
        RequestBody::Full(Bytes::from_static(data.as_bytes()))
    }
}

pin_project! {
    /// The body sent on the wire for a single attempt.
    #[project = TransportBodyProj]
    pub enum TransportBody {
        /// Empty request body.
        Empty,
        /// Full request body with all data available.
        Full {
            data: Option<Bytes>,
        },
        /// Streaming request body.
        Streaming {
            #[pin]
            stream: BodyStream,
        },
    }
}

impl TransportBody {
    /// Create an empty body.
    pub fn empty() -> Self {
        TransportBody::Empty
    }

    /// Create a body with the given data.
    pub fn full(data: Bytes) -> Self {
        TransportBody::Full { data: Some(data) }
    }
}

impl Body for TransportBody {
    type Data = Bytes;
    type Error = ClientError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.project() {
            TransportBodyProj::Empty => Poll::Ready(None),
            TransportBodyProj::Full { data } => Poll::Ready(data.take().map(|d| Ok(Frame::data(d)))),
            TransportBodyProj::Streaming { stream } => match stream.poll_next(cx) {
                Poll::Ready(Some(chunk)) => Poll::Ready(Some(chunk.map(Frame::data))),
                Poll::Ready(None) => Poll::Ready(None),
                Poll::Pending => Poll::Pending,
            },
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            TransportBody::Empty => true,
            TransportBody::Full { data } => data.is_none(),
            TransportBody::Streaming { .. } => false,
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            TransportBody::Empty => SizeHint::with_exact(0),
            TransportBody::Full { data } => {
                SizeHint::with_exact(data.as_ref().map_or(0, |d| d.len() as u64))
            }
            TransportBody::Streaming { .. } => SizeHint::default(),
        }
    }
}

impl Default for TransportBody {
    fn default() -> Self {
        TransportBody::Empty
    }
}

impl fmt::Debug for TransportBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportBody::Empty => write!(f, "TransportBody::Empty"),
            TransportBody::Full { data } => f
                .debug_struct("TransportBody::Full")
                .field("data_len", &data.as_ref().map(|d| d.len()))
                .finish(),
            TransportBody::Streaming { .. } => write!(f, "TransportBody::Streaming"),
        }
    }
}

/// The body of a received response.
///
/// Dropping the body closes it. [`close`](ResponseBody::close) does the same
/// explicitly. A close hook registered with
/// [`on_close`](ResponseBody::on_close) runs exactly once, when the body is
/// closed.
pub struct ResponseBody {
    inner: UnsyncBoxBody<Bytes, ClientError>,
    on_close: Option<Box<dyn FnOnce() + Send>>,
}

impl ResponseBody {
    /// Wrap any body whose errors are already [`ClientError`]s.
    pub fn new<B>(body: B) -> Self
    where
        B: Body<Data = Bytes, Error = ClientError> + Send + 'static,
    {
        Self {
            inner: body.boxed_unsync(),
            on_close: None,
        }
    }

    /// An empty body.
    pub fn empty() -> Self {
        Self::new(http_body_util::Empty::<Bytes>::new().map_err(|never| match never {}))
    }

    /// A body backed by an in-memory buffer.
    pub fn full(data: impl Into<Bytes>) -> Self {
        Self::new(http_body_util::Full::new(data.into()).map_err(|never| match never {}))
    }

    /// Register a hook that runs when this body is closed.
    ///
    /// Replaces any previously registered hook.
    pub fn on_close<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_close = Some(Box::new(hook));
        self
    }

    /// Close the body, releasing the underlying connection.
    pub fn close(self) {
        drop(self);
    }

    /// Read the remaining body into memory.
    pub async fn collect_bytes(self) -> Result<Bytes, ClientError> {
        let collected = self.collect().await?;
        Ok(collected.to_bytes())
    }
}

impl Body for ResponseBody {
    type Data = Bytes;
    type Error = ClientError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.get_mut().inner).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for ResponseBody {
    fn drop(&mut self) {
        if let Some(hook) = self.on_close.take() {
            hook();
        }
    }
}

impl Default for ResponseBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBody")
            .field("size_hint", &self.inner.size_hint())
            .field("on_close", &self.on_close.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_empty_body() {
        let mut body = RequestBody::empty().open();
        assert!(body.is_end_stream());

        let collected = Pin::new(&mut body).collect().await.unwrap();
        assert!(collected.to_bytes().is_empty());
    }

    #[tokio::test]
    async fn test_full_body_opens_every_time() {
        let body = RequestBody::full("hello world");
        for _ in 0..3 {
            let collected = body.open().collect().await.unwrap();
            assert_eq!(collected.to_bytes(), Bytes::from("hello world"));
        }
    }

    #[tokio::test]
    async fn test_factory_body_builds_fresh_stream_per_open() {
        let opened = Arc::new(AtomicU32::new(0));
        let opened_clone = opened.clone();
        let body = RequestBody::factory(move || {
            opened_clone.fetch_add(1, Ordering::SeqCst);
            futures::stream::iter(vec![
                Ok(Bytes::from("chunk1")),
                Ok(Bytes::from("chunk2")),
            ])
        });

        let first = body.open().collect().await.unwrap().to_bytes();
        let second = body.clone().open().collect().await.unwrap().to_bytes();

        assert_eq!(first, Bytes::from("chunk1chunk2"));
        assert_eq!(second, first);
        assert_eq!(opened.load(Ordering::SeqCst), 2);
        assert!(!body.is_empty());
    }

    #[test]
    fn test_transport_body_size_hint() {
        let body = TransportBody::full(Bytes::from_static(b"abcd"));
        assert_eq!(body.size_hint().exact(), Some(4));
        assert_eq!(TransportBody::empty().size_hint().exact(), Some(0));
    }

    #[tokio::test]
    async fn test_response_body_close_hook_runs_once() {
        let closed = Arc::new(AtomicU32::new(0));
        let closed_clone = closed.clone();
        let body = ResponseBody::full("payload").on_close(move || {
            closed_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(closed.load(Ordering::SeqCst), 0);
        body.close();
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_response_body_collect_then_close() {
        let closed = Arc::new(AtomicU32::new(0));
        let closed_clone = closed.clone();
        let body = ResponseBody::full("payload").on_close(move || {
            closed_clone.fetch_add(1, Ordering::SeqCst);
        });

        let bytes = body.collect_bytes().await.unwrap();
        assert_eq!(bytes, Bytes::from("payload"));
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }
}
