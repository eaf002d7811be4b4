use bytes::Bytes;
use http::HeaderMap;
use http_body::{Body, Frame, SizeHint};
use http_body_util::combinators::BoxBody;
use http_body_util::BodyExt;
use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::errors::RelayError;

/// Body type returned by HTTP executors
pub type BoxedBody = BoxBody<Bytes, RelayError>;

/// A fully buffered body, optionally followed by trailers.
///
/// Yields at most one data frame and one trailers frame.
#[derive(Debug, Default, Clone)]
pub struct RelayBody {
    data: Option<Bytes>,
    trailers: Option<HeaderMap>,
}

impl RelayBody {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: Some(data.into()),
            trailers: None,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_trailers(mut self, trailers: HeaderMap) -> Self {
        if !trailers.is_empty() {
            self.trailers = Some(trailers);
        }
        self
    }

    /// Bytes not yet polled out of the body
    pub fn bytes(&self) -> Bytes {
        self.data.clone().unwrap_or_default()
    }

    pub fn trailers(&self) -> Option<&HeaderMap> {
        self.trailers.as_ref()
    }

    pub fn into_bytes(self) -> Bytes {
        self.data.unwrap_or_default()
    }

    /// Boxes the body for use as an executor response, keeping trailers.
    pub fn boxed_body(self) -> BoxedBody {
        self.map_err(|never: Infallible| match never {}).boxed()
    }
}

impl From<Bytes> for RelayBody {
    fn from(data: Bytes) -> Self {
        Self::new(data)
    }
}

impl From<&'static str> for RelayBody {
    fn from(data: &'static str) -> Self {
        Self::new(Bytes::from_static(data.as_bytes()))
    }
}

impl From<Vec<u8>> for RelayBody {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl Body for RelayBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();

        if let Some(data) = this.data.take() {
            if !data.is_empty() {
                return Poll::Ready(Some(Ok(Frame::data(data))));
            }
        }

        match this.trailers.take() {
            Some(trailers) => Poll::Ready(Some(Ok(Frame::trailers(trailers)))),
            None => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        self.data.as_ref().map_or(true, Bytes::is_empty) && self.trailers.is_none()
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.data.as_ref().map_or(0, |data| data.len() as u64))
    }
}
