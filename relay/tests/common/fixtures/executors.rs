//! Fake HTTP executors for agent tests

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use http_body::Frame;
use http_body_util::{BodyExt, StreamBody};
use relay::wire::{BoxedBody, RelayBody};
use relay::{HttpExecutor, RelayError, RelayResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Answers every request with 200 and a fixed body, counting calls
#[derive(Default)]
pub struct StaticExecutor {
    body: &'static str,
    calls: AtomicUsize,
}

impl StaticExecutor {
    pub fn pong() -> Arc<Self> {
        Arc::new(Self {
            body: "pong",
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpExecutor for StaticExecutor {
    async fn execute(&self, _request: http::Request<RelayBody>) -> RelayResult<http::Response<BoxedBody>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(http::Response::builder()
            .status(200)
            .header("content-type", "text/plain")
            .body(RelayBody::from(self.body).boxed_body())
            .expect("valid response"))
    }
}

/// Echoes method, URI and body back, remembering every request it saw
#[derive(Default)]
pub struct EchoExecutor {
    seen: Mutex<Vec<(String, String, Bytes)>>,
}

impl EchoExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seen(&self) -> Vec<(String, String, Bytes)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpExecutor for EchoExecutor {
    async fn execute(&self, request: http::Request<RelayBody>) -> RelayResult<http::Response<BoxedBody>> {
        let method = request.method().to_string();
        let uri = request.uri().to_string();
        let body = request.into_body().into_bytes();
        self.seen
            .lock()
            .unwrap()
            .push((method.clone(), uri.clone(), body.clone()));

        Ok(http::Response::builder()
            .status(201)
            .header("x-echo-method", method)
            .header("x-echo-uri", uri)
            .body(RelayBody::new(body).boxed_body())
            .expect("valid response"))
    }
}

/// Fails every request the way an unreachable host does
pub struct RefusingExecutor;

#[async_trait]
impl HttpExecutor for RefusingExecutor {
    async fn execute(&self, request: http::Request<RelayBody>) -> RelayResult<http::Response<BoxedBody>> {
        Err(RelayError::execution(format!(
            "connection refused: {}",
            request.uri()
        )))
    }
}

/// Returns a response whose body breaks halfway through
pub struct BrokenBodyExecutor;

pub fn broken_body() -> BoxedBody {
    let frames: Vec<Result<Frame<Bytes>, RelayError>> = vec![
        Ok(Frame::data(Bytes::from_static(b"partial"))),
        Err(RelayError::io("connection reset by peer")),
    ];
    StreamBody::new(stream::iter(frames)).boxed()
}

#[async_trait]
impl HttpExecutor for BrokenBodyExecutor {
    async fn execute(&self, _request: http::Request<RelayBody>) -> RelayResult<http::Response<BoxedBody>> {
        Ok(http::Response::new(broken_body()))
    }
}

/// Returns a body of the given size
pub struct LargeBodyExecutor {
    pub size: usize,
}

#[async_trait]
impl HttpExecutor for LargeBodyExecutor {
    async fn execute(&self, _request: http::Request<RelayBody>) -> RelayResult<http::Response<BoxedBody>> {
        Ok(http::Response::new(
            RelayBody::new(vec![b'x'; self.size]).boxed_body(),
        ))
    }
}

/// First response carries a body of `size` bytes, later ones a short "pong"
pub struct LargeOnceExecutor {
    size: usize,
    calls: AtomicUsize,
}

impl LargeOnceExecutor {
    pub fn new(size: usize) -> Arc<Self> {
        Arc::new(Self {
            size,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpExecutor for LargeOnceExecutor {
    async fn execute(&self, _request: http::Request<RelayBody>) -> RelayResult<http::Response<BoxedBody>> {
        let body = match self.calls.fetch_add(1, Ordering::SeqCst) {
            0 => RelayBody::new(vec![b'x'; self.size]),
            _ => RelayBody::from("pong"),
        };
        Ok(http::Response::new(body.boxed_body()))
    }
}
