//! Client role: one synchronous relay round trip per call
//!
//! A call encodes the request, publishes it to the configured subject and
//! waits for the correlated reply. Nothing is retried; callers that want
//! retries wrap `call` themselves.

use http_body::Body;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::bus::MessageBus;
use crate::constants::bus::DEFAULT_MAX_PAYLOAD_BYTES;
use crate::constants::client::DEFAULT_TIMEOUT;
use crate::errors::{RelayError, RelayResult};
use crate::wire::{
    decode_response, encode_request, RelayBody, SerializedRequest, SerializedResponse,
};

#[derive(Clone)]
pub struct RelayClient {
    subject: String,
    bus: Arc<dyn MessageBus>,
    timeout: Duration,
    max_payload_bytes: usize,
}

impl RelayClient {
    /// `subject` is published to verbatim; it is not a pattern.
    pub fn new(subject: impl Into<String>, bus: Arc<dyn MessageBus>) -> Self {
        Self {
            subject: subject.into(),
            bus,
            timeout: DEFAULT_TIMEOUT,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_payload_bytes(mut self, limit: usize) -> Self {
        self.max_payload_bytes = limit;
        self
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Relays `request` and returns the remote response.
    ///
    /// An error reported by the agent comes back as `RelayError::Remote`, which
    /// also carries the reply as received.
    pub async fn call<B>(&self, request: http::Request<B>) -> RelayResult<http::Response<RelayBody>>
    where
        B: Body,
        B::Error: Display,
    {
        let wire = encode_request(request).await?;
        let reply = self.send(&wire).await?;
        decode_response(reply)?.into_result()
    }

    /// Relays an already serialized request and returns the reply undecoded.
    ///
    /// The reply's `error` field is not inspected.
    #[instrument(skip(self, request), fields(subject = %self.subject, method = %request.method, url = %request.url))]
    pub async fn send(&self, request: &SerializedRequest) -> RelayResult<SerializedResponse> {
        let payload = request.to_payload()?;
        if payload.len() > self.max_payload_bytes {
            return Err(RelayError::PayloadTooLarge {
                size: payload.len(),
                limit: self.max_payload_bytes,
            });
        }

        debug!("Publishing {} byte request", payload.len());
        let reply = self.bus.request(&self.subject, payload, self.timeout).await?;

        SerializedResponse::from_payload(&reply.payload)
    }
}
