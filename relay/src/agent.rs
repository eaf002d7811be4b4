//! Agent role: executes relayed requests and replies with the outcome
//!
//! ```text
//! bus message --decode--> http::Request --executor--> http::Response --encode--> reply
//!      |                      |                            |
//!      +------- any failure becomes a reply carrying only `error` ------+
//! ```
//!
//! Every message with a reply address gets exactly one reply, whichever stage
//! failed.
//! Each message is handled on its own task; there is no cap on how many run at
//! once and no timeout on the executor.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::bus::{BusMessage, MessageBus, Subscription};
use crate::constants::bus::DEFAULT_MAX_PAYLOAD_BYTES;
use crate::errors::RelayError;
use crate::executor::HttpExecutor;
use crate::wire::{decode_request, encode_response, SerializedRequest, SerializedResponse};

/// What an agent subscribes to and how large its replies may be
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub subject: String,
    pub queue: String,
    pub max_payload_bytes: usize,
}

impl AgentSettings {
    pub fn new(subject: impl Into<String>, queue: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            queue: queue.into(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }

    pub fn max_payload_bytes(mut self, limit: usize) -> Self {
        self.max_payload_bytes = limit;
        self
    }
}

#[derive(Debug)]
struct AgentCounters {
    received: AtomicU64,
    replied: AtomicU64,
    failed: AtomicU64,
    publish_failures: AtomicU64,
    started_at: DateTime<Utc>,
}

/// Point-in-time view of an agent's counters
#[derive(Debug, Clone, Serialize)]
pub struct AgentStats {
    pub received: u64,
    /// Replies published, including error replies
    pub replied: u64,
    /// Messages whose reply carried an error
    pub failed: u64,
    pub publish_failures: u64,
    pub started_at: DateTime<Utc>,
}

/// Everything a message handler needs, shared across handler tasks
struct Handler {
    bus: Arc<dyn MessageBus>,
    executor: Arc<dyn HttpExecutor>,
    counters: AgentCounters,
    max_payload_bytes: usize,
}

/// A running agent. Dropping it stops the dispatch loop; replies already in
/// flight still complete.
pub struct RelayAgent {
    settings: AgentSettings,
    handler: Arc<Handler>,
    shutdown: CancellationToken,
    dispatcher: Option<JoinHandle<()>>,
}

impl RelayAgent {
    /// Subscribes and starts dispatching. The subscription is live when this returns.
    pub async fn start(
        settings: AgentSettings,
        bus: Arc<dyn MessageBus>,
        executor: Arc<dyn HttpExecutor>,
    ) -> Result<Self, RelayError> {
        let subscription = bus
            .queue_subscribe(&settings.subject, &settings.queue)
            .await?;

        info!(
            "Relay agent subscribed to '{}' in queue '{}'",
            settings.subject, settings.queue
        );

        let handler = Arc::new(Handler {
            bus,
            executor,
            counters: AgentCounters {
                received: AtomicU64::new(0),
                replied: AtomicU64::new(0),
                failed: AtomicU64::new(0),
                publish_failures: AtomicU64::new(0),
                started_at: Utc::now(),
            },
            max_payload_bytes: settings.max_payload_bytes,
        });

        let shutdown = CancellationToken::new();
        let dispatcher = tokio::spawn(dispatch(
            subscription,
            handler.clone(),
            shutdown.clone(),
            settings.subject.clone(),
        ));

        Ok(Self {
            settings,
            handler,
            shutdown,
            dispatcher: Some(dispatcher),
        })
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn stats(&self) -> AgentStats {
        let counters = &self.handler.counters;
        AgentStats {
            received: counters.received.load(Ordering::Relaxed),
            replied: counters.replied.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            publish_failures: counters.publish_failures.load(Ordering::Relaxed),
            started_at: counters.started_at,
        }
    }

    /// Stops taking new messages and waits for the dispatch loop to exit.
    pub async fn stop(mut self) {
        self.shutdown.cancel();
        if let Some(dispatcher) = self.dispatcher.take() {
            if let Err(e) = dispatcher.await {
                warn!("Relay agent dispatcher ended abnormally: {}", e);
            }
        }
        info!("Relay agent on '{}' stopped", self.settings.subject);
    }
}

impl Drop for RelayAgent {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn dispatch(
    mut subscription: Subscription,
    handler: Arc<Handler>,
    shutdown: CancellationToken,
    subject: String,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            next = subscription.next() => match next {
                Some(message) => {
                    handler.counters.received.fetch_add(1, Ordering::Relaxed);
                    tokio::spawn(handler.clone().handle(message));
                }
                None => {
                    warn!("Subscription to '{}' closed by the bus", subject);
                    break;
                }
            }
        }
    }
}

impl Handler {
    #[instrument(skip(self, message), fields(subject = %message.subject))]
    async fn handle(self: Arc<Self>, message: BusMessage) {
        let response = self.respond(&message.payload).await;

        if let Some(error) = response.error() {
            warn!("Request on {} failed: {}", message.subject, error);
        }

        let Some(reply_to) = message.reply_to() else {
            debug!("No reply address on {}, dropping result", message.subject);
            return;
        };

        let (payload, failed) = self.reply_payload(response);
        match self.bus.publish(reply_to, payload).await {
            Ok(()) => {
                self.counters.replied.fetch_add(1, Ordering::Relaxed);
                if failed {
                    self.counters.failed.fetch_add(1, Ordering::Relaxed);
                }
                debug!("Replied to {}", reply_to);
            }
            Err(e) => {
                self.counters.publish_failures.fetch_add(1, Ordering::Relaxed);
                error!("Failed to publish reply to {}: {}", reply_to, e);
            }
        }
    }

    /// Runs decode, execute and encode, folding any failure into the response.
    async fn respond(&self, payload: &[u8]) -> SerializedResponse {
        let request = match SerializedRequest::from_payload(payload)
            .and_then(|wire| decode_request(&wire))
        {
            Ok(request) => request,
            Err(e) => return SerializedResponse::failure(&e),
        };

        debug!("Relaying {} {}", request.method(), request.uri());

        let response = match self.executor.execute(request).await {
            Ok(response) => response,
            Err(e) => return SerializedResponse::failure(&e),
        };

        match encode_response(response).await {
            Ok(response) => response,
            Err(e) => SerializedResponse::failure(&e),
        }
    }

    /// Serializes the reply, substituting an error reply when it cannot be sent as is.
    fn reply_payload(&self, response: SerializedResponse) -> (Bytes, bool) {
        let failed = response.error().is_some();

        let error = match response.to_payload() {
            Ok(payload) if payload.len() <= self.max_payload_bytes => return (payload, failed),
            Ok(payload) => RelayError::PayloadTooLarge {
                size: payload.len(),
                limit: self.max_payload_bytes,
            },
            Err(e) => e,
        };

        let fallback = SerializedResponse::failure(&error);
        match fallback.to_payload() {
            Ok(payload) => (payload, true),
            // An error-only response always serializes
            Err(_) => (Bytes::new(), true),
        }
    }
}
