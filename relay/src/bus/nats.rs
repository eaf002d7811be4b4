use anyhow::{anyhow, Result};
use async_nats::{Client, ConnectOptions, Message, RequestError, RequestErrorKind};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use super::{BusMessage, MessageBus, Subscription};
use crate::errors::{RelayError, RelayResult};

/// `MessageBus` over a NATS connection
#[derive(Clone)]
pub struct NatsBus {
    client: Client,
}

impl NatsBus {
    /// Connects to a NATS server. Request timeouts are left to the caller.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = ConnectOptions::new()
            .request_timeout(None)
            .connect(url)
            .await
            .map_err(|e| anyhow!("Failed to connect to NATS at {}: {}", url, e))?;

        info!("Connected to NATS at {}", url);
        Ok(Self { client })
    }
}

impl From<Message> for BusMessage {
    fn from(message: Message) -> Self {
        BusMessage {
            subject: message.subject.to_string(),
            reply: message.reply.map(|reply| reply.to_string()),
            payload: message.payload,
        }
    }
}

#[async_trait]
impl MessageBus for NatsBus {
    async fn publish(&self, subject: &str, payload: Bytes) -> RelayResult<()> {
        self.client
            .publish(subject.to_string(), payload)
            .await
            .map_err(|e| RelayError::Publish {
                subject: subject.to_string(),
                reason: e.to_string(),
            })
    }

    async fn request(
        &self,
        subject: &str,
        payload: Bytes,
        timeout: Duration,
    ) -> RelayResult<BusMessage> {
        let pending = self.client.request(subject.to_string(), payload);
        await_reply(subject, timeout, pending).await
    }

    async fn queue_subscribe(&self, subject: &str, queue: &str) -> RelayResult<Subscription> {
        let subscriber = self
            .client
            .queue_subscribe(subject.to_string(), queue.to_string())
            .await
            .map_err(|e| RelayError::Subscribe {
                subject: subject.to_string(),
                reason: e.to_string(),
            })?;

        // Requests published right after this returns must find the subscription
        self.client
            .flush()
            .await
            .map_err(|e| RelayError::Subscribe {
                subject: subject.to_string(),
                reason: e.to_string(),
            })?;

        Ok(subscriber.map(BusMessage::from).boxed())
    }
}

/// Waits for a request's reply until `timeout` has elapsed.
///
/// The server answers a subject without subscribers with "no responders" right
/// away. That still ends as `Timeout`, once the full timeout has passed.
async fn await_reply<F>(subject: &str, timeout: Duration, pending: F) -> RelayResult<BusMessage>
where
    F: Future<Output = Result<Message, RequestError>>,
{
    let deadline = Instant::now() + timeout;
    let timed_out = || RelayError::Timeout {
        subject: subject.to_string(),
        timeout,
    };

    match tokio::time::timeout_at(deadline, pending).await {
        Ok(Ok(message)) => Ok(message.into()),
        Ok(Err(e)) => match e.kind() {
            RequestErrorKind::NoResponders => {
                debug!("No responders on {}, waiting out the timeout", subject);
                tokio::time::sleep_until(deadline).await;
                Err(timed_out())
            }
            RequestErrorKind::TimedOut => Err(timed_out()),
            _ => Err(RelayError::Publish {
                subject: subject.to_string(),
                reason: e.to_string(),
            }),
        },
        Err(_) => Err(timed_out()),
    }
}
