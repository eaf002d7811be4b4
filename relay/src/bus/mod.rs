//! Message bus abstraction
//!
//! The relay only needs three primitives from the bus:
//!
//! - **publish**: fire a payload at a subject
//! - **request**: publish with a unique reply address and wait for one answer
//! - **queue_subscribe**: receive messages on a subject, sharing them with the
//!   other members of a queue group so each message reaches one member
//!
//! `NatsBus` provides them over a NATS connection, `InMemoryBus` inside a
//! single process with the same subject and queue-group rules.

pub mod memory;
pub mod nats;

pub use memory::InMemoryBus;
pub use nats::NatsBus;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::time::Duration;

use crate::errors::RelayResult;

/// A message delivered by the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub subject: String,
    /// Where the publisher waits for an answer, if anywhere
    pub reply: Option<String>,
    pub payload: Bytes,
}

impl BusMessage {
    /// Reply address, ignoring empty ones
    pub fn reply_to(&self) -> Option<&str> {
        self.reply.as_deref().filter(|reply| !reply.is_empty())
    }
}

/// Stream of messages for one subscription; dropping it unsubscribes.
pub type Subscription = BoxStream<'static, BusMessage>;

#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn publish(&self, subject: &str, payload: Bytes) -> RelayResult<()>;

    /// Publishes `payload` and waits up to `timeout` for the correlated reply.
    async fn request(
        &self,
        subject: &str,
        payload: Bytes,
        timeout: Duration,
    ) -> RelayResult<BusMessage>;

    async fn queue_subscribe(&self, subject: &str, queue: &str) -> RelayResult<Subscription>;
}
