//! Process-local bus with NATS subject and queue-group semantics
//!
//! Subjects are `.`-separated tokens. In a subscription pattern `*` matches
//! exactly one token and a trailing `>` matches one or more remaining tokens.
//! Plain subscribers receive every matching message; each queue group receives
//! it once, handed to its members in turn.

use async_trait::async_trait;
use bytes::Bytes;
use futures::channel::mpsc;
use futures::StreamExt;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{BusMessage, MessageBus, Subscription};
use crate::constants::bus::INBOX_PREFIX;
use crate::errors::{RelayError, RelayResult};

struct Subscriber {
    pattern: String,
    queue: Option<String>,
    sender: mpsc::UnboundedSender<BusMessage>,
}

#[derive(Default)]
struct BusState {
    subscribers: Vec<Subscriber>,
    // queue group -> deliveries so far, drives round robin
    cursors: HashMap<String, usize>,
}

#[derive(Clone, Default)]
pub struct InMemoryBus {
    state: Arc<Mutex<BusState>>,
    max_payload: Option<usize>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects publishes larger than `limit` bytes, like a NATS server's `max_payload`.
    pub fn with_max_payload(mut self, limit: usize) -> Self {
        self.max_payload = Some(limit);
        self
    }

    /// Subscribes outside any queue group.
    pub async fn subscribe(&self, subject: &str) -> Subscription {
        self.add_subscriber(subject, None).await
    }

    /// Publishes with an explicit reply address.
    pub async fn publish_with_reply(
        &self,
        subject: &str,
        reply: &str,
        payload: Bytes,
    ) -> RelayResult<()> {
        self.deliver(subject, Some(reply.to_string()), payload).await
    }

    /// Live subscriptions, including inboxes of pending requests
    pub async fn subscriber_count(&self) -> usize {
        let mut state = self.state.lock().await;
        state.subscribers.retain(|s| !s.sender.is_closed());
        state.subscribers.len()
    }

    async fn add_subscriber(&self, pattern: &str, queue: Option<String>) -> Subscription {
        let (sender, receiver) = mpsc::unbounded();
        let mut state = self.state.lock().await;
        state.subscribers.push(Subscriber {
            pattern: pattern.to_string(),
            queue,
            sender,
        });
        receiver.boxed()
    }

    async fn deliver(&self, subject: &str, reply: Option<String>, payload: Bytes) -> RelayResult<()> {
        if let Some(limit) = self.max_payload {
            if payload.len() > limit {
                return Err(RelayError::Publish {
                    subject: subject.to_string(),
                    reason: format!("payload of {} bytes exceeds {} bytes", payload.len(), limit),
                });
            }
        }

        let message = BusMessage {
            subject: subject.to_string(),
            reply,
            payload,
        };

        let mut state = self.state.lock().await;
        state.subscribers.retain(|s| !s.sender.is_closed());

        let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut delivered = 0usize;

        for (index, subscriber) in state.subscribers.iter().enumerate() {
            if !subject_matches(&subscriber.pattern, subject) {
                continue;
            }
            match &subscriber.queue {
                Some(queue) => groups.entry(queue.clone()).or_default().push(index),
                None => {
                    if subscriber.sender.unbounded_send(message.clone()).is_ok() {
                        delivered += 1;
                    }
                }
            }
        }

        for (queue, members) in groups {
            let cursor = state.cursors.entry(queue).or_insert(0);
            let chosen = members[*cursor % members.len()];
            *cursor = cursor.wrapping_add(1);
            if state.subscribers[chosen]
                .sender
                .unbounded_send(message.clone())
                .is_ok()
            {
                delivered += 1;
            }
        }

        debug!("Delivered message on {} to {} subscribers", subject, delivered);
        Ok(())
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn publish(&self, subject: &str, payload: Bytes) -> RelayResult<()> {
        self.deliver(subject, None, payload).await
    }

    #[instrument(skip(self, payload), fields(size = payload.len()))]
    async fn request(
        &self,
        subject: &str,
        payload: Bytes,
        timeout: Duration,
    ) -> RelayResult<BusMessage> {
        let inbox = format!("{}.{}", INBOX_PREFIX, Uuid::new_v4().simple());
        let mut replies = self.add_subscriber(&inbox, None).await;

        self.deliver(subject, Some(inbox), payload).await?;

        match tokio::time::timeout(timeout, replies.next()).await {
            Ok(Some(reply)) => Ok(reply),
            Ok(None) => Err(RelayError::Publish {
                subject: subject.to_string(),
                reason: "reply inbox closed".to_string(),
            }),
            Err(_) => Err(RelayError::Timeout {
                subject: subject.to_string(),
                timeout,
            }),
        }
    }

    async fn queue_subscribe(&self, subject: &str, queue: &str) -> RelayResult<Subscription> {
        if subject.is_empty() || subject.split('.').any(str::is_empty) {
            return Err(RelayError::Subscribe {
                subject: subject.to_string(),
                reason: "invalid subject".to_string(),
            });
        }
        Ok(self.add_subscriber(subject, Some(queue.to_string())).await)
    }
}

/// NATS-style match of a concrete subject against a subscription pattern.
pub fn subject_matches(pattern: &str, subject: &str) -> bool {
    let mut pattern_tokens = pattern.split('.');
    let mut subject_tokens = subject.split('.');

    loop {
        match (pattern_tokens.next(), subject_tokens.next()) {
            (Some(">"), Some(_)) => return pattern_tokens.next().is_none(),
            (Some("*"), Some(_)) => continue,
            (Some(p), Some(s)) if p == s => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}
