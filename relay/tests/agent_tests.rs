//! Integration tests for the agent role
//!
//! The core contract under test: every inbound message with a reply address
//! gets exactly one reply, whichever stage failed.

mod common;

use bytes::Bytes;
use common::fixtures::*;
use futures::StreamExt;
use relay::{
    AgentSettings, InMemoryBus, RelayAgent, SerializedRequest, SerializedResponse,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const REPLY_SUBJECT: &str = "test.replies";
const QUIET: Duration = Duration::from_millis(100);

/// Publishes `payload` to the agent and returns the single reply it produces.
async fn exchange(bus: &InMemoryBus, payload: Bytes) -> SerializedResponse {
    let mut replies = bus.subscribe(REPLY_SUBJECT).await;

    bus.publish_with_reply(subjects::ECHO, REPLY_SUBJECT, payload)
        .await
        .unwrap();

    let reply = timeout(TEST_TIMEOUT, replies.next())
        .await
        .expect("agent should reply")
        .expect("subscription open");

    assert!(
        timeout(QUIET, replies.next()).await.is_err(),
        "agent must reply exactly once"
    );

    SerializedResponse::from_payload(&reply.payload).expect("reply should decode")
}

fn request_payload(method: &str, url: &str, body: &'static [u8]) -> Bytes {
    SerializedRequest::new(method, url, Bytes::from_static(body))
        .to_payload()
        .unwrap()
}

#[tokio::test]
async fn test_successful_execution_replies_with_response() {
    let bus = InMemoryBus::new();
    let executor = EchoExecutor::new();
    let agent = start_agent(&bus, subjects::WILDCARD, executor.clone()).await;

    let reply = exchange(&bus, request_payload("PUT", urls::UPLOAD, b"data")).await;

    assert!(reply.error().is_none(), "unexpected error: {:?}", reply.error);
    assert_eq!(reply.status_code, 201);
    assert_eq!(reply.status, "201 Created");
    assert_eq!(reply.body, Bytes::from_static(b"data"));
    assert_eq!(reply.headers["x-echo-method"], vec!["PUT"]);
    assert_eq!(reply.headers["x-echo-uri"], vec![urls::UPLOAD]);

    let seen = executor.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "PUT");

    let stats = agent.stats();
    assert_eq!(stats.received, 1);
    assert_eq!(stats.replied, 1);
    assert_eq!(stats.failed, 0);
}

#[tokio::test]
async fn test_undecodable_payload_still_gets_error_reply() {
    let bus = InMemoryBus::new();
    let executor = StaticExecutor::pong();
    let agent = start_agent(&bus, subjects::ECHO, executor.clone()).await;

    let reply = exchange(&bus, Bytes::from_static(b"{ not json")).await;

    let error = reply.error().expect("decode failure should be reported");
    assert!(error.starts_with("Decode failure"), "got {}", error);
    assert_eq!(reply.status_code, 0);
    assert_eq!(executor.calls(), 0, "executor must not run");
    assert_eq!(agent.stats().failed, 1);
}

#[tokio::test]
async fn test_invalid_url_gets_error_reply() {
    let bus = InMemoryBus::new();
    let executor = StaticExecutor::pong();
    let _agent = start_agent(&bus, subjects::ECHO, executor.clone()).await;

    let reply = exchange(&bus, request_payload("GET", "http://bad host/", b"")).await;

    assert!(reply.error().unwrap().starts_with("Invalid URL"));
    assert_eq!(executor.calls(), 0);
}

#[tokio::test]
async fn test_executor_failure_gets_error_reply() {
    let bus = InMemoryBus::new();
    let _agent = start_agent(&bus, subjects::ECHO, Arc::new(RefusingExecutor)).await;

    let reply = exchange(&bus, request_payload("GET", urls::EXAMPLE, b"")).await;

    let error = reply.error().expect("execution failure should be reported");
    assert!(error.contains("connection refused"), "got {}", error);
    assert_eq!(reply.status_code, 0);
    assert!(reply.body.is_empty());
}

#[tokio::test]
async fn test_response_body_failure_gets_error_reply() {
    let bus = InMemoryBus::new();
    let _agent = start_agent(&bus, subjects::ECHO, Arc::new(BrokenBodyExecutor)).await;

    let reply = exchange(&bus, request_payload("GET", urls::EXAMPLE, b"")).await;

    let error = reply.error().expect("body failure should be reported");
    assert!(error.starts_with("Body read failure"), "got {}", error);
    // The partial body is discarded, not returned
    assert!(reply.body.is_empty());
}

#[tokio::test]
async fn test_oversized_response_is_replaced_by_error_reply() {
    let bus = InMemoryBus::new();
    let agent = RelayAgent::start(
        AgentSettings::new(subjects::ECHO, queues::WORKERS).max_payload_bytes(1024),
        shared(&bus),
        Arc::new(LargeBodyExecutor { size: 4096 }),
    )
    .await
    .unwrap();

    let reply = exchange(&bus, request_payload("GET", urls::EXAMPLE, b"")).await;

    assert!(reply.error().unwrap().contains("exceeds limit"));
    assert_eq!(agent.settings().max_payload_bytes, 1024);
}

#[tokio::test]
async fn test_failed_reply_publish_is_counted_and_agent_keeps_serving() {
    // The bus refuses the first reply; the agent's own limit would let it through
    let bus = InMemoryBus::new().with_max_payload(512);
    let executor = LargeOnceExecutor::new(1000);
    let agent = start_agent(&bus, subjects::ECHO, executor.clone()).await;
    let client = client(&bus, subjects::ECHO);

    let err = client
        .clone()
        .with_timeout(Duration::from_millis(200))
        .call(get(urls::EXAMPLE))
        .await
        .unwrap_err();
    assert!(err.is_timeout(), "got {:?}", err);

    let stats = agent.stats();
    assert_eq!(stats.received, 1);
    assert_eq!(stats.replied, 0);
    assert_eq!(stats.publish_failures, 1);

    // Not retried, and the next request is answered normally
    let response = client.call(get(urls::EXAMPLE)).await.expect("second call should succeed");
    let body = response.into_body().into_bytes();
    assert_eq!(body, Bytes::from_static(b"pong"));

    assert_eq!(executor.calls(), 2);
    let stats = agent.stats();
    assert_eq!(stats.received, 2);
    assert_eq!(stats.replied, 1);
    assert_eq!(stats.publish_failures, 1);
}

#[tokio::test]
async fn test_message_without_reply_address_does_not_stop_agent() {
    let bus = InMemoryBus::new();
    let executor = StaticExecutor::pong();
    let agent = start_agent(&bus, subjects::ECHO, executor.clone()).await;

    bus.publish_with_reply(subjects::ECHO, "", request_payload("GET", urls::EXAMPLE, b""))
        .await
        .unwrap();

    // The next message is still handled and answered
    let reply = exchange(&bus, request_payload("GET", urls::EXAMPLE, b"")).await;
    assert_eq!(reply.body, Bytes::from_static(b"pong"));

    assert_eq!(executor.calls(), 2);
    let stats = agent.stats();
    assert_eq!(stats.received, 2);
    assert_eq!(stats.replied, 1);
}

#[tokio::test]
async fn test_concurrent_messages_are_all_answered() {
    let bus = InMemoryBus::new();
    let executor = StaticExecutor::pong();
    let _agent = start_agent(&bus, subjects::ECHO, executor.clone()).await;

    let calls = (0..16).map(|_| {
        let client = client(&bus, subjects::ECHO);
        async move { client.call(get(urls::EXAMPLE)).await }
    });
    let results = futures::future::join_all(calls).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(executor.calls(), 16);
}

#[tokio::test]
async fn test_stopped_agent_no_longer_handles_messages() {
    let bus = InMemoryBus::new();
    let executor = StaticExecutor::pong();
    let agent = start_agent(&bus, subjects::ECHO, executor.clone()).await;

    agent.stop().await;

    let result = client(&bus, subjects::ECHO)
        .with_timeout(Duration::from_millis(100))
        .call(get(urls::EXAMPLE))
        .await;

    assert!(result.unwrap_err().is_timeout());
    assert_eq!(executor.calls(), 0);
}
