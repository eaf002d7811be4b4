//! Agent and client wiring over an in-memory bus

use relay::{AgentSettings, HttpExecutor, InMemoryBus, MessageBus, RelayAgent, RelayClient};
use std::sync::Arc;
use std::time::Duration;

use super::test_data::queues;

/// Short enough to keep failing tests fast, long enough for a local round trip
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

pub fn shared(bus: &InMemoryBus) -> Arc<dyn MessageBus> {
    Arc::new(bus.clone())
}

pub async fn start_agent(
    bus: &InMemoryBus,
    subject: &str,
    executor: Arc<dyn HttpExecutor>,
) -> RelayAgent {
    RelayAgent::start(
        AgentSettings::new(subject, queues::WORKERS),
        shared(bus),
        executor,
    )
    .await
    .expect("agent should subscribe")
}

pub fn client(bus: &InMemoryBus, subject: &str) -> RelayClient {
    RelayClient::new(subject, shared(bus)).with_timeout(TEST_TIMEOUT)
}
