//! HTTP over a publish/subscribe bus
//!
//! A [`RelayClient`] serializes an HTTP request, publishes it to a subject and
//! waits for the reply. A [`RelayAgent`] subscribed to that subject in a queue
//! group executes the request through an [`HttpExecutor`] and publishes the
//! serialized response back.
//!
//! # Architecture
//!
//! ```text
//! RelayClient --publish(subject)--> bus --(one queue member)--> RelayAgent
//!      ^                                                            |
//!      |                                                     HttpExecutor
//!      +---------------- publish(reply inbox) <---------------------+
//! ```

pub mod agent;
pub mod bus;
pub mod client;
pub mod config;
pub mod constants;
pub mod errors;
pub mod executor;
pub mod scheduler;
pub mod wire;

// Re-export commonly used types
pub use agent::{AgentSettings, AgentStats, RelayAgent};
pub use bus::{BusMessage, InMemoryBus, MessageBus, NatsBus, Subscription};
pub use client::RelayClient;
pub use config::{AgentConfig, BusConfig, ClientConfig};
pub use errors::{RelayError, RelayResult, RemoteError};
pub use executor::{HttpExecutor, ReqwestExecutor};
pub use scheduler::PeriodicTask;
pub use wire::{RelayBody, SerializedRequest, SerializedResponse};
