//! TOML configuration for the relay binaries
//!
//! Every field has a default, so an empty or missing file is a valid config:
//!
//! ```toml
//! # config/agent.toml
//! subject = "request.*"
//! queue = "default"
//! heartbeat_seconds = 60
//!
//! [bus]
//! url = "nats://127.0.0.1:4222"
//! max_payload_bytes = 1048576
//! ```

pub mod loader;

pub use loader::{config_path, load_config};

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{agent, bus, client};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusConfig {
    #[serde(default = "default_bus_url")]
    pub url: String,
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            url: default_bus_url(),
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

fn default_bus_url() -> String {
    bus::DEFAULT_URL.to_string()
}

fn default_max_payload_bytes() -> usize {
    bus::DEFAULT_MAX_PAYLOAD_BYTES
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub bus: BusConfig,
    /// May contain wildcards, e.g. "request.*"
    #[serde(default = "default_agent_subject")]
    pub subject: String,
    #[serde(default = "default_queue")]
    pub queue: String,
    /// Interval of the stats log line; 0 disables it
    #[serde(default = "default_heartbeat_seconds")]
    pub heartbeat_seconds: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            bus: BusConfig::default(),
            subject: default_agent_subject(),
            queue: default_queue(),
            heartbeat_seconds: default_heartbeat_seconds(),
        }
    }
}

fn default_agent_subject() -> String {
    agent::DEFAULT_SUBJECT.to_string()
}

fn default_queue() -> String {
    agent::DEFAULT_QUEUE.to_string()
}

fn default_heartbeat_seconds() -> u64 {
    agent::DEFAULT_HEARTBEAT_SECONDS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub bus: BusConfig,
    /// Exact subject, no wildcards
    #[serde(default = "default_client_subject")]
    pub subject: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
    #[serde(default = "default_target_url")]
    pub target_url: String,
    #[serde(default = "default_method")]
    pub method: String,
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds.max(1))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            bus: BusConfig::default(),
            subject: default_client_subject(),
            timeout_seconds: default_timeout_seconds(),
            poll_interval_seconds: default_poll_interval_seconds(),
            target_url: default_target_url(),
            method: default_method(),
        }
    }
}

fn default_client_subject() -> String {
    client::DEFAULT_SUBJECT.to_string()
}

fn default_timeout_seconds() -> u64 {
    client::DEFAULT_TIMEOUT.as_secs()
}

fn default_poll_interval_seconds() -> u64 {
    client::DEFAULT_POLL_INTERVAL_SECONDS
}

fn default_target_url() -> String {
    client::DEFAULT_TARGET_URL.to_string()
}

fn default_method() -> String {
    client::DEFAULT_METHOD.to_string()
}
