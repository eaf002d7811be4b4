//! Defaults shared by the relay roles and the binaries

use std::time::Duration;

/// Bus-level defaults
pub mod bus {
    /// NATS server used when no URL is configured
    pub const DEFAULT_URL: &str = "nats://127.0.0.1:4222";

    /// Largest payload accepted on either leg (NATS server default `max_payload`)
    pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

    /// Prefix of the unique reply subjects used for request/reply
    pub const INBOX_PREFIX: &str = "_INBOX";
}

/// Agent role defaults
pub mod agent {
    pub const DEFAULT_SUBJECT: &str = "request.*";
    pub const DEFAULT_QUEUE: &str = "default";
    pub const DEFAULT_HEARTBEAT_SECONDS: u64 = 60;
}

/// Client role defaults
pub mod client {
    use super::Duration;

    pub const DEFAULT_SUBJECT: &str = "request.1";

    /// How long a call waits for its reply
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    pub const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 1;
    pub const DEFAULT_TARGET_URL: &str = "http://example.com/";
    pub const DEFAULT_METHOD: &str = "GET";
}
