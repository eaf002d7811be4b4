//! Error types for the relay
//!
//! Every failure the agent can hit locally is turned into a `RelayError` and then
//! into the `error` field of the reply, so the variants double as the wire-level
//! error taxonomy.

use std::fmt;
use std::time::Duration;

use crate::wire::SerializedResponse;

/// Main error type for relay operations
#[derive(Debug, Clone)]
pub enum RelayError {
    /// Payload could not be parsed into the expected structure
    Decode { reason: String },

    /// Request URL could not be parsed or used
    Url { url: String, reason: String },

    /// Reading a request or response body failed
    Io { reason: String },

    /// The HTTP executor returned an error instead of a response
    Execution { reason: String },

    /// The bus rejected or failed to deliver a publish
    Publish { subject: String, reason: String },

    /// The bus refused a subscription
    Subscribe { subject: String, reason: String },

    /// No reply arrived within the configured window
    Timeout { subject: String, timeout: Duration },

    /// Encoded payload exceeds the configured size limit
    PayloadTooLarge { size: usize, limit: usize },

    /// The agent answered with an error instead of a response
    Remote(RemoteError),
}

/// Error reported by a remote agent in the `error` field of its reply.
///
/// Carries the reply as received. Its non-error fields are left at their
/// defaults by the agent and should not be trusted.
#[derive(Debug, Clone)]
pub struct RemoteError {
    pub message: String,
    pub response: Box<SerializedResponse>,
}

pub type RelayResult<T> = Result<T, RelayError>;

impl RelayError {
    pub fn decode(reason: impl fmt::Display) -> Self {
        RelayError::Decode {
            reason: reason.to_string(),
        }
    }

    pub fn io(reason: impl fmt::Display) -> Self {
        RelayError::Io {
            reason: reason.to_string(),
        }
    }

    pub fn execution(reason: impl fmt::Display) -> Self {
        RelayError::Execution {
            reason: reason.to_string(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RelayError::Timeout { .. })
    }
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::Decode { reason } => write!(f, "Decode failure: {}", reason),
            RelayError::Url { url, reason } => write!(f, "Invalid URL '{}': {}", url, reason),
            RelayError::Io { reason } => write!(f, "Body read failure: {}", reason),
            RelayError::Execution { reason } => write!(f, "Execution failure: {}", reason),
            RelayError::Publish { subject, reason } => {
                write!(f, "Publish to '{}' failed: {}", subject, reason)
            }
            RelayError::Subscribe { subject, reason } => {
                write!(f, "Subscribe to '{}' failed: {}", subject, reason)
            }
            RelayError::Timeout { subject, timeout } => {
                write!(f, "No reply on '{}' within {:?}", subject, timeout)
            }
            RelayError::PayloadTooLarge { size, limit } => {
                write!(f, "Payload of {} bytes exceeds limit of {} bytes", size, limit)
            }
            RelayError::Remote(e) => write!(f, "{}", e),
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Agent error: {}", self.message)
    }
}

impl std::error::Error for RelayError {}
impl std::error::Error for RemoteError {}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::decode(err)
    }
}

impl From<RemoteError> for RelayError {
    fn from(err: RemoteError) -> Self {
        RelayError::Remote(err)
    }
}
