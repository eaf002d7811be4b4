//! HTTP execution capability used by the agent
//!
//! The agent never talks HTTP itself; it hands decoded requests to an
//! `HttpExecutor`. `ReqwestExecutor` is the pass-through default, tests plug in
//! fakes.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::errors::{RelayError, RelayResult};
use crate::wire::{BoxedBody, RelayBody};

#[async_trait]
pub trait HttpExecutor: Send + Sync {
    /// Performs the request. Error status codes are responses, not errors.
    async fn execute(&self, request: http::Request<RelayBody>) -> RelayResult<http::Response<BoxedBody>>;
}

/// Executes requests with a shared `reqwest::Client`.
///
/// No timeout is applied; a request runs as long as the remote end keeps it open.
#[derive(Clone, Default)]
pub struct ReqwestExecutor {
    client: Client,
}

impl ReqwestExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
    async fn execute(&self, request: http::Request<RelayBody>) -> RelayResult<http::Response<BoxedBody>> {
        let url = request.uri().to_string();
        let request = request.map(|body| reqwest::Body::from(body.into_bytes()));

        let request = reqwest::Request::try_from(request).map_err(|e| RelayError::Url {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        debug!("Executing {} {}", request.method(), url);

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| RelayError::execution(format!("{} {}", url, e)))?;

        let status = response.status();
        let version = response.version();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(RelayError::io)?;

        let mut native = http::Response::new(RelayBody::new(body).boxed_body());
        *native.status_mut() = status;
        *native.version_mut() = version;
        *native.headers_mut() = headers;
        Ok(native)
    }
}
