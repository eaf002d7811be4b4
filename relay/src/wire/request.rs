use bytes::Bytes;
use http::{Method, Uri};
use http_body::Body;
use http_body_util::BodyExt;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::base64_body;
use super::body::RelayBody;
use crate::errors::{RelayError, RelayResult};

/// HTTP request as carried over the bus
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedRequest {
    pub method: String,
    pub url: String,
    #[serde(with = "base64_body", default)]
    pub body: Bytes,
}

impl SerializedRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            body: body.into(),
        }
    }

    pub fn to_payload(&self) -> RelayResult<Bytes> {
        serde_json::to_vec(self)
            .map(Bytes::from)
            .map_err(|e| RelayError::decode(format!("failed to serialize request: {}", e)))
    }

    pub fn from_payload(payload: &[u8]) -> RelayResult<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}

/// Serializes an outgoing request, buffering its whole body.
///
/// The request is consumed; a body that fails mid-read yields `RelayError::Io`.
/// Requests without a body produce an empty one.
pub async fn encode_request<B>(request: http::Request<B>) -> RelayResult<SerializedRequest>
where
    B: Body,
    B::Error: Display,
{
    let (parts, body) = request.into_parts();

    let body = body
        .collect()
        .await
        .map_err(RelayError::io)?
        .to_bytes();

    Ok(SerializedRequest {
        method: parts.method.as_str().to_string(),
        url: parts.uri.to_string(),
        body,
    })
}

/// Rebuilds a request ready to hand to an executor.
pub fn decode_request(wire: &SerializedRequest) -> RelayResult<http::Request<RelayBody>> {
    if wire.method.is_empty() {
        return Err(RelayError::decode("request method is empty"));
    }

    let method = Method::from_bytes(wire.method.as_bytes())
        .map_err(|e| RelayError::decode(format!("method '{}': {}", wire.method, e)))?;

    let uri: Uri = wire.url.parse().map_err(|e: http::uri::InvalidUri| RelayError::Url {
        url: wire.url.clone(),
        reason: e.to_string(),
    })?;

    let mut request = http::Request::new(RelayBody::new(wire.body.clone()));
    *request.method_mut() = method;
    *request.uri_mut() = uri;
    Ok(request)
}
