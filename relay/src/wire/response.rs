use bytes::Bytes;
use http::header::{CONNECTION, CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{StatusCode, Version};
use http_body::Body;
use http_body_util::BodyExt;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::body::RelayBody;
use super::{base64_body, header_map, header_values, HeaderValues};
use crate::errors::{RelayError, RelayResult, RemoteError};

/// HTTP response as carried over the bus.
///
/// When `error` is set the agent failed before it had a response, and every
/// other field keeps its default value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SerializedResponse {
    /// Status line, e.g. "200 OK"
    pub status: String,
    pub status_code: u16,
    /// Protocol, e.g. "HTTP/1.1"
    pub proto: String,
    pub proto_major: u8,
    pub proto_minor: u8,
    pub headers: HeaderValues,
    #[serde(with = "base64_body")]
    pub body: Bytes,
    /// -1 when unknown
    pub content_length: i64,
    pub transfer_encoding: Vec<String>,
    pub close_connection: bool,
    pub trailers: HeaderValues,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SerializedResponse {
    /// Reply carrying only an error
    pub fn failure(error: &RelayError) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    /// The reported error, if any. An empty string counts as no error.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref().filter(|message| !message.is_empty())
    }

    pub fn to_payload(&self) -> RelayResult<Bytes> {
        serde_json::to_vec(self)
            .map(Bytes::from)
            .map_err(|e| RelayError::decode(format!("failed to serialize response: {}", e)))
    }

    pub fn from_payload(payload: &[u8]) -> RelayResult<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}

/// Response metadata that `http::Response` has no slot for.
///
/// `decode_response` attaches it as an extension and `encode_response` prefers
/// it over values derived from headers, so a decoded response re-encodes to the
/// same wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFraming {
    pub status: String,
    pub content_length: i64,
    pub transfer_encoding: Vec<String>,
    pub close_connection: bool,
}

impl ResponseFraming {
    fn from_parts(parts: &http::response::Parts) -> Self {
        let content_length = parts
            .headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok())
            .unwrap_or(-1);

        let transfer_encoding = parts
            .headers
            .get_all(TRANSFER_ENCODING)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .map(|coding| coding.trim().to_string())
            .filter(|coding| !coding.is_empty())
            .collect();

        let close_connection = parts
            .headers
            .get_all(CONNECTION)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .any(|value| value.split(',').any(|v| v.trim().eq_ignore_ascii_case("close")));

        Self {
            status: status_line(parts.status),
            content_length,
            transfer_encoding,
            close_connection,
        }
    }
}

/// Result of decoding a reply.
///
/// Exactly one side is set. A reply carrying an error has no native response
/// and therefore no status code.
#[derive(Debug)]
pub struct DecodedResponse {
    pub response: Option<http::Response<RelayBody>>,
    pub error: Option<RemoteError>,
}

impl DecodedResponse {
    pub fn into_result(self) -> RelayResult<http::Response<RelayBody>> {
        match (self.response, self.error) {
            (_, Some(error)) => Err(RelayError::Remote(error)),
            (Some(response), None) => Ok(response),
            (None, None) => Err(RelayError::decode("reply carried neither response nor error")),
        }
    }
}

/// Serializes a response, buffering its whole body and trailers.
///
/// A body read error yields `RelayError::Io`; whatever was read is dropped.
pub async fn encode_response<B>(response: http::Response<B>) -> RelayResult<SerializedResponse>
where
    B: Body,
    B::Error: Display,
{
    let (parts, body) = response.into_parts();

    let framing = parts
        .extensions
        .get::<ResponseFraming>()
        .cloned()
        .unwrap_or_else(|| ResponseFraming::from_parts(&parts));

    let collected = body.collect().await.map_err(RelayError::io)?;
    let trailers = collected
        .trailers()
        .map(header_values)
        .unwrap_or_default();
    let body = collected.to_bytes();

    let (proto, proto_major, proto_minor) = protocol(parts.version);

    Ok(SerializedResponse {
        status: framing.status,
        status_code: parts.status.as_u16(),
        proto: proto.to_string(),
        proto_major,
        proto_minor,
        headers: header_values(&parts.headers),
        body,
        content_length: framing.content_length,
        transfer_encoding: framing.transfer_encoding,
        close_connection: framing.close_connection,
        trailers,
        error: None,
    })
}

/// Rebuilds a response from a reply.
///
/// Fails only when a reply without an error carries an invalid status code,
/// protocol or header.
pub fn decode_response(wire: SerializedResponse) -> RelayResult<DecodedResponse> {
    if let Some(message) = wire.error() {
        let error = RemoteError {
            message: message.to_string(),
            response: Box::new(wire.clone()),
        };
        return Ok(DecodedResponse {
            response: None,
            error: Some(error),
        });
    }

    let status = StatusCode::from_u16(wire.status_code)
        .map_err(|e| RelayError::decode(format!("status code {}: {}", wire.status_code, e)))?;
    let version = version(wire.proto_major, wire.proto_minor)?;
    let headers = header_map(&wire.headers)?;
    let trailers = header_map(&wire.trailers)?;

    let mut response = http::Response::new(RelayBody::new(wire.body).with_trailers(trailers));
    *response.status_mut() = status;
    *response.version_mut() = version;
    *response.headers_mut() = headers;
    response.extensions_mut().insert(ResponseFraming {
        status: wire.status,
        content_length: wire.content_length,
        transfer_encoding: wire.transfer_encoding,
        close_connection: wire.close_connection,
    });

    Ok(DecodedResponse {
        response: Some(response),
        error: None,
    })
}

fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_str(), reason),
        None => status.as_str().to_string(),
    }
}

fn protocol(version: Version) -> (&'static str, u8, u8) {
    match version {
        Version::HTTP_09 => ("HTTP/0.9", 0, 9),
        Version::HTTP_10 => ("HTTP/1.0", 1, 0),
        Version::HTTP_2 => ("HTTP/2.0", 2, 0),
        Version::HTTP_3 => ("HTTP/3.0", 3, 0),
        _ => ("HTTP/1.1", 1, 1),
    }
}

fn version(major: u8, minor: u8) -> RelayResult<Version> {
    match (major, minor) {
        (0, 9) => Ok(Version::HTTP_09),
        (1, 0) => Ok(Version::HTTP_10),
        (1, 1) => Ok(Version::HTTP_11),
        (2, 0) => Ok(Version::HTTP_2),
        (3, 0) => Ok(Version::HTTP_3),
        _ => Err(RelayError::decode(format!(
            "unsupported protocol version {}.{}",
            major, minor
        ))),
    }
}
