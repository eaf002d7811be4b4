//! Wire codec between `http` types and bus payloads
//!
//! Requests and responses travel as JSON documents with camelCase field names.
//! Bodies are fully buffered and carried as base64 strings, header maps as
//! `{ "name": ["value", ...] }`.
//!
//! ```text
//! http::Request  --encode_request-->  SerializedRequest  --to_payload-->  bytes
//! http::Response <--decode_response-- SerializedResponse <--from_payload-- bytes
//! ```
//!
//! Bodies are collected before anything is published; there is no streaming
//! across the bus.
//!
//! Header names are written lowercase, as `http::HeaderMap` stores them, even
//! when the peer sent `Content-Type`. Names are matched case-insensitively on
//! decode, so mixed-case maps from other implementations are accepted.

pub mod body;
pub mod request;
pub mod response;

pub use body::{BoxedBody, RelayBody};
pub use request::{decode_request, encode_request, SerializedRequest};
pub use response::{
    decode_response, encode_response, DecodedResponse, ResponseFraming, SerializedResponse,
};

use std::collections::BTreeMap;

use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;

use crate::errors::{RelayError, RelayResult};

/// Header or trailer map as it appears on the wire
pub type HeaderValues = BTreeMap<String, Vec<String>>;

/// Flattens a `HeaderMap`, keeping every value of repeated headers in order.
pub(crate) fn header_values(headers: &HeaderMap) -> HeaderValues {
    let mut values = HeaderValues::new();
    for name in headers.keys() {
        let entries = headers
            .get_all(name)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .collect();
        values.insert(name.as_str().to_string(), entries);
    }
    values
}

pub(crate) fn header_map(values: &HeaderValues) -> RelayResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, entries) in values {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| RelayError::decode(format!("header name '{}': {}", name, e)))?;
        for entry in entries {
            let value = HeaderValue::from_str(entry)
                .map_err(|e| RelayError::decode(format!("header '{}': {}", name, e)))?;
            headers.append(header_name.clone(), value);
        }
    }
    Ok(headers)
}

/// Serde adapter storing body bytes as standard base64
pub(crate) mod base64_body {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}
