//! Common test data and request builders

use bytes::Bytes;
use http_body_util::{Empty, Full};

/// Common test subjects
pub mod subjects {
    pub const ECHO: &str = "request.echo";
    pub const WILDCARD: &str = "request.*";
    pub const UNUSED: &str = "request.nobody";
}

/// Common queue group names
pub mod queues {
    pub const WORKERS: &str = "workers";
}

/// Common target URLs
pub mod urls {
    pub const EXAMPLE: &str = "http://example.test/";
    pub const UPLOAD: &str = "http://example.test/upload?id=7";
}

pub fn get(url: &str) -> http::Request<Empty<Bytes>> {
    http::Request::get(url)
        .body(Empty::new())
        .expect("valid request")
}

pub fn post(url: &str, body: impl Into<Bytes>) -> http::Request<Full<Bytes>> {
    http::Request::post(url)
        .body(Full::new(body.into()))
        .expect("valid request")
}

/// Bytes that are not valid UTF-8, to prove bodies survive untouched
pub fn binary_body() -> Bytes {
    Bytes::from_static(&[0x00, 0xff, 0xfe, 0x80, 0x7f, b'\n', 0xc3])
}
