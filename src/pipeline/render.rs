//! Text rendering of request and response metadata for log events.

use std::fmt::Write;

use hyper::header::{self, HeaderMap, HeaderName};
use hyper::{Method, StatusCode, Uri, Version};

const REDACTED: &str = "[redacted]";

fn is_sensitive(name: &HeaderName) -> bool {
    *name == header::AUTHORIZATION
        || *name == header::PROXY_AUTHORIZATION
        || *name == header::COOKIE
        || *name == header::SET_COOKIE
}

/// Single-line `{ name: value, ... }` block with credentials redacted.
pub fn headers(map: &HeaderMap) -> String {
    if map.is_empty() {
        return "{ }".to_string();
    }

    let mut out = String::from("{ ");
    for (i, (name, value)) in map.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let value = if is_sensitive(name) {
            REDACTED.into()
        } else {
            String::from_utf8_lossy(value.as_bytes())
        };
        let _ = write!(out, "{}: {}", name, value);
    }
    out.push_str(" }");
    out
}

pub fn request_block(method: &Method, uri: &Uri, version: Version, map: &HeaderMap) -> String {
    format!(
        "Method: {}, RequestUri: '{}', Version: {:?}, Headers: {}",
        method,
        uri,
        version,
        headers(map)
    )
}

pub fn response_block(status: StatusCode, version: Version, map: &HeaderMap) -> String {
    format!(
        "StatusCode: {}, ReasonPhrase: '{}', Version: {:?}, Headers: {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or(""),
        version,
        headers(map)
    )
}

/// Body as text, cut after `limit` bytes with a `... (N more bytes)` marker.
pub fn body_text(body: &[u8], limit: usize) -> String {
    if body.len() <= limit {
        return String::from_utf8_lossy(body).into_owned();
    }
    let mut text = String::from_utf8_lossy(&body[..limit]).into_owned();
    let _ = write!(text, "... ({} more bytes)", body.len() - limit);
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    #[test]
    fn request_block_redacts_credentials() {
        let mut map = HeaderMap::new();
        map.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        map.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer secret"));

        let uri: Uri = "https://graph.microsoft.com/v1.0/me".parse().unwrap();
        let block = request_block(&Method::GET, &uri, Version::HTTP_11, &map);

        assert_eq!(
            block,
            "Method: GET, RequestUri: 'https://graph.microsoft.com/v1.0/me', Version: HTTP/1.1, \
             Headers: { accept: application/json, authorization: [redacted] }"
        );
        assert!(!block.contains("secret"));
    }

    #[test]
    fn response_block_includes_reason() {
        let block = response_block(StatusCode::NOT_FOUND, Version::HTTP_11, &HeaderMap::new());
        assert_eq!(block, "StatusCode: 404, ReasonPhrase: 'Not Found', Version: HTTP/1.1, Headers: { }");
    }

    #[test]
    fn body_text_truncates_with_marker() {
        assert_eq!(body_text(b"hello", 10), "hello");
        assert_eq!(body_text(b"hello world", 5), "hello... (6 more bytes)");
    }
}
