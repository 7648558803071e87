//! Buffered view of an inbound request

use bytes::Bytes;
use tapedeck_core::Headers;

/// An inbound request with its body fully read
///
/// The body is buffered once so matching and recording see the same bytes.
#[derive(Debug, Clone)]
pub struct LiveRequest {
    pub method: http::Method,
    pub uri: http::Uri,
    pub headers: Headers,
    pub body: Bytes,
}

impl LiveRequest {
    pub fn new(method: http::Method, uri: http::Uri, headers: Headers, body: Bytes) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
        }
    }

    pub fn from_parts(parts: &http::request::Parts, body: Bytes) -> Self {
        Self::new(
            parts.method.clone(),
            parts.uri.clone(),
            Headers::from_http(&parts.headers),
            body,
        )
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Path plus `?query` when a query is present
    pub fn path_and_query(&self) -> &str {
        self.uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }
}
