//! HTTP transport port for outbound requests.

use std::error::Error;
use std::future::Future;
use std::pin::Pin;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Error type produced by transports. Kept boxed so any client library fits.
pub type TransportError = Box<dyn Error + Send + Sync>;

/// Boxed future type alias used by [`HttpTransport`] to keep the trait dyn-compatible.
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + Send + 'a>>;

/// A fully formed outbound HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// HTTP method, e.g. `"POST"`.
    pub method: String,
    /// Absolute request URI.
    pub uri: String,
    /// Header name/value pairs in send order. Names may repeat.
    pub headers: Vec<(String, String)>,
    /// Raw request payload.
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Creates a request with no headers and an empty body.
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self { method: method.into(), uri: uri.into(), headers: Vec::new(), body: Vec::new() }
    }

    /// Shorthand for a `GET` request.
    pub fn get(uri: impl Into<String>) -> Self {
        Self::new("GET", uri)
    }

    /// Shorthand for a `POST` request.
    pub fn post(uri: impl Into<String>) -> Self {
        Self::new("POST", uri)
    }

    /// Appends a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replaces the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Serializes `value` as the JSON body and sets `content-type`.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be serialized.
    pub fn with_json<T: Serialize>(self, value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        Ok(self.with_header("content-type", "application/json").with_body(body))
    }

    /// Returns the first value of the named header, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A response returned by a transport or replayed from a cassette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Numeric status code.
    pub status: u16,
    /// Status reason phrase, e.g. `"OK"`.
    pub message: String,
    /// Header name/value pairs. Names may repeat.
    pub headers: Vec<(String, String)>,
    /// Raw response payload.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response with no headers and an empty body.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self { status, message: message.into(), headers: Vec::new(), body: Vec::new() }
    }

    /// Appends a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replaces the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the first value of the named header, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Returns `true` for 2xx status codes.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the body as text, replacing invalid UTF-8 sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
}

/// Performs HTTP requests.
///
/// Implemented by the live network client, by the cassette interceptor, and
/// by in-memory test doubles, so callers can be handed any of them.
pub trait HttpTransport: Send + Sync {
    /// Sends the request and resolves to the response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be completed (network, TLS,
    /// cassette miss, etc.). Non-2xx statuses are responses, not errors.
    fn send(&self, request: &HttpRequest) -> TransportFuture<'_>;
}
