//! Live adapter for the `HttpTransport` port using `reqwest`.

use reqwest::{Client, Method};

use crate::ports::http::{
    HttpRequest, HttpResponse, HttpTransport, TransportError, TransportFuture,
};

/// Live transport that performs real network calls.
pub struct LiveTransport {
    client: Client,
}

impl LiveTransport {
    /// Creates a live transport.
    ///
    /// With `decode_compressed` set, gzip, brotli, deflate and zstd bodies
    /// are decoded on arrival and `Content-Encoding` is dropped, so a
    /// recorded body is readable as stored. Without it, bodies arrive as
    /// sent on the wire.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(decode_compressed: bool) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .gzip(decode_compressed)
            .brotli(decode_compressed)
            .deflate(decode_compressed)
            .zstd(decode_compressed)
            .build()?;
        Ok(Self { client })
    }

    /// Wraps an existing client as-is.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for LiveTransport {
    fn default() -> Self {
        Self { client: Client::new() }
    }
}

impl HttpTransport for LiveTransport {
    fn send(&self, request: &HttpRequest) -> TransportFuture<'_> {
        let request = request.clone();

        Box::pin(async move {
            let method = Method::from_bytes(request.method.as_bytes())?;
            let mut builder = self.client.request(method, &request.uri);
            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }

            let response = builder.body(request.body).send().await?;

            let status = response.status();
            let headers = response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned())
                })
                .collect();
            let body = response.bytes().await?.to_vec();

            Ok::<_, TransportError>(HttpResponse {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or_default().to_string(),
                headers,
                body,
            })
        })
    }
}
