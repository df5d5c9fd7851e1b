//! Decoding of `Content-Encoding` compressed response bodies.

use std::io::Read;

use flate2::read::{DeflateDecoder, MultiGzDecoder, ZlibDecoder};
use tracing::warn;

use crate::ports::http::HttpResponse;

const BROTLI_BUFFER: usize = 4096;

/// Undoes every coding listed in a `Content-Encoding` value.
///
/// Codings are removed in reverse order of application. `identity` is a
/// no-op.
///
/// # Errors
///
/// Returns an error for an unsupported coding or a body that does not
/// decode.
pub fn decode(content_encoding: &str, body: &[u8]) -> Result<Vec<u8>, String> {
    let mut bytes = body.to_vec();
    for coding in content_encoding.split(',').rev() {
        let coding = coding.trim().to_ascii_lowercase();
        bytes = match coding.as_str() {
            "" | "identity" => bytes,
            "gzip" | "x-gzip" => read_all(MultiGzDecoder::new(bytes.as_slice()), &coding)?,
            "deflate" => inflate(&bytes)?,
            "br" => read_all(brotli::Decompressor::new(bytes.as_slice(), BROTLI_BUFFER), &coding)?,
            "zstd" => zstd::stream::decode_all(bytes.as_slice())
                .map_err(|e| format!("zstd body does not decode: {e}"))?,
            other => return Err(format!("unsupported content-encoding {other:?}")),
        };
    }
    Ok(bytes)
}

/// Returns `response` with its body decoded and `Content-Encoding` removed.
///
/// `Content-Length` is dropped with it since it described the compressed
/// body. A response that fails to decode is returned as received.
#[must_use]
pub fn decode_response(response: HttpResponse) -> HttpResponse {
    let Some(encoding) = response.header("content-encoding").map(str::to_string) else {
        return response;
    };
    let body = match decode(&encoding, &response.body) {
        Ok(body) => body,
        Err(reason) => {
            warn!(%encoding, %reason, "keeping response body as received");
            return response;
        }
    };
    let HttpResponse { status, message, headers, .. } = response;
    let headers = headers
        .into_iter()
        .filter(|(name, _)| {
            !name.eq_ignore_ascii_case("content-encoding")
                && !name.eq_ignore_ascii_case("content-length")
        })
        .collect();
    HttpResponse { status, message, headers, body }
}

// `deflate` is zlib-wrapped per RFC 9110, but raw deflate is common in the wild.
fn inflate(bytes: &[u8]) -> Result<Vec<u8>, String> {
    read_all(ZlibDecoder::new(bytes), "deflate")
        .or_else(|_| read_all(DeflateDecoder::new(bytes), "deflate"))
}

fn read_all(mut reader: impl Read, coding: &str) -> Result<Vec<u8>, String> {
    let mut out = Vec::new();
    reader
        .read_to_end(&mut out)
        .map_err(|e| format!("{coding} body does not decode: {e}"))?;
    Ok(out)
}
