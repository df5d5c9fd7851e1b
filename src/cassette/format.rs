//! Cassette data structures for recording and replaying HTTP interactions.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ports::http::HttpResponse;

/// The only cassette layout this crate reads and writes.
pub const CASSETTE_VERSION: u32 = 1;

/// Persisted headers: name to every value sent under that name, in the
/// order each name was first seen.
pub type HeaderMap = IndexMap<String, Vec<String>>;

/// A persisted payload. UTF-8 payloads are stored as text so cassettes stay
/// readable; anything else is stored as base64.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Body {
    /// Payload as text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string: Option<String>,
    /// Payload as standard base64, for non-UTF-8 bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64_string: Option<String>,
}

impl Body {
    /// Encodes raw bytes, preferring the text form.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(text) => Self { string: Some(text.to_string()), base64_string: None },
            Err(_) => Self { string: None, base64_string: Some(STANDARD.encode(bytes)) },
        }
    }

    /// Decodes back to raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error unless exactly one form is present and, for base64,
    /// it decodes cleanly.
    pub fn to_bytes(&self) -> Result<Vec<u8>, String> {
        match (&self.string, &self.base64_string) {
            (Some(text), None) => Ok(text.as_bytes().to_vec()),
            (None, Some(encoded)) => {
                STANDARD.decode(encoded).map_err(|e| format!("invalid base64 body: {e}"))
            }
            (Some(_), Some(_)) => Err("body has both `string` and `base64_string`".into()),
            (None, None) => Err("body has neither `string` nor `base64_string`".into()),
        }
    }
}

/// The request half of an interaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Request URI, after query filtering.
    pub uri: String,
    /// HTTP method.
    pub method: String,
    /// Request payload.
    pub body: Body,
    /// Request headers, after header filtering.
    #[serde(default)]
    pub headers: HeaderMap,
}

/// Status line of a recorded response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Status {
    /// Numeric status code.
    pub code: u16,
    /// Reason phrase.
    pub message: String,
}

/// The response half of an interaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordedResponse {
    /// Status line.
    pub status: Status,
    /// Response headers, after header filtering.
    #[serde(default)]
    pub headers: HeaderMap,
    /// Response payload.
    pub body: Body,
}

/// A single recorded request/response pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Interaction {
    /// What was sent.
    pub request: RecordedRequest,
    /// What came back.
    pub response: RecordedResponse,
    /// When the exchange was recorded. Not used for matching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl Interaction {
    /// Rebuilds the response exactly as it was stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored body cannot be decoded.
    pub fn to_response(&self) -> Result<HttpResponse, String> {
        Ok(HttpResponse {
            status: self.response.status.code,
            message: self.response.status.message.clone(),
            headers: flatten_headers(&self.response.headers),
            body: self.response.body.to_bytes()?,
        })
    }
}

/// A cassette containing an ordered sequence of recorded interactions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cassette {
    /// Layout marker, always [`CASSETTE_VERSION`] when written by this crate.
    pub version: u32,
    /// Ordered list of interactions.
    #[serde(default)]
    pub interactions: Vec<Interaction>,
}

impl Default for Cassette {
    fn default() -> Self {
        Self { version: CASSETTE_VERSION, interactions: Vec::new() }
    }
}

impl Cassette {
    /// Checks the version marker and that every body decodes.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.version != CASSETTE_VERSION {
            return Err(format!(
                "unsupported cassette version {} (expected {CASSETTE_VERSION})",
                self.version
            ));
        }
        for (index, interaction) in self.interactions.iter().enumerate() {
            interaction
                .request
                .body
                .to_bytes()
                .map_err(|e| format!("interaction {index} request: {e}"))?;
            interaction
                .response
                .body
                .to_bytes()
                .map_err(|e| format!("interaction {index} response: {e}"))?;
        }
        Ok(())
    }
}

/// Groups header pairs by name, keeping value order.
#[must_use]
pub fn group_headers(headers: &[(String, String)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        map.entry(name.clone()).or_default().push(value.clone());
    }
    map
}

/// Expands a header map back into name/value pairs.
#[must_use]
pub fn flatten_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .flat_map(|(name, values)| values.iter().map(move |v| (name.clone(), v.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_cassette() -> Cassette {
        Cassette {
            version: CASSETTE_VERSION,
            interactions: vec![Interaction {
                request: RecordedRequest {
                    uri: "https://api.example.com/v1/x".into(),
                    method: "POST".into(),
                    body: Body::from_bytes(br#"{"a":1}"#),
                    headers: group_headers(&[("content-type".into(), "application/json".into())]),
                },
                response: RecordedResponse {
                    status: Status { code: 200, message: "OK".into() },
                    headers: group_headers(&[
                        ("set-cookie".into(), "a=1".into()),
                        ("set-cookie".into(), "b=2".into()),
                    ]),
                    body: Body::from_bytes(b"hello"),
                },
                recorded_at: None,
            }],
        }
    }

    #[test]
    fn yaml_layout_matches_documented_format() {
        let yaml = serde_yaml::to_string(&sample_cassette()).expect("serialize");
        let value: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(value["version"].as_u64(), Some(1));
        let first = &value["interactions"][0];
        assert_eq!(first["request"]["uri"].as_str(), Some("https://api.example.com/v1/x"));
        assert_eq!(first["request"]["body"]["string"].as_str(), Some(r#"{"a":1}"#));
        assert_eq!(first["response"]["status"]["code"].as_u64(), Some(200));
        assert_eq!(first["response"]["status"]["message"].as_str(), Some("OK"));
        assert!(first.get("recorded_at").is_none());
    }

    #[test]
    fn parses_hand_written_cassette() {
        let yaml = r#"
version: 1
interactions:
  - request:
      uri: https://api.example.com/v1/x
      method: POST
      body: { string: '{"a":1}' }
      headers:
        content-type: [application/json]
    response:
      status: { code: 201, message: Created }
      body: { string: done }
      headers: {}
"#;
        let cassette: Cassette = serde_yaml::from_str(yaml).unwrap();
        cassette.validate().unwrap();
        let response = cassette.interactions[0].to_response().unwrap();
        assert_eq!(response.status, 201);
        assert_eq!(response.message, "Created");
        assert_eq!(response.body, b"done");
    }

    #[test]
    fn binary_body_uses_base64() {
        let bytes = [0xff, 0x00, 0x8b, 0x1f];
        let body = Body::from_bytes(&bytes);
        assert!(body.string.is_none());
        assert_eq!(body.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn validate_rejects_other_versions_and_bad_bodies() {
        let mut cassette = sample_cassette();
        cassette.version = 2;
        assert!(cassette.validate().unwrap_err().contains("version 2"));

        let mut cassette = sample_cassette();
        cassette.interactions[0].response.body = Body::default();
        assert!(cassette.validate().unwrap_err().contains("interaction 0 response"));
    }

    #[test]
    fn header_grouping_preserves_repeated_values() {
        let cassette = sample_cassette();
        let response = cassette.interactions[0].to_response().unwrap();
        assert_eq!(
            response.headers,
            vec![("set-cookie".to_string(), "a=1".to_string()), ("set-cookie".into(), "b=2".into())]
        );
    }

    #[test]
    fn header_names_keep_first_seen_order_through_yaml() {
        let sent: Vec<(String, String)> = [("x-b", "1"), ("x-a", "2"), ("x-b", "3"), ("date", "d")]
            .iter()
            .map(|(n, v)| ((*n).to_string(), (*v).to_string()))
            .collect();
        let yaml = serde_yaml::to_string(&group_headers(&sent)).unwrap();
        let parsed: HeaderMap = serde_yaml::from_str(&yaml).unwrap();
        let names: Vec<&str> = parsed.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["x-b", "x-a", "date"]);
        assert_eq!(
            flatten_headers(&parsed),
            vec![
                ("x-b".to_string(), "1".to_string()),
                ("x-b".into(), "3".into()),
                ("x-a".into(), "2".into()),
                ("date".into(), "d".into()),
            ]
        );
    }
}
