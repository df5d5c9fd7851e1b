//! Match policy: deciding whether an incoming request equals a stored one.

use reqwest::Url;

use super::config::MatchOn;

/// Borrowed view of the request attributes that matching looks at.
#[derive(Debug, Clone, Copy)]
pub struct RequestView<'a> {
    /// HTTP method.
    pub method: &'a str,
    /// URI after query filtering.
    pub uri: &'a str,
    /// Raw body bytes.
    pub body: &'a [u8],
}

impl RequestView<'_> {
    /// Human-readable identification used in miss errors and logs.
    #[must_use]
    pub fn signature(&self) -> String {
        const PREVIEW: usize = 80;
        if self.body.is_empty() {
            return format!("{} {}", self.method, self.uri);
        }
        let text = String::from_utf8_lossy(self.body);
        let preview: String = text.chars().take(PREVIEW).collect();
        let ellipsis = if text.chars().count() > PREVIEW { "..." } else { "" };
        format!(
            "{} {} (body {} bytes: {preview}{ellipsis})",
            self.method,
            self.uri,
            self.body.len()
        )
    }
}

/// Ordered set of attributes that must all be equal for a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPolicy {
    on: Vec<MatchOn>,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self::new(vec![MatchOn::Uri, MatchOn::Method, MatchOn::Body])
    }
}

impl MatchPolicy {
    /// Creates a policy comparing the given attributes.
    #[must_use]
    pub fn new(on: Vec<MatchOn>) -> Self {
        Self { on }
    }

    /// The compared attributes, in evaluation order.
    #[must_use]
    pub fn attributes(&self) -> &[MatchOn] {
        &self.on
    }

    /// Returns `true` if every configured attribute is equal.
    #[must_use]
    pub fn matches(&self, incoming: &RequestView<'_>, stored: &RequestView<'_>) -> bool {
        self.on.iter().all(|attr| attribute_matches(*attr, incoming, stored))
    }
}

fn attribute_matches(attr: MatchOn, a: &RequestView<'_>, b: &RequestView<'_>) -> bool {
    match attr {
        MatchOn::Uri => a.uri == b.uri,
        MatchOn::Method => a.method == b.method,
        MatchOn::Body => a.body == b.body,
        MatchOn::JsonBody => json_body_eq(a.body, b.body),
        MatchOn::Scheme => url_part_eq(a.uri, b.uri, |u| u.scheme().to_string()),
        MatchOn::Host => url_part_eq(a.uri, b.uri, |u| {
            u.host_str().map(str::to_ascii_lowercase).unwrap_or_default()
        }),
        MatchOn::Port => url_part_eq(a.uri, b.uri, Url::port_or_known_default),
        MatchOn::Path => url_part_eq(a.uri, b.uri, |u| u.path().to_string()),
        MatchOn::Query => url_part_eq(a.uri, b.uri, |u| {
            let mut pairs: Vec<(String, String)> =
                u.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
            pairs.sort();
            pairs
        }),
    }
}

fn json_body_eq(a: &[u8], b: &[u8]) -> bool {
    if a == b {
        return true;
    }
    match (
        serde_json::from_slice::<serde_json::Value>(a),
        serde_json::from_slice::<serde_json::Value>(b),
    ) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    }
}

/// Compares one parsed component; unparseable URIs only match themselves.
fn url_part_eq<T, F>(a: &str, b: &str, part: F) -> bool
where
    T: PartialEq,
    F: Fn(&Url) -> T,
{
    match (Url::parse(a), Url::parse(b)) {
        (Ok(x), Ok(y)) => part(&x) == part(&y),
        _ => a == b,
    }
}
