//! Filter policy: credentials that must never reach a cassette file.

use std::collections::BTreeSet;

use reqwest::Url;

use super::format::{HeaderMap, Interaction};

/// Header names and query parameters stripped before persisting.
///
/// All names are compared case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPolicy {
    headers: BTreeSet<String>,
    query_parameters: BTreeSet<String>,
}

impl FilterPolicy {
    /// Builds a policy from header and query parameter names.
    #[must_use]
    pub fn new<H, Q>(headers: &[H], query_parameters: &[Q]) -> Self
    where
        H: AsRef<str>,
        Q: AsRef<str>,
    {
        Self {
            headers: headers.iter().map(|h| h.as_ref().trim().to_ascii_lowercase()).collect(),
            query_parameters: query_parameters
                .iter()
                .map(|q| q.as_ref().trim().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Returns `true` if `name` must not be persisted.
    #[must_use]
    pub fn is_filtered_header(&self, name: &str) -> bool {
        self.headers.contains(&name.to_ascii_lowercase())
    }

    /// Returns `true` if the query parameter `name` must not be persisted.
    #[must_use]
    pub fn is_filtered_query_parameter(&self, name: &str) -> bool {
        self.query_parameters.contains(&name.to_ascii_lowercase())
    }

    /// Drops filtered pairs, keeping the order of the rest.
    #[must_use]
    pub fn filter_headers(&self, headers: &[(String, String)]) -> Vec<(String, String)> {
        headers.iter().filter(|(name, _)| !self.is_filtered_header(name)).cloned().collect()
    }

    /// Drops filtered names from a persisted header map.
    #[must_use]
    pub fn filter_header_map(&self, headers: &HeaderMap) -> HeaderMap {
        headers
            .iter()
            .filter(|(name, _)| !self.is_filtered_header(name))
            .map(|(name, values)| (name.clone(), values.clone()))
            .collect()
    }

    /// Removes filtered query parameters from `uri`.
    ///
    /// URIs with nothing to remove, or that do not parse, come back unchanged.
    #[must_use]
    pub fn filter_uri(&self, uri: &str) -> String {
        if self.query_parameters.is_empty() {
            return uri.to_string();
        }
        let Ok(mut url) = Url::parse(uri) else {
            return uri.to_string();
        };
        let pairs: Vec<(String, String)> =
            url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
        let kept: Vec<&(String, String)> =
            pairs.iter().filter(|(k, _)| !self.is_filtered_query_parameter(k)).collect();
        if kept.len() == pairs.len() {
            return uri.to_string();
        }
        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
        url.to_string()
    }

    /// Returns a copy of `interaction` with the policy applied throughout.
    #[must_use]
    pub fn scrub(&self, interaction: &Interaction) -> Interaction {
        let mut scrubbed = interaction.clone();
        scrubbed.request.uri = self.filter_uri(&interaction.request.uri);
        scrubbed.request.headers = self.filter_header_map(&interaction.request.headers);
        scrubbed.response.headers = self.filter_header_map(&interaction.response.headers);
        scrubbed
    }

    /// Lists what `interaction` persists that this policy would strip.
    #[must_use]
    pub fn leaks(&self, interaction: &Interaction) -> Vec<String> {
        let mut found = Vec::new();
        for name in interaction.request.headers.keys() {
            if self.is_filtered_header(name) {
                found.push(format!("request header {name}"));
            }
        }
        for name in interaction.response.headers.keys() {
            if self.is_filtered_header(name) {
                found.push(format!("response header {name}"));
            }
        }
        if let Ok(url) = Url::parse(&interaction.request.uri) {
            for (key, _) in url.query_pairs() {
                if self.is_filtered_query_parameter(&key) {
                    found.push(format!("query parameter {key}"));
                }
            }
        }
        found
    }
}
