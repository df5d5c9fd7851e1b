//! Recorder configuration: record mode, match and filter policies, paths.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::filter::FilterPolicy;
use super::matcher::MatchPolicy;
use super::name::CassetteName;
use crate::error::VcrError;

/// Environment variable that replaces the configured record mode.
pub const RECORD_MODE_ENV: &str = "TAPEDECK_RECORD_MODE";

/// Environment variable that turns recording and replay off entirely.
pub const DISABLE_ENV: &str = "TAPEDECK_DISABLE";

/// Environment variable that replaces the cassette library directory.
pub const CASSETTE_DIR_ENV: &str = "TAPEDECK_CASSETTE_DIR";

/// When to call the network and when to serve from the cassette.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordMode {
    /// Record if the cassette file is absent, otherwise replay only.
    #[default]
    Once,
    /// Replay matches, record misses and append them.
    NewEpisodes,
    /// Replay only; a miss is an error.
    None,
    /// Always call the network and re-record the whole cassette.
    All,
}

impl RecordMode {
    /// Returns the snake_case name used in config files and env vars.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Once => "once",
            Self::NewEpisodes => "new_episodes",
            Self::None => "none",
            Self::All => "all",
        }
    }
}

impl fmt::Display for RecordMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordMode {
    type Err = VcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "once" => Ok(Self::Once),
            "new_episodes" => Ok(Self::NewEpisodes),
            "none" => Ok(Self::None),
            "all" => Ok(Self::All),
            other => Err(VcrError::Config(format!(
                "unknown record mode {other:?} (expected once, new_episodes, none or all)"
            ))),
        }
    }
}

/// A request attribute compared when matching against stored interactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOn {
    /// Full URI string.
    Uri,
    /// HTTP method, compared exactly.
    Method,
    /// Raw body bytes.
    Body,
    /// Body compared as JSON when both sides parse, bytes otherwise.
    JsonBody,
    /// URI scheme.
    Scheme,
    /// URI host.
    Host,
    /// URI port, with scheme defaults applied.
    Port,
    /// URI path.
    Path,
    /// Query pairs, order-insensitive.
    Query,
}

impl MatchOn {
    /// Returns the snake_case name used in config files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uri => "uri",
            Self::Method => "method",
            Self::Body => "body",
            Self::JsonBody => "json_body",
            Self::Scheme => "scheme",
            Self::Host => "host",
            Self::Port => "port",
            Self::Path => "path",
            Self::Query => "query",
        }
    }
}

impl fmt::Display for MatchOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchOn {
    type Err = VcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uri" => Ok(Self::Uri),
            "method" => Ok(Self::Method),
            "body" => Ok(Self::Body),
            "json_body" => Ok(Self::JsonBody),
            "scheme" => Ok(Self::Scheme),
            "host" => Ok(Self::Host),
            "port" => Ok(Self::Port),
            "path" => Ok(Self::Path),
            "query" => Ok(Self::Query),
            other => Err(VcrError::Config(format!("unknown match attribute {other:?}"))),
        }
    }
}

/// Headers stripped from every cassette unless configured otherwise.
pub const DEFAULT_FILTER_HEADERS: &[&str] = &[
    "authorization",
    "api-key",
    "x-api-key",
    "x-goog-api-key",
    "anthropic-api-key",
    "openai-api-key",
    "cookie",
    "set-cookie",
];

/// Query parameters stripped from recorded URIs unless configured otherwise.
pub const DEFAULT_FILTER_QUERY_PARAMETERS: &[&str] = &["key", "api_key"];

/// Configuration handed to each interceptor at construction.
///
/// Built explicitly and passed by value; nothing here is process-global, so
/// tests running in parallel can use different settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VcrConfig {
    /// Record mode.
    pub record_mode: RecordMode,
    /// Directory holding cassette files.
    pub cassette_library_dir: PathBuf,
    /// Attributes compared when matching, in order.
    pub match_on: Vec<MatchOn>,
    /// Header names never persisted (case-insensitive).
    pub filter_headers: Vec<String>,
    /// Query parameter names removed from persisted URIs.
    pub filter_query_parameters: Vec<String>,
    /// Decode transport compression before storing response bodies.
    pub decode_compressed_response: bool,
    /// Pass loopback requests through untouched.
    pub ignore_localhost: bool,
    /// Further hosts passed through untouched.
    pub ignore_hosts: Vec<String>,
    /// Turn recording and replay off; every request goes live.
    pub disabled: bool,
}

impl Default for VcrConfig {
    fn default() -> Self {
        Self {
            record_mode: RecordMode::default(),
            cassette_library_dir: PathBuf::from("tests/cassettes"),
            match_on: vec![MatchOn::Uri, MatchOn::Method, MatchOn::Body],
            filter_headers: DEFAULT_FILTER_HEADERS.iter().map(ToString::to_string).collect(),
            filter_query_parameters: DEFAULT_FILTER_QUERY_PARAMETERS
                .iter()
                .map(ToString::to_string)
                .collect(),
            decode_compressed_response: true,
            ignore_localhost: true,
            ignore_hosts: Vec::new(),
            disabled: false,
        }
    }
}

impl VcrConfig {
    /// Loads configuration from a YAML file. Absent fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains unknown or
    /// ill-typed fields.
    pub fn from_yaml_file(path: &Path) -> Result<Self, VcrError> {
        let content = std::fs::read_to_string(path).map_err(|e| VcrError::io(path, e))?;
        Self::from_yaml_str(&content)
            .map_err(|e| VcrError::Config(format!("{}: {e}", path.display())))
    }

    /// Parses configuration from YAML text. Absent fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error on unknown or ill-typed fields.
    pub fn from_yaml_str(content: &str) -> Result<Self, VcrError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| VcrError::Config(e.to_string()))
    }

    /// Applies [`RECORD_MODE_ENV`], [`DISABLE_ENV`] and [`CASSETTE_DIR_ENV`]
    /// from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if either variable holds an unrecognized value.
    pub fn with_env_overrides(self) -> Result<Self, VcrError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies run-time overrides using `lookup` in place of the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if either variable holds an unrecognized value.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, VcrError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mode) = lookup(RECORD_MODE_ENV).filter(|v| !v.trim().is_empty()) {
            self.record_mode = mode.parse()?;
        }
        if let Some(flag) = lookup(DISABLE_ENV) {
            self.disabled = parse_flag(DISABLE_ENV, &flag)?;
        }
        if let Some(dir) = lookup(CASSETTE_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            self.cassette_library_dir = PathBuf::from(dir);
        }
        Ok(self)
    }

    /// Sets the record mode.
    #[must_use]
    pub fn with_record_mode(mut self, mode: RecordMode) -> Self {
        self.record_mode = mode;
        self
    }

    /// Sets the cassette directory.
    #[must_use]
    pub fn with_cassette_library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cassette_library_dir = dir.into();
        self
    }

    /// Replaces the match attributes.
    #[must_use]
    pub fn with_match_on(mut self, match_on: impl IntoIterator<Item = MatchOn>) -> Self {
        self.match_on = match_on.into_iter().collect();
        self
    }

    /// Replaces the filtered header names.
    #[must_use]
    pub fn with_filter_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Adds one filtered header name.
    #[must_use]
    pub fn with_filter_header(mut self, header: impl Into<String>) -> Self {
        self.filter_headers.push(header.into());
        self
    }

    /// Replaces the filtered query parameter names.
    #[must_use]
    pub fn with_filter_query_parameters<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter_query_parameters = params.into_iter().map(Into::into).collect();
        self
    }

    /// Sets whether compressed responses are decoded before storing.
    #[must_use]
    pub fn with_decode_compressed_response(mut self, decode: bool) -> Self {
        self.decode_compressed_response = decode;
        self
    }

    /// Sets whether loopback requests bypass the cassette.
    #[must_use]
    pub fn with_ignore_localhost(mut self, ignore: bool) -> Self {
        self.ignore_localhost = ignore;
        self
    }

    /// Replaces the extra bypassed hosts.
    #[must_use]
    pub fn with_ignore_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    /// Turns recording and replay off or on.
    #[must_use]
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// The filter policy described by this configuration.
    #[must_use]
    pub fn filter_policy(&self) -> FilterPolicy {
        FilterPolicy::new(self.filter_headers.as_slice(), self.filter_query_parameters.as_slice())
    }

    /// The match policy described by this configuration.
    #[must_use]
    pub fn match_policy(&self) -> MatchPolicy {
        MatchPolicy::new(self.match_on.clone())
    }

    /// Path of the cassette file for `name`.
    #[must_use]
    pub fn cassette_path(&self, name: &CassetteName) -> PathBuf {
        name.path_in(&self.cassette_library_dir)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, VcrError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(VcrError::Config(format!("{key} must be a boolean, got {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = VcrConfig::default();
        assert_eq!(config.record_mode, RecordMode::Once);
        assert_eq!(config.match_on, vec![MatchOn::Uri, MatchOn::Method, MatchOn::Body]);
        assert!(config.filter_headers.iter().any(|h| h == "authorization"));
        assert!(config.filter_headers.iter().any(|h| h == "x-api-key"));
        assert!(config.decode_compressed_response);
        assert!(config.ignore_localhost);
        assert!(!config.disabled);
    }

    #[test]
    fn record_mode_parses_names() {
        assert_eq!("once".parse::<RecordMode>().unwrap(), RecordMode::Once);
        assert_eq!("new_episodes".parse::<RecordMode>().unwrap(), RecordMode::NewEpisodes);
        assert_eq!("New-Episodes".parse::<RecordMode>().unwrap(), RecordMode::NewEpisodes);
        assert_eq!("none".parse::<RecordMode>().unwrap(), RecordMode::None);
        assert_eq!("ALL".parse::<RecordMode>().unwrap(), RecordMode::All);
        assert!("sometimes".parse::<RecordMode>().is_err());
        assert_eq!(RecordMode::NewEpisodes.to_string(), "new_episodes");
    }

    #[test]
    fn yaml_file_fields_override_defaults() {
        let config = VcrConfig::from_yaml_str(
            "record_mode: none\n\
             cassette_library_dir: fixtures/tapes\n\
             match_on: [method, json_body]\n\
             filter_headers: [authorization]\n\
             ignore_localhost: false\n",
        )
        .unwrap();
        assert_eq!(config.record_mode, RecordMode::None);
        assert_eq!(config.cassette_library_dir, PathBuf::from("fixtures/tapes"));
        assert_eq!(config.match_on, vec![MatchOn::Method, MatchOn::JsonBody]);
        assert_eq!(config.filter_headers, vec!["authorization".to_string()]);
        assert!(!config.ignore_localhost);
        assert!(config.decode_compressed_response);
    }

    #[test]
    fn yaml_rejects_unknown_fields() {
        let err = VcrConfig::from_yaml_str("recordmode: none\n").unwrap_err();
        assert!(matches!(err, VcrError::Config(_)));
    }

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(VcrConfig::from_yaml_str("  \n").unwrap(), VcrConfig::default());
    }

    #[test]
    fn env_overrides_mode_and_disable() {
        let config = VcrConfig::default()
            .with_overrides_from(env(&[
                (RECORD_MODE_ENV, "all"),
                (DISABLE_ENV, "yes"),
                (CASSETTE_DIR_ENV, "/tmp/tapes"),
            ]))
            .unwrap();
        assert_eq!(config.record_mode, RecordMode::All);
        assert!(config.disabled);
        assert_eq!(config.cassette_library_dir, PathBuf::from("/tmp/tapes"));

        let untouched = VcrConfig::default().with_overrides_from(env(&[])).unwrap();
        assert_eq!(untouched, VcrConfig::default());
    }

    #[test]
    fn env_overrides_reject_garbage() {
        assert!(VcrConfig::default()
            .with_overrides_from(env(&[(RECORD_MODE_ENV, "replay")]))
            .is_err());
        assert!(VcrConfig::default().with_overrides_from(env(&[(DISABLE_ENV, "maybe")])).is_err());
    }

    #[test]
    fn cassette_path_joins_library_dir() {
        let config = VcrConfig::default().with_cassette_library_dir("/tmp/tapes");
        let name = CassetteName::new("suite/demo").unwrap();
        assert_eq!(config.cassette_path(&name), PathBuf::from("/tmp/tapes/suite/demo.yaml"));
    }
}
