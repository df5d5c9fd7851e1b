//! Error types surfaced by the recorder/replayer.

use std::path::PathBuf;

use thiserror::Error;

use crate::ports::http::TransportError;

/// Errors returned by cassette loading and request interception.
#[derive(Debug, Error)]
pub enum VcrError {
    /// No stored interaction matched and the record mode forbids a live call.
    #[error("cassette miss in {cassette}: no unconsumed interaction matches {request}")]
    CassetteMiss {
        /// Name of the cassette that was searched.
        cassette: String,
        /// Signature of the request that failed to match.
        request: String,
    },

    /// The cassette file exists but cannot be parsed into interactions.
    #[error("cassette corrupt at {}: {reason}", path.display())]
    CassetteCorrupt {
        /// Path of the offending file.
        path: PathBuf,
        /// Parser or validation message.
        reason: String,
    },

    /// The real network call failed while recording.
    #[error("live request failed: {0}")]
    Transport(#[source] TransportError),

    /// Reading or writing a cassette file failed.
    #[error("cassette I/O failed at {}: {source}", path.display())]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration value or cassette name.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl VcrError {
    /// Returns `true` for [`VcrError::CassetteMiss`].
    #[must_use]
    pub fn is_miss(&self) -> bool {
        matches!(self, Self::CassetteMiss { .. })
    }

    /// Returns `true` for [`VcrError::CassetteCorrupt`].
    #[must_use]
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::CassetteCorrupt { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CassetteCorrupt { path: path.into(), reason: reason.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_message_names_cassette_and_request() {
        let err = VcrError::CassetteMiss {
            cassette: "demo".into(),
            request: "POST https://api.example.com/v1/x".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("demo"));
        assert!(msg.contains("POST https://api.example.com/v1/x"));
        assert!(err.is_miss());
        assert!(!err.is_corrupt());
    }

    #[test]
    fn corrupt_message_names_path() {
        let err = VcrError::corrupt("/tmp/demo.yaml", "bad yaml");
        assert_eq!(err.to_string(), "cassette corrupt at /tmp/demo.yaml: bad yaml");
        assert!(err.is_corrupt());
    }
}
