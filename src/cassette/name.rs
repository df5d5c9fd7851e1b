//! Cassette names derived from test identity.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::VcrError;

/// File extension of cassette files.
pub const CASSETTE_EXTENSION: &str = "yaml";

/// Validated cassette name: `/`-separated segments of `[A-Za-z0-9_.-]`.
///
/// Names map one-to-one to files under the cassette library directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CassetteName(String);

impl CassetteName {
    /// Validates `name`. A trailing `.yaml` is accepted and dropped.
    ///
    /// # Errors
    ///
    /// Returns an error for empty names, empty or dot-only segments, and
    /// characters outside `[A-Za-z0-9_.-]`.
    pub fn new(name: impl AsRef<str>) -> Result<Self, VcrError> {
        let raw = name.as_ref().trim();
        let raw = raw.strip_suffix(".yaml").unwrap_or(raw);
        if raw.is_empty() {
            return Err(VcrError::Config("cassette name is empty".into()));
        }
        for segment in raw.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(VcrError::Config(format!(
                    "cassette name {raw:?} has an invalid segment {segment:?}"
                )));
            }
            if let Some(bad) = segment.chars().find(|c| !is_name_char(*c)) {
                return Err(VcrError::Config(format!(
                    "cassette name {raw:?} contains invalid character {bad:?}"
                )));
            }
        }
        Ok(Self(raw.to_string()))
    }

    /// Derives a name from a Rust item path such as `suite::tests::my_test`.
    ///
    /// `::` becomes `/`, `{{closure}}` segments are dropped, and characters
    /// outside the name alphabet become `_`.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing usable remains.
    pub fn from_test_path(path: &str) -> Result<Self, VcrError> {
        let segments: Vec<String> = path
            .split("::")
            .filter(|s| !s.is_empty() && *s != "{{closure}}")
            .map(|s| s.chars().map(|c| if is_name_char(c) { c } else { '_' }).collect())
            .collect();
        Self::new(segments.join("/"))
    }

    /// The name as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The cassette file for this name under `dir`.
    #[must_use]
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        let mut path = dir.to_path_buf();
        let mut segments = self.0.split('/').peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_some() {
                path.push(segment);
            } else {
                // set_extension would clobber dotted names like `model.v1`
                path.push(format!("{segment}.{CASSETTE_EXTENSION}"));
            }
        }
        path
    }
}

impl fmt::Display for CassetteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// Evaluates to the [`CassetteName`] of the enclosing function.
///
/// Works inside `#[test]` and `#[tokio::test]` functions alike, giving every
/// test its own cassette without a hand-written name.
///
/// ```
/// fn my_test() {
///     let name = tapedeck::test_cassette!().unwrap();
///     assert!(name.as_str().ends_with("my_test"));
/// }
/// # my_test();
/// ```
#[macro_export]
macro_rules! test_cassette {
    () => {{
        fn __tapedeck_here() {}
        fn __tapedeck_type_name<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let path = __tapedeck_type_name(__tapedeck_here);
        $crate::cassette::name::CassetteName::from_test_path(
            path.strip_suffix("::__tapedeck_here").unwrap_or(path),
        )
    }};
}
