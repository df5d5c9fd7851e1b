//! Reading and writing cassette files.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use uuid::Uuid;

use super::format::Cassette;
use super::name::{CassetteName, CASSETTE_EXTENSION};
use crate::error::VcrError;

/// Loads a cassette file.
///
/// Returns `Ok(None)` when the file does not exist.
///
/// # Errors
///
/// Returns [`VcrError::CassetteCorrupt`] if the file does not parse or fails
/// validation, and [`VcrError::Io`] for other read failures.
pub fn load(path: &Path) -> Result<Option<Cassette>, VcrError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no cassette on disk");
            return Ok(None);
        }
        Err(e) if e.kind() == ErrorKind::InvalidData => {
            return Err(VcrError::corrupt(path, format!("not valid UTF-8: {e}")));
        }
        Err(e) => return Err(VcrError::io(path, e)),
    };
    let cassette: Cassette =
        serde_yaml::from_str(&content).map_err(|e| VcrError::corrupt(path, e.to_string()))?;
    cassette.validate().map_err(|reason| VcrError::corrupt(path, reason))?;
    debug!(path = %path.display(), interactions = cassette.interactions.len(), "loaded cassette");
    Ok(Some(cassette))
}

/// Writes a cassette file, replacing any previous content.
///
/// The YAML is written to a temporary sibling and renamed into place, so
/// readers see either the old file or the new one.
///
/// # Errors
///
/// Returns [`VcrError::Io`] if the directory or file cannot be written.
pub fn save(path: &Path, cassette: &Cassette) -> Result<(), VcrError> {
    let yaml = serde_yaml::to_string(cassette)
        .map_err(|e| VcrError::io(path, std::io::Error::other(e)))?;

    let parent = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| VcrError::io(parent, e))?;

    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("cassette");
    let tmp = parent.join(format!(".{file_name}.{}.tmp", Uuid::new_v4()));
    std::fs::write(&tmp, yaml).map_err(|e| VcrError::io(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(VcrError::io(path, e));
    }

    info!(path = %path.display(), interactions = cassette.interactions.len(), "wrote cassette");
    Ok(())
}

/// A cassette file found by [`list`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ListedCassette {
    /// Path relative to the listed directory with `/` separators and the
    /// final `.yaml` removed. Not necessarily a valid [`CassetteName`].
    pub label: String,
    /// The file itself.
    pub path: PathBuf,
}

impl ListedCassette {
    /// The cassette name for this file, if the label is a valid one.
    #[must_use]
    pub fn name(&self) -> Option<CassetteName> {
        CassetteName::new(&self.label).ok().filter(|n| n.as_str() == self.label)
    }
}

/// Lists every cassette file below `dir`, sorted by label.
///
/// Every `*.yaml` file is returned, including ones whose names could not
/// be produced by [`CassetteName`], so audits see the whole directory. A
/// missing directory holds no cassettes. Hidden files are skipped.
///
/// # Errors
///
/// Returns [`VcrError::Io`] if a directory cannot be read.
pub fn list(dir: &Path) -> Result<Vec<ListedCassette>, VcrError> {
    let mut found = Vec::new();
    if dir.exists() {
        collect(dir, dir, &mut found)?;
    }
    found.sort();
    Ok(found)
}

fn collect(root: &Path, dir: &Path, found: &mut Vec<ListedCassette>) -> Result<(), VcrError> {
    let entries = std::fs::read_dir(dir).map_err(|e| VcrError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| VcrError::io(dir, e))?;
        let path = entry.path();
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        if path.is_dir() {
            collect(root, &path, found)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some(CASSETTE_EXTENSION) {
            let label = relative_label(root, &path);
            found.push(ListedCassette { label, path });
        }
    }
    Ok(())
}

fn relative_label(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    let suffix = format!(".{CASSETTE_EXTENSION}");
    joined.strip_suffix(&suffix).map_or_else(|| joined.clone(), str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::{Body, Interaction, RecordedRequest, RecordedResponse, Status};
    use pretty_assertions::assert_eq;

    fn one_interaction() -> Cassette {
        Cassette {
            interactions: vec![Interaction {
                request: RecordedRequest {
                    uri: "https://api.example.com/".into(),
                    method: "GET".into(),
                    body: Body::from_bytes(b""),
                    headers: Default::default(),
                },
                response: RecordedResponse {
                    status: Status { code: 200, message: "OK".into() },
                    headers: Default::default(),
                    body: Body::from_bytes(b"hi"),
                },
                recorded_at: None,
            }],
            ..Cassette::default()
        }
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("absent.yaml")).unwrap().is_none());
    }

    #[test]
    fn save_then_load_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/demo.yaml");
        let cassette = one_interaction();
        save(&path, &cassette).unwrap();
        assert_eq!(load(&path).unwrap(), Some(cassette));

        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temporary file left behind");
    }

    #[test]
    fn malformed_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "version: 1\ninteractions: [ {request: 3 ").unwrap();
        assert!(load(&path).unwrap_err().is_corrupt());

        std::fs::write(&path, "version: 7\ninteractions: []\n").unwrap();
        assert!(load(&path).unwrap_err().is_corrupt());
    }

    #[test]
    fn list_walks_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        save(&dir.path().join("b.yaml"), &Cassette::default()).unwrap();
        save(&dir.path().join("suite/a.yaml"), &Cassette::default()).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let listed = list(dir.path()).unwrap();
        let labels: Vec<&str> = listed.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["b", "suite/a"]);
        assert_eq!(listed[1].path, dir.path().join("suite/a.yaml"));
        assert_eq!(listed[1].name().unwrap().as_str(), "suite/a");
        assert!(list(&dir.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn list_keeps_files_that_are_not_valid_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("test_chat[gpt-4].yaml"), "version: 1\n").unwrap();
        std::fs::write(dir.path().join("with space.yaml"), "version: 1\n").unwrap();

        let listed = list(dir.path()).unwrap();
        let labels: Vec<&str> = listed.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["test_chat[gpt-4]", "with space"]);
        assert!(listed.iter().all(|c| c.name().is_none()));
        assert_eq!(listed[0].path, dir.path().join("test_chat[gpt-4].yaml"));
    }

    #[test]
    fn doubled_extension_points_at_the_real_file() {
        let dir = tempfile::tempdir().unwrap();
        save(&dir.path().join("a.yaml.yaml"), &Cassette::default()).unwrap();

        let listed = list(dir.path()).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].label, "a.yaml");
        assert_eq!(listed[0].path, dir.path().join("a.yaml.yaml"));
        // The label would resolve to a different file, so it is not offered as a name.
        assert!(listed[0].name().is_none());
    }
}
