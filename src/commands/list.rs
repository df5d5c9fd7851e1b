//! `tapedeck list` command.

use std::path::Path;

use crate::cassette::config::VcrConfig;
use crate::cassette::store;

/// Execute the `list` command.
///
/// Prints every cassette under the library directory (or `dir`, when given)
/// with its interaction count. Files that fail to load are listed as
/// unreadable rather than aborting the listing.
///
/// # Errors
///
/// Returns an error string if the directory cannot be walked.
pub fn run(config: &VcrConfig, dir: Option<&Path>) -> Result<(), String> {
    let dir = dir.unwrap_or(config.cassette_library_dir.as_path());
    print!("{}", render(dir)?);
    Ok(())
}

fn render(dir: &Path) -> Result<String, String> {
    let cassettes = store::list(dir).map_err(|e| e.to_string())?;
    if cassettes.is_empty() {
        return Ok(format!("No cassettes found in {}.\n", dir.display()));
    }

    let rows: Vec<(String, String)> = cassettes
        .iter()
        .map(|listed| {
            let count = match store::load(&listed.path) {
                Ok(Some(cassette)) => cassette.interactions.len().to_string(),
                Ok(None) => "missing".to_string(),
                Err(_) => "unreadable".to_string(),
            };
            (listed.label.clone(), count)
        })
        .collect();

    let name_width = rows.iter().map(|r| r.0.len()).max().unwrap_or(8).max(8);
    let count_width = rows.iter().map(|r| r.1.len()).max().unwrap_or(12).max(12);

    let mut out = String::new();
    out.push_str(&format!("{:<name_width$}  {:>count_width$}\n", "CASSETTE", "INTERACTIONS"));
    out.push_str(&format!("{:-<name_width$}  {:->count_width$}\n", "", ""));
    for (name, count) in &rows {
        out.push_str(&format!("{name:<name_width$}  {count:>count_width$}\n"));
    }
    out.push_str(&format!("\n{} cassette(s) total.\n", rows.len()));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::Cassette;

    #[test]
    fn empty_directory_says_so() {
        let dir = tempfile::tempdir().unwrap();
        let out = render(&dir.path().join("nothing-here")).unwrap();
        assert!(out.starts_with("No cassettes found"));
    }

    #[test]
    fn lists_nested_cassettes_with_counts() {
        let dir = tempfile::tempdir().unwrap();
        store::save(&dir.path().join("suite/alpha.yaml"), &Cassette::default()).unwrap();
        std::fs::write(dir.path().join("broken.yaml"), "version: [").unwrap();

        let out = render(dir.path()).unwrap();
        assert!(out.contains("suite/alpha"));
        assert!(out.contains("broken"));
        assert!(out.contains("unreadable"));
        assert!(out.contains("2 cassette(s) total."));
    }

    #[test]
    fn lists_files_with_unusual_names() {
        let dir = tempfile::tempdir().unwrap();
        store::save(&dir.path().join("test_chat[gpt-4].yaml"), &Cassette::default()).unwrap();
        store::save(&dir.path().join("a.yaml.yaml"), &Cassette::default()).unwrap();

        let out = render(dir.path()).unwrap();
        assert!(out.contains("test_chat[gpt-4]"));
        assert!(out.contains("a.yaml"));
        assert!(!out.contains("unreadable"));
        assert!(out.contains("2 cassette(s) total."));
    }
}
