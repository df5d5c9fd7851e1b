//! `tapedeck check` command.

use std::path::Path;

use tracing::warn;

use crate::cassette::config::VcrConfig;
use crate::cassette::store;

/// Execute the `check` command.
///
/// Loads every cassette under the library directory (or `dir`), reporting
/// files that fail to parse or validate and any header or query parameter
/// the configured filter policy would have stripped.
///
/// # Errors
///
/// Returns an error string if any cassette has a problem.
pub fn run(config: &VcrConfig, dir: Option<&Path>) -> Result<(), String> {
    let dir = dir.unwrap_or(config.cassette_library_dir.as_path());
    let report = inspect(config, dir)?;
    for line in &report.lines {
        println!("{line}");
    }
    if report.problems == 0 {
        println!("{} cassette(s) checked, no problems found.", report.checked);
        Ok(())
    } else {
        Err(format!("{} problem(s) in {} cassette(s)", report.problems, report.checked))
    }
}

#[derive(Debug, Default)]
struct Report {
    checked: usize,
    problems: usize,
    lines: Vec<String>,
}

fn inspect(config: &VcrConfig, dir: &Path) -> Result<Report, String> {
    let filter = config.filter_policy();
    let mut report = Report::default();

    for listed in store::list(dir).map_err(|e| e.to_string())? {
        let label = &listed.label;
        report.checked += 1;
        let cassette = match store::load(&listed.path) {
            Ok(Some(cassette)) => cassette,
            Ok(None) => continue,
            Err(e) => {
                warn!(cassette = %label, error = %e, "cassette failed to load");
                report.problems += 1;
                report.lines.push(format!("FAIL  {label}: {e}"));
                continue;
            }
        };

        let mut clean = true;
        for (i, interaction) in cassette.interactions.iter().enumerate() {
            for leak in filter.leaks(interaction) {
                warn!(cassette = %label, interaction = i + 1, %leak, "unfiltered value stored");
                report.problems += 1;
                clean = false;
                report.lines.push(format!("LEAK  {label} #{}: {leak}", i + 1));
            }
        }
        if clean {
            report.lines.push(format!("ok    {label} ({} interaction(s))", cassette.interactions.len()));
        }
    }
    Ok(report)
}
