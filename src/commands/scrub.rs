//! `tapedeck scrub` command.

use tracing::info;

use crate::cassette::config::VcrConfig;
use crate::cassette::store;

use super::resolve_cassette;
use super::show::load_existing;

/// Execute the `scrub` command.
///
/// Re-applies the configured filter policy to every interaction in a
/// cassette and rewrites the file when anything changed. Useful after
/// adding a header or query parameter to the filter lists.
///
/// # Errors
///
/// Returns an error string if the cassette is missing, unreadable, or
/// cannot be written back.
pub fn run(config: &VcrConfig, name: &str) -> Result<(), String> {
    let (label, path) = resolve_cassette(config, name)?;
    let mut cassette = load_existing(&label, &path)?;
    let filter = config.filter_policy();

    let mut changed = 0;
    for interaction in &mut cassette.interactions {
        let scrubbed = filter.scrub(interaction);
        if scrubbed != *interaction {
            *interaction = scrubbed;
            changed += 1;
        }
    }

    if changed == 0 {
        println!("{label}: nothing to scrub.");
        return Ok(());
    }
    store::save(&path, &cassette).map_err(|e| e.to_string())?;
    info!(cassette = %label, changed, "scrubbed cassette");
    println!("{label}: scrubbed {changed} of {} interaction(s).", cassette.interactions.len());
    Ok(())
}
