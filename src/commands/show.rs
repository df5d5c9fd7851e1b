//! `tapedeck show` command.

use std::path::Path;

use crate::cassette::config::VcrConfig;
use crate::cassette::format::{Body, Cassette};
use crate::cassette::store;

use super::resolve_cassette;

const PREVIEW_CHARS: usize = 60;

/// Execute the `show` command.
///
/// Displays one row per stored interaction: position, method, URI, status
/// and a short preview of the response body.
///
/// # Errors
///
/// Returns an error string if the cassette is missing or unreadable.
pub fn run(config: &VcrConfig, name: &str) -> Result<(), String> {
    let (label, path) = resolve_cassette(config, name)?;
    let cassette = load_existing(&label, &path)?;
    print!("{}", render(&label, &cassette));
    Ok(())
}

pub(super) fn load_existing(label: &str, path: &Path) -> Result<Cassette, String> {
    store::load(path)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("cassette {label} not found at {}", path.display()))
}

fn render(label: &str, cassette: &Cassette) -> String {
    let mut out = format!("Cassette {label} (version {})\n\n", cassette.version);
    if cassette.interactions.is_empty() {
        out.push_str("No interactions recorded.\n");
        return out;
    }

    let rows: Vec<[String; 5]> = cassette
        .interactions
        .iter()
        .enumerate()
        .map(|(i, interaction)| {
            [
                (i + 1).to_string(),
                interaction.request.method.clone(),
                interaction.request.uri.clone(),
                interaction.response.status.code.to_string(),
                preview(&interaction.response.body),
            ]
        })
        .collect();

    let headings = ["#", "METHOD", "URI", "STATUS", "BODY"];
    let widths: Vec<usize> = (0..headings.len())
        .map(|col| rows.iter().map(|r| r[col].len()).max().unwrap_or(0).max(headings[col].len()))
        .collect();

    push_row(&mut out, &headings.map(String::from), &widths);
    push_row(&mut out, &widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>(), &widths);
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    out.push_str(&format!("\n{} interaction(s).\n", rows.len()));
    out
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let line: Vec<String> =
        cells.iter().zip(widths).map(|(cell, width)| format!("{cell:<width$}")).collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}

fn preview(body: &Body) -> String {
    match (&body.string, &body.base64_string) {
        (Some(text), _) => {
            let flat = text.replace(['\n', '\r'], " ");
            if flat.chars().count() > PREVIEW_CHARS {
                format!("{}...", flat.chars().take(PREVIEW_CHARS).collect::<String>())
            } else {
                flat
            }
        }
        (None, Some(encoded)) => format!("<binary, {} base64 chars>", encoded.len()),
        (None, None) => String::new(),
    }
}
