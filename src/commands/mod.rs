//! Command dispatch and handlers.

pub mod check;
pub mod list;
pub mod scrub;
pub mod show;

use std::path::{Path, PathBuf};

use crate::cassette::config::VcrConfig;
use crate::cassette::name::CassetteName;
use crate::cli::{Cli, Command};

/// Dispatch a parsed command to its handler.
///
/// The configuration comes from `--config` when given, otherwise defaults,
/// with the `TAPEDECK_*` environment overrides applied on top.
///
/// # Errors
///
/// Returns an error string if configuration loading or the selected command
/// handler fails.
pub fn dispatch(cli: &Cli) -> Result<(), String> {
    let config = load_config(cli.config.as_deref())?;
    match &cli.command {
        Command::List { dir } => list::run(&config, dir.as_deref()),
        Command::Show { name } => show::run(&config, name),
        Command::Check { dir } => check::run(&config, dir.as_deref()),
        Command::Scrub { name } => scrub::run(&config, name),
    }
}

fn load_config(path: Option<&Path>) -> Result<VcrConfig, String> {
    let config = match path {
        Some(path) => VcrConfig::from_yaml_file(path).map_err(|e| e.to_string())?,
        None => VcrConfig::default(),
    };
    config.with_env_overrides().map_err(|e| e.to_string())
}

/// Resolves a command argument to a cassette file: an existing file or an
/// absolute path is used as-is, anything else is a cassette name under the
/// library directory.
fn resolve_cassette(config: &VcrConfig, arg: &str) -> Result<(String, PathBuf), String> {
    let as_path = Path::new(arg);
    if as_path.is_file() || as_path.is_absolute() {
        return Ok((arg.to_string(), as_path.to_path_buf()));
    }
    let name = CassetteName::new(arg).map_err(|e| e.to_string())?;
    let path = config.cassette_path(&name);
    Ok((name.to_string(), path))
}
