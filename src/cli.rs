//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI parser for `tapedeck`.
#[derive(Debug, Parser)]
#[command(name = "tapedeck", version, about = "Inspect and maintain HTTP cassettes")]
pub struct Cli {
    /// YAML configuration file. Defaults apply when omitted.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List cassettes with their interaction counts.
    List {
        /// Cassette directory, overriding the configured one.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Print the interactions stored in one cassette.
    Show {
        /// Cassette name, or a path to a cassette file.
        name: String,
    },
    /// Validate cassettes and report anything the filter policy would strip.
    Check {
        /// Cassette directory, overriding the configured one.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Re-apply the filter policy to a cassette and rewrite it.
    Scrub {
        /// Cassette name, or a path to a cassette file.
        name: String,
    },
}
