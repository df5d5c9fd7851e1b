//! Deterministic record and replay of outbound HTTP calls for tests.
//!
//! An [`Interceptor`] wraps an [`HttpTransport`] and binds it to a named
//! cassette file. Depending on the [`RecordMode`] it serves responses from
//! the cassette, performs the real call and records it, or fails with
//! [`VcrError::CassetteMiss`].
//!
//! ```no_run
//! use tapedeck::{test_cassette, HttpRequest, Interceptor, VcrConfig};
//!
//! # async fn demo() -> Result<(), tapedeck::VcrError> {
//! let vcr = Interceptor::live(VcrConfig::default(), test_cassette!()?)?;
//! let response = vcr.intercept(&HttpRequest::get("https://api.example.com/v1/models")).await?;
//! assert!(response.is_success());
//! # Ok(())
//! # }
//! ```
//!
//! The `tapedeck` binary lists, shows, checks and scrubs cassettes.

pub mod adapters;
pub mod cassette;
pub mod cli;
pub mod commands;
pub mod error;
pub mod interceptor;
pub mod ports;

pub use adapters::{CannedTransport, LiveTransport};
pub use cassette::{Cassette, CassetteName, Interaction, MatchOn, RecordMode, VcrConfig};
pub use error::VcrError;
pub use interceptor::Interceptor;
pub use ports::{HttpRequest, HttpResponse, HttpTransport};

use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = cli::Cli::try_parse_from(args).map_err(|err| err.to_string())?;
    commands::dispatch(&cli)
}
