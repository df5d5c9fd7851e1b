//! Cassette format, storage, and the policies applied to it.

pub mod config;
pub mod encoding;
pub mod filter;
pub mod format;
pub mod matcher;
pub mod name;
pub mod recorder;
pub mod replayer;
pub mod store;

pub use config::{MatchOn, RecordMode, VcrConfig};
pub use format::{Cassette, Interaction};
pub use name::CassetteName;
