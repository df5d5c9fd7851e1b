//! Transport adapters: the real network and an in-memory stand-in.

pub mod canned;
pub mod live;

pub use canned::CannedTransport;
pub use live::LiveTransport;
