//! Live adapters for real external interactions.

pub mod http;

pub use http::LiveTransport;
