//! Port traits defining external boundaries.
//!
//! The only boundary this crate crosses is outbound HTTP. Implementations
//! live in `src/adapters/` and in [`crate::interceptor`].

pub mod http;

pub use http::{HttpRequest, HttpResponse, HttpTransport, TransportError, TransportFuture};
