//! In-memory transport that serves scripted responses.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::ports::http::{
    HttpRequest, HttpResponse, HttpTransport, TransportError, TransportFuture,
};

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<Result<HttpResponse, String>>,
    seen: Vec<HttpRequest>,
}

/// Stand-in for the network in tests.
///
/// Replies are served in the order they were scripted and every request is
/// kept for inspection. Clones share the same script, so a test can keep
/// one handle while the interceptor owns another.
#[derive(Debug, Clone, Default)]
pub struct CannedTransport {
    script: Arc<Mutex<Script>>,
}

impl CannedTransport {
    /// Creates a transport with nothing scripted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the next response.
    #[must_use]
    pub fn with_response(self, response: HttpResponse) -> Self {
        self.push_response(response);
        self
    }

    /// Scripts the next call to fail with `message`.
    #[must_use]
    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.lock().replies.push_back(Err(message.into()));
        self
    }

    /// Scripts another response on a shared handle.
    pub fn push_response(&self, response: HttpResponse) {
        self.lock().replies.push_back(Ok(response));
    }

    /// Number of requests received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.lock().seen.len()
    }

    /// Every request received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().seen.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HttpTransport for CannedTransport {
    fn send(&self, request: &HttpRequest) -> TransportFuture<'_> {
        let reply = {
            let mut script = self.lock();
            script.seen.push(request.clone());
            script.replies.pop_front()
        };
        let result: Result<HttpResponse, TransportError> = match reply {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(message.into()),
            None => Err(format!(
                "canned transport has no reply left for {} {}",
                request.method, request.uri
            )
            .into()),
        };
        Box::pin(async move { result })
    }
}
