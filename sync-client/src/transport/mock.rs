//! Mock transport for testing.
//!
//! Allows queueing responses and capturing sent requests for verification.

use super::{HttpRequest, HttpResponse, Transport, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Mock transport for testing.
///
/// Allows queueing responses and capturing sent requests for verification.
/// Clones share state, so a test can keep one handle while the client owns
/// another.
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    requests: Vec<HttpRequest>,
    responses: VecDeque<Result<HttpResponse, TransportError>>,
    fail_next: Option<String>,
    delay: Option<Duration>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a response to be returned by the next `execute()` call.
    pub fn queue_response(&self, response: HttpResponse) {
        self.lock().responses.push_back(Ok(response));
    }

    /// Queue a JSON response with the given status.
    pub fn queue_json(&self, status: u16, body: serde_json::Value) {
        self.queue_response(HttpResponse::json(status, &body));
    }

    /// Queue a response with the given status and an empty JSON object.
    pub fn queue_status(&self, status: u16) {
        self.queue_json(status, serde_json::json!({}));
    }

    /// Queue a transport error.
    pub fn queue_error(&self, error: TransportError) {
        self.lock().responses.push_back(Err(error));
    }

    /// Cause the next `execute()` to fail with the given error.
    ///
    /// The request is still recorded and no queued response is consumed.
    pub fn fail_next(&self, error: &str) {
        self.lock().fail_next = Some(error.to_string());
    }

    /// Make every `execute()` take this long before answering.
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    /// Get all requests that were sent.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().requests.clone()
    }

    /// Get the last request that was sent.
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.lock().requests.last().cloned()
    }

    /// Number of requests sent so far.
    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    /// Number of queued responses not yet consumed.
    pub fn pending_responses(&self) -> usize {
        self.lock().responses.len()
    }

    /// Clear all state (requests, queue, failures).
    pub fn reset(&self) {
        *self.lock() = MockTransportInner::default();
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let delay = {
            let mut inner = self.lock();
            inner.requests.push(request);
            inner.delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.lock();

        // Check for forced failure
        if let Some(error) = inner.fail_next.take() {
            return Err(TransportError::ConnectionFailed(error));
        }

        inner
            .responses
            .pop_front()
            .unwrap_or(Err(TransportError::ConnectionClosed))
    }
}
