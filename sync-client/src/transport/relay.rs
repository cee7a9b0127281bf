//! Relay transport: tunnels each request through a same-origin relay.

use async_trait::async_trait;
use sync_types::{strip_trailing_slash, HttpMethod, RelayEnvelope};

use super::{HttpRequest, HttpResponse, Transport, TransportError};

/// Wraps every request into one [`RelayEnvelope`] POSTed to the relay.
///
/// The relay performs the real request and mirrors status and body, so the
/// response is passed through untouched.
#[derive(Debug, Clone)]
pub struct RelayTransport<T> {
    inner: T,
    server_url: String,
    relay_endpoint: String,
}

impl<T: Transport> RelayTransport<T> {
    /// `inner` must point at the relay origin; envelopes go to `relay_endpoint` on it.
    pub fn new(inner: T, server_url: &str, relay_endpoint: &str) -> Self {
        Self {
            inner,
            server_url: strip_trailing_slash(server_url).to_string(),
            relay_endpoint: relay_endpoint.to_string(),
        }
    }

    /// The sync server the envelopes target.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Get a reference to the inner transport (for testing).
    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: Transport> Transport for RelayTransport<T> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let envelope = RelayEnvelope::new(
            &self.server_url,
            &request.endpoint,
            request.method,
            request.headers,
            request.body,
        );
        let body = serde_json::to_value(&envelope)
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        tracing::debug!(
            endpoint = %request.endpoint,
            method = %request.method,
            "relaying request"
        );
        self.inner
            .execute(HttpRequest::new(HttpMethod::Post, self.relay_endpoint.clone()).json(body))
            .await
    }
}
