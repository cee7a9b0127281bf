//! Transport abstraction for kosync.
//!
//! This module provides a pluggable transport layer that abstracts how a
//! protocol request reaches the sync server.
//!
//! # Design
//!
//! The transport trait is async and request-oriented: one [`HttpRequest`] in,
//! one [`HttpResponse`] out. Implementations:
//! - [`ReqwestTransport`] talks to the server directly
//! - [`RelayTransport`] wraps every request into a relay envelope and hands it
//!   to an inner transport pointed at the relay
//! - [`MockTransport`] queues canned responses for tests
//!
//! [`HttpTransport`] picks direct or relay once, from the server address.
//!
//! # Example
//!
//! ```ignore
//! let transport = HttpTransport::for_server("http://192.168.1.20:7200", None, None)?;
//! let response = transport.execute(HttpRequest::get("/users/auth")).await?;
//! ```

mod direct;
mod mock;
mod relay;
mod select;

pub use direct::{DirectOptions, ReqwestTransport};
pub use mock::MockTransport;
pub use relay::RelayTransport;
pub use select::{choose_route, is_lan_address, HttpTransport, Route};

use async_trait::async_trait;
use std::collections::BTreeMap;
use sync_types::HttpMethod;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// The server or relay URL could not be used.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The request could not be encoded.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The response could not be read.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Nothing left to answer with.
    #[error("connection closed")]
    ConnectionClosed,
}

/// One protocol request, relative to the server base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Method
    pub method: HttpMethod,
    /// Path, e.g. `/syncs/progress`
    pub endpoint: String,
    /// Extra headers (auth headers live here)
    pub headers: BTreeMap<String, String>,
    /// JSON body
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    /// A bodiless GET.
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, endpoint)
    }

    /// A request with the given method and no headers or body.
    pub fn new(method: HttpMethod, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the JSON body.
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// The server's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// `Content-Type` header, if any
    pub content_type: Option<String>,
    /// Raw body text
    pub body: String,
}

impl HttpResponse {
    /// A JSON response.
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            content_type: Some("application/json".into()),
            body: body.to_string(),
        }
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport trait for issuing sync protocol requests.
///
/// Implementations handle how the request reaches the server
/// (direct HTTP, relay envelope, mock, etc).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one request.
    ///
    /// Non-2xx statuses are returned as responses, not errors.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder() {
        let request = HttpRequest::get("/users/auth")
            .header("X-Auth-User", "alice")
            .header("X-Auth-Key", "key");
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.headers.len(), 2);
        assert!(request.body.is_none());

        let request = HttpRequest::new(HttpMethod::Put, "/syncs/progress")
            .json(serde_json::json!({"progress": "6"}));
        assert_eq!(request.body.unwrap()["progress"], "6");
    }

    #[test]
    fn success_range() {
        let ok = HttpResponse::json(200, &serde_json::json!({}));
        assert!(ok.is_success());
        let created = HttpResponse::json(201, &serde_json::json!({}));
        assert!(created.is_success());
        let unauthorized = HttpResponse::json(401, &serde_json::json!({}));
        assert!(!unauthorized.is_success());
    }
}
