//! Direct HTTP transport over reqwest.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::time::Duration;
use sync_types::{strip_trailing_slash, HttpMethod, ACCEPT_HEADER};

use super::{HttpRequest, HttpResponse, Transport, TransportError};

/// Options for a direct connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectOptions {
    /// Skip certificate validation (self-signed home servers)
    pub accept_invalid_certs: bool,
    /// Per-request timeout; reqwest's default when `None`
    pub timeout: Option<Duration>,
}

/// Talks to one base URL over HTTP(S).
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Create a transport for `base_url` (one trailing slash is stripped).
    pub fn new(base_url: &str, options: DirectOptions) -> Result<Self, TransportError> {
        let mut builder =
            reqwest::Client::builder().danger_accept_invalid_certs(options.accept_invalid_certs);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        Ok(Self {
            client,
            base_url: strip_trailing_slash(base_url).to_string(),
        })
    }

    /// Base URL requests are issued against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn method_of(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
    }
}

fn map_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_builder() {
        TransportError::InvalidUrl(err.to_string())
    } else {
        TransportError::ConnectionFailed(err.to_string())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.endpoint);
        tracing::debug!(method = %request.method, %url, "sending request");

        let mut builder = self
            .client
            .request(method_of(request.method), &url)
            .header(ACCEPT, ACCEPT_HEADER);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_error)?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;

        tracing::debug!(status, %url, "received response");
        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}
