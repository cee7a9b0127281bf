//! The relay endpoint.
//!
//! One envelope in, one upstream request out. The upstream status is mirrored
//! and its body re-emitted as JSON when it parses, verbatim otherwise.

use crate::error::ProxyError;
use crate::server::RelayServer;
use axum::body::Bytes;
use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use sync_types::{HttpMethod, RelayEnvelope, ACCEPT_HEADER};

/// Relay handler, mounted on the configured relay path for every method.
pub async fn relay_handler(
    Extension(relay): Extension<Arc<RelayServer>>,
    method: Method,
    body: Bytes,
) -> Response {
    let metrics = relay.metrics();
    metrics.requests_total.fetch_add(1, Ordering::Relaxed);

    match forward(&relay, &method, &body).await {
        Ok(response) => {
            metrics.relayed_total.fetch_add(1, Ordering::Relaxed);
            response
        }
        Err(err) => {
            match &err {
                ProxyError::MethodNotAllowed | ProxyError::IncompleteEnvelope => {
                    metrics.rejected_total.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(%method, error = %err, "envelope rejected");
                }
                ProxyError::Upstream(_) | ProxyError::UnexpectedContentType => {
                    metrics.upstream_errors_total.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(error = %err, "relayed request failed");
                }
            }
            err.into_response()
        }
    }
}

fn upstream_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
    }
}

fn is_json_content_type(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.contains("application/json"))
}

async fn forward(relay: &RelayServer, method: &Method, body: &[u8]) -> Result<Response, ProxyError> {
    if *method != Method::POST {
        return Err(ProxyError::MethodNotAllowed);
    }

    let envelope = RelayEnvelope::from_bytes(body).map_err(|_| ProxyError::IncompleteEnvelope)?;
    let url = envelope
        .target_url()
        .ok_or(ProxyError::IncompleteEnvelope)?;

    tracing::debug!(method = %envelope.method, %url, "relaying");

    let mut request = relay.http().request(upstream_method(envelope.method), &url);
    for (name, value) in &envelope.headers {
        if name.eq_ignore_ascii_case(ACCEPT.as_str())
            || name.eq_ignore_ascii_case(CONTENT_TYPE.as_str())
        {
            continue;
        }
        request = request.header(name.as_str(), value.as_str());
    }
    request = request
        .header(ACCEPT.as_str(), ACCEPT_HEADER)
        .header(CONTENT_TYPE.as_str(), "application/json");
    if let Some(body) = &envelope.body {
        request = request.json(body);
    }

    let response = request
        .send()
        .await
        .map_err(|e| ProxyError::Upstream(e.to_string()))?;

    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    if !is_json_content_type(content_type.as_deref()) {
        return Err(ProxyError::UnexpectedContentType);
    }

    let text = response
        .text()
        .await
        .map_err(|e| ProxyError::Upstream(e.to_string()))?;

    Ok(mirror(status, text))
}

fn mirror(status: u16, text: String) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(json) => (status, Json(json)).into_response(),
        Err(_) => (status, text).into_response(),
    }
}
