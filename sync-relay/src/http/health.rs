//! Health check endpoint.

use crate::server::RelayServer;
use axum::{Extension, Json};
use serde::Serialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Health status response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Overall status.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
    /// Envelopes received since startup.
    pub requests_total: u64,
}

/// Health check handler.
pub async fn health_handler(Extension(relay): Extension<Arc<RelayServer>>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: relay.uptime_seconds(),
        requests_total: relay.metrics().requests_total.load(Ordering::Relaxed),
    })
}
