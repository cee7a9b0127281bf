//! HTTP endpoints for sync-relay.
//!
//! Mounts the relay path plus health and metrics endpoints. Every route
//! answers CORS preflights, so readers served from another origin can call
//! the relay.

pub mod health;
mod metrics;

use crate::proxy::relay_handler;
use crate::server::RelayServer;
use axum::{
    routing::{any, get},
    Extension, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub use health::HealthStatus;

/// Build the HTTP router with all endpoints.
pub fn build_router(relay: Arc<RelayServer>) -> Router {
    let relay_path = relay.config().server.relay_path.clone();
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/metrics", get(metrics::metrics_handler))
        .route(&relay_path, any(relay_handler))
        .layer(Extension(relay))
        .layer(CorsLayer::permissive())
}
