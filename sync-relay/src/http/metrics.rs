//! Prometheus metrics endpoint.

use crate::server::{RelayMetrics, RelayServer};
use axum::{http::header::CONTENT_TYPE, response::IntoResponse, Extension};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Prometheus metrics handler.
///
/// Returns counters in Prometheus text format.
pub async fn metrics_handler(Extension(relay): Extension<Arc<RelayServer>>) -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        render(relay.metrics(), relay.uptime_seconds()),
    )
}

fn render(m: &RelayMetrics, uptime: u64) -> String {
    let requests = m.requests_total.load(Ordering::Relaxed);
    let relayed = m.relayed_total.load(Ordering::Relaxed);
    let upstream_errors = m.upstream_errors_total.load(Ordering::Relaxed);
    let rejected = m.rejected_total.load(Ordering::Relaxed);

    format!(
        r#"# HELP kosync_relay_info Server information
# TYPE kosync_relay_info gauge
kosync_relay_info{{version="{version}"}} 1

# HELP kosync_relay_uptime_seconds Seconds since startup
# TYPE kosync_relay_uptime_seconds gauge
kosync_relay_uptime_seconds {uptime}

# HELP kosync_relay_requests_total Envelopes received on the relay path
# TYPE kosync_relay_requests_total counter
kosync_relay_requests_total {requests}

# HELP kosync_relay_relayed_total Upstream responses mirrored to clients
# TYPE kosync_relay_relayed_total counter
kosync_relay_relayed_total {relayed}

# HELP kosync_relay_upstream_errors_total Upstream failures
# TYPE kosync_relay_upstream_errors_total counter
kosync_relay_upstream_errors_total {upstream_errors}

# HELP kosync_relay_rejected_total Envelopes rejected with 400 or 405
# TYPE kosync_relay_rejected_total counter
kosync_relay_rejected_total {rejected}
"#,
        version = env!("CARGO_PKG_VERSION"),
    )
}
