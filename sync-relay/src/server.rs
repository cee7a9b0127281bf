//! Relay server state and startup.
//!
//! [`RelayServer`] owns the outbound HTTP client, the configuration and the
//! operational counters. It is shared with every handler behind an `Arc`.

use crate::config::Config;
use crate::error::Result;
use crate::http::build_router;
use std::future::Future;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;

/// Operational metrics for monitoring relay activity.
///
/// All counters are monotonically increasing (reset only on restart).
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Envelopes received on the relay path, valid or not.
    pub requests_total: AtomicU64,
    /// Envelopes mirrored back from an upstream response.
    pub relayed_total: AtomicU64,
    /// Upstream failures (unreachable, bad content type).
    pub upstream_errors_total: AtomicU64,
    /// Envelopes rejected before any upstream call (405, 400).
    pub rejected_total: AtomicU64,
}

/// Main relay server.
pub struct RelayServer {
    config: Config,
    http: reqwest::Client,
    metrics: RelayMetrics,
    started: Instant,
}

impl std::fmt::Debug for RelayServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayServer")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl RelayServer {
    /// Create a relay with the given config.
    ///
    /// # Errors
    ///
    /// Returns an error if the outbound HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.upstream.accept_invalid_certs);
        if let Some(timeout) = config.upstream.timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            config,
            metrics: RelayMetrics::default(),
            started: Instant::now(),
        })
    }

    /// Get the relay configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Outbound HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }

    /// Seconds since the relay was created.
    pub fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

/// Serve the relay on `listener` until `shutdown` completes.
pub async fn serve<F>(relay: Arc<RelayServer>, listener: TcpListener, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(
        %addr,
        relay_path = %relay.config().server.relay_path,
        "sync-relay listening"
    );

    axum::serve(listener, build_router(relay))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("sync-relay stopped");
    Ok(())
}
