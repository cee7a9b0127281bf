//! Direct-or-relay selection.
//!
//! A server on the local network is called directly with certificate checks
//! relaxed (home servers are usually self-signed). Anything else goes through
//! the relay when one is configured. Without a relay, public servers are
//! called directly with normal validation.

use async_trait::async_trait;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Duration;
use url::{Host, Url};

use super::{
    DirectOptions, HttpRequest, HttpResponse, RelayTransport, ReqwestTransport, Transport,
    TransportError,
};

/// How requests reach the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Straight to the server.
    Direct {
        /// Certificate validation is skipped.
        relaxed_tls: bool,
    },
    /// Through the relay.
    Relay,
}

/// Pick the route for a server, given an optional relay.
pub fn choose_route(server_url: &str, relay_url: Option<&str>) -> Route {
    if is_lan_address(server_url) {
        Route::Direct { relaxed_tls: true }
    } else if relay_url.is_some_and(|r| !r.is_empty()) {
        Route::Relay
    } else {
        Route::Direct { relaxed_tls: false }
    }
}

/// Whether a server URL points at a loopback, private or link-local address.
///
/// Accepts URLs with or without a scheme.
pub fn is_lan_address(server_url: &str) -> bool {
    let parsed = Url::parse(server_url)
        .ok()
        .filter(|u| u.host().is_some())
        .or_else(|| Url::parse(&format!("http://{}", server_url)).ok());

    match parsed.as_ref().and_then(Url::host) {
        Some(Host::Domain(domain)) => {
            let domain = domain.to_ascii_lowercase();
            domain == "localhost" || domain.ends_with(".local")
        }
        Some(Host::Ipv4(ip)) => is_private_v4(ip),
        Some(Host::Ipv6(ip)) => is_private_v6(ip),
        None => false,
    }
}

fn is_private_v4(ip: Ipv4Addr) -> bool {
    ip.is_loopback() || ip.is_private() || ip.is_link_local()
}

fn is_private_v6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    ip.is_loopback() || (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80
}

/// The transport used in production, chosen once per client.
#[derive(Debug, Clone)]
pub enum HttpTransport {
    /// Direct to the server.
    Direct(ReqwestTransport),
    /// Through a relay.
    Relay(RelayTransport<ReqwestTransport>),
}

impl HttpTransport {
    /// Build the transport for `server_url`.
    pub fn for_server(
        server_url: &str,
        relay_url: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        let route = choose_route(server_url, relay_url);
        if let (Route::Relay, Some(relay_url)) = (route, relay_url) {
            let relay = Url::parse(relay_url)
                .map_err(|e| TransportError::InvalidUrl(format!("{relay_url}: {e}")))?;
            let origin = &relay[..url::Position::BeforePath];
            let inner = ReqwestTransport::new(
                origin,
                DirectOptions {
                    accept_invalid_certs: false,
                    timeout,
                },
            )?;
            tracing::info!(relay = %relay_url, "using relay transport");
            return Ok(Self::Relay(RelayTransport::new(
                inner,
                server_url,
                relay.path(),
            )));
        }

        let relaxed_tls = matches!(route, Route::Direct { relaxed_tls: true });
        tracing::info!(relaxed_tls, "using direct transport");
        Ok(Self::Direct(ReqwestTransport::new(
            server_url,
            DirectOptions {
                accept_invalid_certs: relaxed_tls,
                timeout,
            },
        )?))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        match self {
            Self::Direct(transport) => transport.execute(request).await,
            Self::Relay(transport) => transport.execute(request).await,
        }
    }
}
