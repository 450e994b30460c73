//! Host configuration.

use std::{net::SocketAddr, time::Duration};

/// Configuration for creating a transport host.
///
/// A host with `bind: None` is an ephemeral endpoint for outbound
/// connections only; a bound host also accepts inbound peers.
#[derive(Clone, Debug)]
pub struct HostConfig {
    /// Address to listen on. `None` creates an unbound, outbound-only host.
    pub bind: Option<SocketAddr>,
    /// Maximum number of simultaneously connected peers.
    pub max_peers: usize,
    /// Number of channels available per peer connection (1-255).
    pub max_channels: u8,
    /// Incoming bandwidth limit in bytes/sec (0 = unlimited).
    pub incoming_bandwidth_limit: u32,
    /// Outgoing bandwidth limit in bytes/sec (0 = unlimited).
    pub outgoing_bandwidth_limit: u32,
    /// How long a single poll may block waiting for an event.
    ///
    /// This bounds stop latency of the event loop; it is not a correctness
    /// parameter.
    pub poll_timeout: Duration,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            bind: None,
            max_peers: 32,
            max_channels: 2,
            incoming_bandwidth_limit: 0,
            outgoing_bandwidth_limit: 0,
            poll_timeout: Duration::from_millis(10),
        }
    }
}

impl HostConfig {
    /// Configuration for an outbound-only host with defaults.
    pub fn client() -> Self {
        Self::default()
    }

    /// Configuration for a host listening on `addr` with defaults.
    pub fn server(addr: SocketAddr) -> Self {
        Self { bind: Some(addr), ..Self::default() }
    }
}
