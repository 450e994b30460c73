//! Transport abstraction for pluggable network stacks.
//!
//! The session layer treats the transport as a black box: congestion
//! control, fragmentation, and retransmission are its business. These traits
//! are the full contract the core requires. Methods take `&self` and
//! implementations must be `Send + Sync`: the engine runs one polling
//! thread per host while any number of caller threads send concurrently,
//! and the transport owns whatever internal serialization that requires.

use std::{net::SocketAddr, time::Duration};

use crate::{
    config::HostConfig,
    error::Result,
    event::Event,
    flags::PacketFlags,
    peer::Peer,
};

/// Entry point of a transport implementation: process-wide lifecycle plus
/// host creation.
pub trait TransportDriver: Send + Sync {
    /// Initializes the transport's process-wide state.
    ///
    /// Called at most once per process by the session layer's bootstrap
    /// gate, before any host is created.
    fn global_init(&self) -> Result<()>;

    /// Tears down process-wide state. Only invoked on explicit request,
    /// never automatically per host.
    fn global_deinit(&self);

    /// Creates a host endpoint. Bound hosts accept inbound peers; unbound
    /// hosts are outbound-only.
    fn create_host(&self, config: &HostConfig) -> Result<Box<dyn TransportHost>>;
}

/// A live transport endpoint. Dropping the host releases its resources.
pub trait TransportHost: Send + Sync {
    /// Opens an outbound connection attempt to `address`.
    ///
    /// The handshake completes asynchronously: success arrives as a
    /// `Connect` event, refusal or timeout as a `Disconnect` event. An
    /// error here means the attempt itself was rejected locally.
    fn connect(&self, address: SocketAddr, channel_count: u8, user_data: u32) -> Result<Peer>;

    /// Blocks for up to `timeout` waiting for the next event.
    ///
    /// Returns `Ok(None)` when the timeout elapses without an event.
    fn poll(&self, timeout: Duration) -> Result<Option<Event>>;

    /// Enqueues a packet for `peer` on `channel`. Never blocks on network
    /// I/O; data may not leave the process until `flush` or the next
    /// service tick.
    fn send(&self, peer: &Peer, channel: u8, payload: &[u8], flags: PacketFlags) -> Result<()>;

    /// Enqueues the same packet for every currently connected peer.
    fn broadcast(&self, channel: u8, payload: &[u8], flags: PacketFlags) -> Result<()>;

    /// Hands any enqueued outbound packets to the network layer now.
    fn flush(&self);

    /// Requests graceful disconnection from `peer`; completion is observed
    /// as a later `Disconnect` event.
    fn disconnect(&self, peer: &Peer, user_data: u32) -> Result<()>;

    /// Returns the address this host is bound to, if any.
    fn local_addr(&self) -> Option<SocketAddr>;

    /// Returns the number of currently connected peers.
    fn peer_count(&self) -> usize;
}
