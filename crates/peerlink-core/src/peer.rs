//! Remote endpoint handles.

use std::{
    fmt,
    hash::{Hash, Hasher},
    net::SocketAddr,
};

/// Opaque transport-level identity of a remote endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerHandle(pub u64);

/// A remote endpoint reachable through a host, plus its cached address.
///
/// Identity is the transport handle: two `Peer` values refer to the same
/// remote endpoint iff their handles are equal. Peers are freely cloneable
/// and never mutated after construction. After a `Disconnect` event fires
/// for a peer, its handle is invalid and further sends will be rejected by
/// the transport.
#[derive(Clone, Debug)]
pub struct Peer {
    handle: PeerHandle,
    address: SocketAddr,
}

impl Peer {
    /// Creates a peer from its transport handle and cached address.
    pub fn new(handle: PeerHandle, address: SocketAddr) -> Peer {
        Peer { handle, address }
    }

    /// Returns the transport handle identifying this peer.
    pub fn handle(&self) -> PeerHandle {
        self.handle
    }

    /// Returns the cached remote address.
    pub fn address(&self) -> SocketAddr {
        self.address
    }
}

impl PartialEq for Peer {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for Peer {}

impl Hash for Peer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer {} ({})", self.handle.0, self.address)
    }
}
