#![warn(missing_docs)]

//! Peerlink: a small public API facade for the workspace.
//!
//! This crate provides a clean, stable surface that re-exports the most
//! commonly used types for building host-side sessions over a
//! reliable-message transport:
//!
//! - Connection lifecycle and the event loop (`Connection`)
//! - Handler registration (`EventHandler`, `HandlerRegistry`)
//! - Events, peers, and packets (`Event`, `EventKind`, `Peer`, `Packet`)
//! - The transport seam (`TransportDriver`, `TransportHost`) and the
//!   in-process loopback implementation (`MemoryDriver`)
//!
//! Example
//! ```
//! use peerlink::{Connection, EventKind, HostConfig, MemoryDriver};
//!
//! let driver = MemoryDriver::new();
//! let addr = "127.0.0.1:7777".parse().unwrap();
//!
//! let server = Connection::create_host(&driver, HostConfig::server(addr)).unwrap();
//! server.on(EventKind::Receive, |event| {
//!     println!("got: {}", event.packet().unwrap().as_text());
//!     Ok(())
//! });
//! server.start_event_loop().unwrap();
//!
//! let client = Connection::create_host(&driver, HostConfig::client()).unwrap();
//! let peer = client.connect(addr, 1, 0).unwrap();
//! client.send(&peer, 0, b"hello").unwrap();
//!
//! client.close();
//! server.close();
//! ```

// Core: configuration, errors, and value types
pub use peerlink_core::{
    config::HostConfig,
    error::{ErrorKind, Result},
    event::{Event, EventKind},
    flags::PacketFlags,
    packet::Packet,
    peer::{Peer, PeerHandle},
    transport::{TransportDriver, TransportHost},
};
// Session: connection engine, handler registry, bootstrap, loopback transport
pub use peerlink_session::{
    bootstrap, Connection, EventHandler, HandlerId, HandlerRegistry, MemoryDriver,
};

/// Convenience prelude with the most commonly used items.
pub mod prelude {
    pub use crate::{
        Connection, ErrorKind, Event, EventHandler, EventKind, HostConfig, MemoryDriver, Packet,
        PacketFlags, Peer, Result,
    };
}
