#![warn(missing_docs)]

//! peerlink-core: foundational types for the session layer.
//!
//! This crate provides the leaf value types and seams shared across the
//! workspace:
//! - Packet payloads and delivery flags (`Packet`, `PacketFlags`)
//! - Remote endpoint handles (`Peer`, `PeerHandle`)
//! - Typed transport events (`Event`, `EventKind`)
//! - Host configuration (`HostConfig`)
//! - The transport seam (`TransportDriver`, `TransportHost`)
//!
//! The session engine itself lives in `peerlink-session`.

/// Host configuration options.
pub mod config;
/// Error types and results.
pub mod error;
/// Event records produced by polling a transport host.
pub mod event;
/// Delivery flag bitset for packets.
pub mod flags;
/// Immutable packet payloads.
pub mod packet;
/// Remote endpoint handles.
pub mod peer;
/// Transport abstraction for pluggable network stacks.
pub mod transport;
