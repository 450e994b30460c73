#![warn(missing_docs)]

//! peerlink-session: connection lifecycle and event-dispatch engine.
//!
//! A `Connection` owns a transport host, runs a dedicated polling thread,
//! translates transport events into typed records, and fans them out to
//! registered handlers in registration order with per-handler failure
//! isolation.

/// Process-wide transport initialization gate.
pub mod bootstrap;
/// Connection lifecycle and the polling loop.
pub mod connection;
/// In-process loopback transport for tests and examples.
pub mod memory;
/// Handler registration and event dispatch.
pub mod registry;

pub use connection::Connection;
pub use memory::MemoryDriver;
pub use registry::{EventHandler, HandlerId, HandlerRegistry};
