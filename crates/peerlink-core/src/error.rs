//! Error taxonomy for the session layer.
//!
//! Synchronous failures are returned at the call that caused them.
//! Asynchronous transport outcomes (a remote refusing or timing out) are
//! never errors; they surface as `Disconnect` events from the poll loop.

use thiserror::Error;

/// Errors that can occur in the session layer or at the transport seam.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Process-wide transport initialization failed. Fatal: no host may be
    /// created until a later attempt succeeds.
    #[error("transport initialization failed: {0}")]
    Initialization(String),
    /// The transport could not bind or allocate a host (e.g. address in use).
    #[error("could not create transport host: {0}")]
    HostCreation(String),
    /// The transport rejected a connection attempt locally. A remote refusal
    /// is not an error; it arrives later as a `Disconnect` event.
    #[error("connection attempt rejected: {0}")]
    Connect(String),
    /// The transport refused to enqueue an outbound packet (unknown peer,
    /// invalid channel, peer already disconnecting).
    #[error("transport rejected the packet: {0}")]
    SendRejected(String),
    /// A registered event handler returned an error. Caught at the dispatch
    /// site and logged; never aborts the loop or other handlers.
    #[error("event handler failed: {0}")]
    Handler(String),
    /// An operation was attempted on a connection after `close()`.
    #[error("operation on a closed connection")]
    Closed,
    /// Wrapper for underlying I/O errors.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, ErrorKind>;
