//! Connection lifecycle and the polling loop.
//!
//! A `Connection` owns its transport host exclusively. While the event loop
//! runs, exactly one background worker polls the host with a bounded
//! timeout and dispatches each yielded event through the handler registry;
//! send, broadcast, flush, disconnect, and registration may be invoked
//! concurrently from any other thread and call straight into the transport
//! without going through the loop.

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use parking_lot::{Mutex, RwLock};
use peerlink_core::{
    config::HostConfig,
    error::{ErrorKind, Result},
    event::{Event, EventKind},
    flags::PacketFlags,
    peer::Peer,
    transport::{TransportDriver, TransportHost},
};
use tracing::{debug, error, trace};

use crate::{
    bootstrap,
    registry::{EventHandler, HandlerId, HandlerRegistry},
};

/// State shared between the connection and its worker thread.
///
/// The worker holds no ownership of the transport host; it reaches it
/// through the read side of the lock, so `close()` can stop the worker and
/// then take the host out of the slot without racing a poll.
struct Shared {
    host: RwLock<Option<Box<dyn TransportHost>>>,
    running: AtomicBool,
    registry: HandlerRegistry,
    poll_timeout: Duration,
}

/// A live session endpoint: transport host, handler registry, and the
/// event loop that connects them.
pub struct Connection {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Connection {
    /// Creates a host through `driver`, initializing the transport's
    /// process-wide state first if this is the first host in the process.
    ///
    /// Fails with `ErrorKind::Initialization` before any host is attempted,
    /// or `ErrorKind::HostCreation` if the transport cannot bind or
    /// allocate. No partial connection is ever returned.
    pub fn create_host(driver: &dyn TransportDriver, config: HostConfig) -> Result<Connection> {
        bootstrap::ensure_initialized(driver)?;
        let host = driver.create_host(&config)?;
        Ok(Connection {
            shared: Arc::new(Shared {
                host: RwLock::new(Some(host)),
                running: AtomicBool::new(false),
                registry: HandlerRegistry::new(),
                poll_timeout: config.poll_timeout,
            }),
            worker: Mutex::new(None),
        })
    }

    /// Opens an outbound connection attempt. The handshake completes
    /// asynchronously: watch for a `Connect` (or `Disconnect`) event.
    pub fn connect(&self, address: SocketAddr, channel_count: u8, user_data: u32) -> Result<Peer> {
        self.with_host(|host| host.connect(address, channel_count, user_data))
    }

    /// Enqueues a reliable packet for `peer` on `channel`.
    pub fn send(&self, peer: &Peer, channel: u8, payload: &[u8]) -> Result<()> {
        self.send_with_flags(peer, channel, payload, PacketFlags::RELIABLE)
    }

    /// Enqueues a packet with explicit delivery flags.
    ///
    /// Does not block on network I/O; data is not guaranteed to leave the
    /// process until `flush` or the transport's next service tick.
    pub fn send_with_flags(
        &self,
        peer: &Peer,
        channel: u8,
        payload: &[u8],
        flags: PacketFlags,
    ) -> Result<()> {
        self.with_host(|host| host.send(peer, channel, payload, flags))
    }

    /// Enqueues the same reliable packet for every connected peer.
    pub fn broadcast(&self, channel: u8, payload: &[u8]) -> Result<()> {
        self.broadcast_with_flags(channel, payload, PacketFlags::RELIABLE)
    }

    /// Broadcasts with explicit delivery flags.
    pub fn broadcast_with_flags(
        &self,
        channel: u8,
        payload: &[u8],
        flags: PacketFlags,
    ) -> Result<()> {
        self.with_host(|host| host.broadcast(channel, payload, flags))
    }

    /// Hands enqueued outbound packets to the network layer immediately.
    pub fn flush(&self) -> Result<()> {
        self.with_host(|host| {
            host.flush();
            Ok(())
        })
    }

    /// Requests graceful disconnection from `peer`. Completion is observed
    /// as a later `Disconnect` event, not synchronously.
    pub fn disconnect_peer(&self, peer: &Peer, user_data: u32) -> Result<()> {
        self.with_host(|host| host.disconnect(peer, user_data))
    }

    /// Registers a handler object for the event kinds it declares.
    ///
    /// May be called before or after the loop starts; a registration is
    /// visible to the next poll cycle, not necessarily to one in flight.
    pub fn add_handler(&self, handler: Arc<dyn EventHandler>) -> HandlerId {
        self.shared.registry.add_handler(handler)
    }

    /// Registers a closure for a single event kind.
    pub fn on<F>(&self, kind: EventKind, callback: F) -> HandlerId
    where
        F: Fn(&Event) -> Result<()> + Send + Sync + 'static,
    {
        self.shared.registry.on(kind, callback)
    }

    /// Starts the event loop. Idempotent: a running loop is left alone and
    /// there is never more than one worker thread. Fails with
    /// `ErrorKind::Closed` once the host has been released.
    pub fn start_event_loop(&self) -> Result<()> {
        if self.shared.host.read().is_none() {
            return Err(ErrorKind::Closed);
        }
        if self
            .shared
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }

        let shared = self.shared.clone();
        let spawned = thread::Builder::new()
            .name("peerlink-event-loop".into())
            .spawn(move || run_loop(shared));
        match spawned {
            Ok(handle) => {
                *self.worker.lock() = Some(handle);
                Ok(())
            }
            Err(err) => {
                self.shared.running.store(false, Ordering::SeqCst);
                Err(ErrorKind::Io(err))
            }
        }
    }

    /// Stops the event loop and blocks until the worker has exited, bounded
    /// by one poll timeout plus any in-flight handler execution. Idempotent.
    ///
    /// When called from inside a handler (i.e. on the worker thread itself)
    /// the join is skipped; the loop exits after the current dispatch.
    pub fn stop_event_loop(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                // Dispatch catches handler panics, so this is a bug in the
                // loop itself.
                error!("Event loop worker panicked");
            }
        }
    }

    /// Stops the loop, then releases the transport host exactly once.
    ///
    /// Every subsequent operation fails with `ErrorKind::Closed` and
    /// performs no transport call. Called automatically on drop.
    pub fn close(&self) {
        self.stop_event_loop();
        let host = self.shared.host.write().take();
        if host.is_some() {
            debug!("connection closed, transport host released");
        }
    }

    /// Returns true once `close()` has released the transport host.
    pub fn is_closed(&self) -> bool {
        self.shared.host.read().is_none()
    }

    /// Returns true while the event loop is running.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Returns the address the host is bound to, if any.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.shared.host.read().as_deref().and_then(|host| host.local_addr())
    }

    /// Returns the number of currently connected peers (0 after close).
    pub fn peer_count(&self) -> usize {
        self.shared.host.read().as_deref().map(|host| host.peer_count()).unwrap_or(0)
    }

    fn with_host<T>(&self, f: impl FnOnce(&dyn TransportHost) -> Result<T>) -> Result<T> {
        let guard = self.shared.host.read();
        match guard.as_deref() {
            Some(host) => f(host),
            None => Err(ErrorKind::Closed),
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

/// The worker body: poll, dispatch, re-check the run flag, repeat.
fn run_loop(shared: Arc<Shared>) {
    debug!("event loop started");
    while shared.running.load(Ordering::SeqCst) {
        let polled = {
            let guard = shared.host.read();
            match guard.as_deref() {
                Some(host) => host.poll(shared.poll_timeout),
                // Host already released; nothing left to poll. Clear the
                // run flag so the worker's exit stays observable.
                None => {
                    shared.running.store(false, Ordering::SeqCst);
                    break;
                }
            }
        };
        match polled {
            Ok(Some(event)) => {
                trace!("dispatching {:?} event from {}", event.kind(), event.peer());
                shared.registry.dispatch(&event);
            }
            Ok(None) => {}
            Err(err) => {
                error!("Error polling the transport: {}", err);
                // Keep a failing transport from turning the loop into a
                // busy spin.
                thread::sleep(shared.poll_timeout);
            }
        }
    }
    debug!("event loop stopped");
}
