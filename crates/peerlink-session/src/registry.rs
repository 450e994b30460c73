//! Handler registration and event dispatch.
//!
//! The registry maps an event kind to an ordered list of bindings. Bindings
//! are appended at registration time and never removed at runtime. Dispatch
//! snapshots the binding list under a read lock and invokes the callbacks
//! outside it, so registration from another thread never corrupts an
//! in-flight iteration; a handler registered mid-cycle becomes visible on
//! the next cycle.

use std::{
    collections::HashMap,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use parking_lot::RwLock;
use peerlink_core::{
    error::Result,
    event::{Event, EventKind},
};
use tracing::{debug, error};

/// Application code interested in transport events.
///
/// Each callback slot receives the event and may fail; failures are caught
/// at the dispatch site, logged, and isolated to that binding. `interests`
/// declares which kinds the handler is bound for; the default is all three,
/// with no-op bodies for the slots the handler does not override.
pub trait EventHandler: Send + Sync {
    /// Event kinds this handler should be invoked for.
    fn interests(&self) -> Vec<EventKind> {
        EventKind::ALL.to_vec()
    }

    /// Invoked for every `Connect` event, if subscribed.
    fn on_connect(&self, _event: &Event) -> Result<()> {
        Ok(())
    }

    /// Invoked for every `Disconnect` event, if subscribed.
    fn on_disconnect(&self, _event: &Event) -> Result<()> {
        Ok(())
    }

    /// Invoked for every `Receive` event, if subscribed.
    fn on_receive(&self, _event: &Event) -> Result<()> {
        Ok(())
    }
}

/// Identity assigned to a handler (or closure) at registration time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Callback = Arc<dyn Fn(&Event) -> Result<()> + Send + Sync>;

#[derive(Clone)]
struct Binding {
    id: HandlerId,
    callback: Callback,
}

/// Maps event kinds to ordered lists of handler bindings.
///
/// Entries are appended only; within a kind, dispatch order is registration
/// order.
pub struct HandlerRegistry {
    bindings: RwLock<HashMap<EventKind, Vec<Binding>>>,
    next_id: AtomicU64,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self { bindings: RwLock::new(HashMap::new()), next_id: AtomicU64::new(1) }
    }

    /// Registers a handler object, appending one binding per declared
    /// interest. Returns the identity shared by those bindings.
    pub fn add_handler(&self, handler: Arc<dyn EventHandler>) -> HandlerId {
        let id = self.allocate_id();
        let interests = handler.interests();
        let mut bindings = self.bindings.write();
        for kind in interests {
            let slot = handler.clone();
            let callback: Callback = match kind {
                EventKind::Connect => Arc::new(move |event| slot.on_connect(event)),
                EventKind::Disconnect => Arc::new(move |event| slot.on_disconnect(event)),
                EventKind::Receive => Arc::new(move |event| slot.on_receive(event)),
            };
            bindings.entry(kind).or_default().push(Binding { id, callback });
        }
        debug!("registered handler {:?}", id);
        id
    }

    /// Registers a single closure for one event kind.
    pub fn on<F>(&self, kind: EventKind, callback: F) -> HandlerId
    where
        F: Fn(&Event) -> Result<()> + Send + Sync + 'static,
    {
        let id = self.allocate_id();
        self.bindings
            .write()
            .entry(kind)
            .or_default()
            .push(Binding { id, callback: Arc::new(callback) });
        id
    }

    /// Invokes every binding registered for the event's kind, in
    /// registration order.
    ///
    /// A callback that returns an error or panics is reported and skipped;
    /// it never aborts dispatch to subsequent bindings.
    pub fn dispatch(&self, event: &Event) {
        let snapshot: Vec<Binding> =
            self.bindings.read().get(&event.kind()).cloned().unwrap_or_default();

        for binding in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| (binding.callback)(event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    error!("Error handling {:?} event in handler {:?}: {}", event.kind(), binding.id, err)
                }
                Err(_) => {
                    error!("Handler {:?} panicked on {:?} event", binding.id, event.kind())
                }
            }
        }
    }

    /// Returns the number of bindings registered for a kind.
    pub fn binding_count(&self, kind: EventKind) -> usize {
        self.bindings.read().get(&kind).map(Vec::len).unwrap_or(0)
    }

    fn allocate_id(&self) -> HandlerId {
        HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use peerlink_core::{
        error::ErrorKind,
        packet::Packet,
        peer::{Peer, PeerHandle},
    };

    use super::*;

    fn peer() -> Peer {
        Peer::new(PeerHandle(1), "127.0.0.1:4000".parse().unwrap())
    }

    fn connect_event() -> Event {
        Event::Connect { peer: peer(), data: 0 }
    }

    fn receive_event(payload: &[u8]) -> Event {
        Event::Receive { peer: peer(), channel: 0, packet: Packet::reliable(payload.to_vec()) }
    }

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        interests: Vec<EventKind>,
    }

    impl EventHandler for Recorder {
        fn interests(&self) -> Vec<EventKind> {
            self.interests.clone()
        }

        fn on_connect(&self, _event: &Event) -> Result<()> {
            self.log.lock().unwrap().push(format!("{}:connect", self.name));
            Ok(())
        }

        fn on_receive(&self, event: &Event) -> Result<()> {
            let text = event.packet().map(|p| p.as_text().into_owned()).unwrap_or_default();
            self.log.lock().unwrap().push(format!("{}:receive:{}", self.name, text));
            Ok(())
        }
    }

    #[test]
    fn dispatch_follows_registration_order() {
        let registry = HandlerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for name in ["first", "second", "third"] {
            registry.add_handler(Arc::new(Recorder {
                name,
                log: log.clone(),
                interests: vec![EventKind::Connect],
            }));
        }

        registry.dispatch(&connect_event());

        assert_eq!(*log.lock().unwrap(), vec!["first:connect", "second:connect", "third:connect"]);
    }

    #[test]
    fn each_binding_invoked_exactly_once_per_event() {
        let registry = HandlerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.add_handler(Arc::new(Recorder {
            name: "only",
            log: log.clone(),
            interests: EventKind::ALL.to_vec(),
        }));

        registry.dispatch(&receive_event(b"hi"));
        registry.dispatch(&receive_event(b"hi"));

        assert_eq!(*log.lock().unwrap(), vec!["only:receive:hi", "only:receive:hi"]);
    }

    #[test]
    fn interests_limit_bindings() {
        let registry = HandlerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.add_handler(Arc::new(Recorder {
            name: "rx",
            log: log.clone(),
            interests: vec![EventKind::Receive],
        }));

        assert_eq!(registry.binding_count(EventKind::Receive), 1);
        assert_eq!(registry.binding_count(EventKind::Connect), 0);

        registry.dispatch(&connect_event());
        assert!(log.lock().unwrap().is_empty());
    }

    struct Failing;

    impl EventHandler for Failing {
        fn interests(&self) -> Vec<EventKind> {
            vec![EventKind::Receive]
        }

        fn on_receive(&self, _event: &Event) -> Result<()> {
            Err(ErrorKind::Handler("scripted failure".into()))
        }
    }

    #[test]
    fn failing_handler_does_not_abort_later_bindings() {
        let registry = HandlerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.add_handler(Arc::new(Failing));
        registry.add_handler(Arc::new(Recorder {
            name: "after",
            log: log.clone(),
            interests: vec![EventKind::Receive],
        }));

        registry.dispatch(&receive_event(b"one"));
        registry.dispatch(&receive_event(b"two"));

        assert_eq!(*log.lock().unwrap(), vec!["after:receive:one", "after:receive:two"]);
    }

    #[test]
    fn panicking_closure_is_isolated() {
        let registry = HandlerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.on(EventKind::Receive, |_| panic!("scripted panic"));
        let sink = log.clone();
        registry.on(EventKind::Receive, move |event| {
            sink.lock().unwrap().push(event.packet().unwrap().as_text().into_owned());
            Ok(())
        });

        registry.dispatch(&receive_event(b"still here"));

        assert_eq!(*log.lock().unwrap(), vec!["still here"]);
    }

    #[test]
    fn closure_and_trait_bindings_share_ordering() {
        let registry = HandlerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.add_handler(Arc::new(Recorder {
            name: "trait",
            log: log.clone(),
            interests: vec![EventKind::Receive],
        }));
        let sink = log.clone();
        registry.on(EventKind::Receive, move |_| {
            sink.lock().unwrap().push("closure".into());
            Ok(())
        });

        registry.dispatch(&receive_event(b"x"));

        assert_eq!(*log.lock().unwrap(), vec!["trait:receive:x", "closure"]);
    }
}
