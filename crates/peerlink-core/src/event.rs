//! Typed event records produced by polling a transport host.
//!
//! Each poll yields at most one `Event`; a poll that times out yields
//! `None` from the transport rather than a dedicated event variant. Events
//! are produced once per poll cycle, dispatched synchronously, and then
//! discarded.

use crate::{packet::Packet, peer::Peer};

/// The kind of an event, used as the registry key for handler bindings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A connection with a peer has been established.
    Connect,
    /// A peer has disconnected (gracefully or by timing out).
    Disconnect,
    /// A packet arrived from a connected peer.
    Receive,
}

impl EventKind {
    /// All event kinds, in dispatch-table order.
    pub const ALL: [EventKind; 3] = [EventKind::Connect, EventKind::Disconnect, EventKind::Receive];
}

/// A discrete occurrence reported by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A new connection was established with `peer`. `data` is the word the
    /// remote supplied with its connection attempt.
    Connect {
        /// The newly connected peer.
        peer: Peer,
        /// Peer-supplied connect data.
        data: u32,
    },
    /// `peer` disconnected. Its handle must be treated as invalid from here
    /// on; the core does not track liveness on behalf of callers.
    Disconnect {
        /// The peer that disconnected.
        peer: Peer,
        /// Peer-supplied disconnect data.
        data: u32,
    },
    /// A packet arrived from `peer` on `channel`.
    Receive {
        /// The sending peer.
        peer: Peer,
        /// Channel the packet arrived on.
        channel: u8,
        /// The received payload.
        packet: Packet,
    },
}

impl Event {
    /// Returns the kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Connect { .. } => EventKind::Connect,
            Event::Disconnect { .. } => EventKind::Disconnect,
            Event::Receive { .. } => EventKind::Receive,
        }
    }

    /// Returns the peer this event concerns.
    pub fn peer(&self) -> &Peer {
        match self {
            Event::Connect { peer, .. }
            | Event::Disconnect { peer, .. }
            | Event::Receive { peer, .. } => peer,
        }
    }

    /// Returns the channel id; 0 for connect and disconnect events.
    pub fn channel(&self) -> u8 {
        match self {
            Event::Receive { channel, .. } => *channel,
            _ => 0,
        }
    }

    /// Returns the auxiliary data word; 0 for receive events.
    pub fn data(&self) -> u32 {
        match self {
            Event::Connect { data, .. } | Event::Disconnect { data, .. } => *data,
            Event::Receive { .. } => 0,
        }
    }

    /// Returns the packet, present only for receive events.
    pub fn packet(&self) -> Option<&Packet> {
        match self {
            Event::Receive { packet, .. } => Some(packet),
            _ => None,
        }
    }
}
