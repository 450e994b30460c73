//! Immutable packet payloads.

use std::{borrow::Cow, sync::Arc};

use crate::flags::PacketFlags;

/// An immutable byte payload plus delivery-flag metadata.
///
/// The payload is reference-counted so that broadcast fan-out shares a
/// single buffer instead of copying it per peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    payload: Arc<[u8]>,
    flags: PacketFlags,
}

impl Packet {
    /// Creates a packet with the given payload and flags.
    pub fn new(payload: impl Into<Arc<[u8]>>, flags: PacketFlags) -> Packet {
        Packet { payload: payload.into(), flags }
    }

    /// Creates a reliable packet (the common case).
    pub fn reliable(payload: Vec<u8>) -> Packet {
        Packet::new(payload, PacketFlags::RELIABLE)
    }

    /// Creates an unsequenced packet (duplicates filtered, reordering allowed).
    pub fn unsequenced(payload: Vec<u8>) -> Packet {
        Packet::new(payload, PacketFlags::UNSEQUENCED)
    }

    /// Returns the payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Returns a cheap clone of the shared payload buffer.
    pub fn payload_arc(&self) -> Arc<[u8]> {
        self.payload.clone()
    }

    /// Returns the delivery flags.
    pub fn flags(&self) -> PacketFlags {
        self.flags
    }

    /// Returns the payload length in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns true if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Interprets the payload as text, stopping at the first zero byte.
    ///
    /// Native senders often null-terminate their strings; the terminator and
    /// anything after it are not part of the text. Invalid UTF-8 is replaced
    /// lossily.
    pub fn as_text(&self) -> Cow<'_, str> {
        let end = self.payload.iter().position(|&b| b == 0).unwrap_or(self.payload.len());
        String::from_utf8_lossy(&self.payload[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_text_stops_at_first_zero_byte() {
        let packet = Packet::reliable(b"ping\0garbage".to_vec());
        assert_eq!(packet.as_text(), "ping");
    }

    #[test]
    fn as_text_without_terminator_uses_whole_payload() {
        let packet = Packet::reliable(b"pong".to_vec());
        assert_eq!(packet.as_text(), "pong");
    }

    #[test]
    fn as_text_replaces_invalid_utf8() {
        let packet = Packet::reliable(vec![0xff, 0xfe]);
        assert_eq!(packet.as_text(), "\u{fffd}\u{fffd}");
    }

    #[test]
    fn payload_is_shared_not_copied() {
        let packet = Packet::reliable(vec![1, 2, 3]);
        let other = packet.clone();
        assert!(Arc::ptr_eq(&packet.payload_arc(), &other.payload_arc()));
    }
}
