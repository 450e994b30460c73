//! Delivery flag bitset exposed to callers.
//!
//! The numeric values are part of the transport contract and must match
//! what the underlying stack expects; they are bitwise-combinable.

use bitflags::bitflags;

bitflags! {
    /// How a packet should be delivered. Combine with `|`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PacketFlags: u32 {
        /// Guaranteed delivery with retransmission.
        const RELIABLE = 1;
        /// No sequencing; duplicates are filtered but reordering is allowed.
        const UNSEQUENCED = 2;
        /// The transport should not copy the payload into its own buffers.
        const NO_ALLOCATE = 4;
        /// Allow unreliable packets to be fragmented.
        const UNRELIABLE_FRAGMENT = 8;
        /// Bypass bandwidth throttling for this packet.
        const UNTHROTTLED = 16;
    }
}

impl Default for PacketFlags {
    /// Reliable delivery is the default for `send` and `broadcast`.
    fn default() -> Self {
        PacketFlags::RELIABLE
    }
}
