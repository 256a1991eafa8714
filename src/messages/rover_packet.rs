//! # Rover Packet Module
//!
//! The 7-byte record every message on the link is built from.
//!
//! ## Packet Structure
//!
//! ```text
//! byte:  0        1        2        3        4        5        6
//!       [   timestamp (u32, big-endian)   ][ L9..L2 ][L1L0 R9..R4][R3..R0 CMD]
//! ```
//!
//! - Bytes 0-3: timestamp in milliseconds
//! - Byte 4: high 8 bits of the signed 10-bit left value
//! - Byte 5: low 2 bits of left (bits 7-6), high 6 bits of the signed 10-bit right value (bits 5-0)
//! - Byte 6: low 4 bits of right (bits 7-4), command nibble (bits 3-0)
//!
//! ## Reserved Values
//!
//! - Timestamp `0x00000000` marks the end of a batch. Frames are padded with zeros up
//!   to the payload capacity, so the first all-zero timestamp ends the scan.
//! - Timestamp `0xFFFFFFFF` with command `0xA` is an acknowledgment and carries no data.
//!
//! ## Zero Values
//!
//! A left or right value of 0 is not routed through the packing at all, so an unset
//! field and an explicit 0 produce the same bytes. Both decode to 0.

use super::command::Command;
use crate::RECORD_SIZE;

const ACK_TIMESTAMP: u32 = 0xFFFF_FFFF;

/// One record as it travels over the air
///
/// The packet keeps its raw bytes; the numeric fields are only unpacked on demand by
/// [`RoverPacket::decode`] or the individual accessors.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct RoverPacket {
    bytes: [u8; RECORD_SIZE],
}

/// Logical fields of a rover packet
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct DecodedRecord {
    pub timestamp: u32,
    pub command: Command,
    /// Signed 10-bit value (-512..=511)
    pub left: i16,
    /// Signed 10-bit value (-512..=511)
    pub right: i16,
}

impl RoverPacket {
    /// The acknowledgment record: all-ones timestamp, no data, command 0xA
    pub const ACKNOWLEDGMENT: RoverPacket = RoverPacket {
        bytes: [0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, Command::NavigationOrAck as u8],
    };

    /// Packs the fields into their wire form
    ///
    /// Only the low 10 bits of `left` and `right` are kept, so values outside
    /// -512..=511 wrap.
    pub fn encode(command: Command, left: i16, right: i16, timestamp: u32) -> Self {
        let mut bytes = [0u8; RECORD_SIZE];
        bytes[0..4].copy_from_slice(&timestamp.to_be_bytes());

        if left != 0 {
            bytes[5] = ((left & 0x03) as u8) << 6;
            bytes[4] = ((left >> 2) & 0xFF) as u8;
        }

        if right != 0 {
            bytes[6] = ((right & 0x0F) as u8) << 4;
            bytes[5] += ((right >> 4) & 0x3F) as u8;
        }

        // The low nibble of byte 6 is still zero here, the addition cannot carry
        bytes[6] += command.nibble();

        RoverPacket { bytes }
    }

    pub const fn from_bytes(bytes: [u8; RECORD_SIZE]) -> Self {
        RoverPacket { bytes }
    }

    /// Reads a packet from the start of `data`
    ///
    /// # Returns
    /// * `Some(packet)` when `data` holds at least one full record
    /// * `None` when it is shorter than [`RECORD_SIZE`]
    pub fn from_slice(data: &[u8]) -> Option<Self> {
        let bytes: [u8; RECORD_SIZE] = data.get(..RECORD_SIZE)?.try_into().ok()?;
        Some(RoverPacket { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; RECORD_SIZE] {
        &self.bytes
    }

    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.bytes[0], self.bytes[1], self.bytes[2], self.bytes[3]])
    }

    pub fn command(&self) -> Command {
        Command::from_nibble(self.bytes[6])
    }

    /// Recovers the left value
    ///
    /// Byte 4 is moved to the top of a 16-bit signed value so its bit 7 becomes the
    /// sign bit, the arithmetic shift right by 6 sign-extends it down to a 10-bit
    /// magnitude, and the two low bits from byte 5 are added back in.
    pub fn left(&self) -> i16 {
        let mut left = ((self.bytes[4] as u16) << 8) as i16;
        left >>= 6;
        left += (self.bytes[5] >> 6) as i16;
        left
    }

    /// Recovers the right value
    ///
    /// Shifting byte 5 up by 10 discards the two left-value bits and places bit 5 on the
    /// sign bit; the low nibble comes from the top of byte 6.
    pub fn right(&self) -> i16 {
        let mut right = ((self.bytes[5] as u16) << 10) as i16;
        right >>= 6;
        right += (self.bytes[6] >> 4) as i16;
        right
    }

    pub fn decode(&self) -> DecodedRecord {
        DecodedRecord {
            timestamp: self.timestamp(),
            command: self.command(),
            left: self.left(),
            right: self.right(),
        }
    }

    /// True when the timestamp bytes are all zero (padding after the last record)
    pub fn is_end_of_batch(&self) -> bool {
        self.bytes[0..4] == [0, 0, 0, 0]
    }

    pub fn is_acknowledgment(&self) -> bool {
        self.timestamp() == ACK_TIMESTAMP && self.command() == Command::NavigationOrAck
    }

    pub fn is_high_priority(&self) -> bool {
        self.command().is_high_priority()
    }
}
