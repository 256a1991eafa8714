//! # Payload Batcher
//!
//! Outbound buffer that collects encoded rover packets until the caller sends them as
//! one radio frame.
//!
//! ## Invariants
//!
//! - The write cursor is always a multiple of [`RECORD_SIZE`]
//! - A packet is appended completely or not at all; the capacity check happens before
//!   any byte is written
//! - Bytes past the cursor are always zero, so a sent frame is zero padded and the
//!   receiver stops at the first empty timestamp
//!
//! The link owns one buffer per role, each with its own compile-time capacity.

use crate::messages::RoverPacket;
use crate::{EncodeError, RECORD_SIZE};

/// Fixed-capacity batch of rover packets waiting to be transmitted
#[cfg_attr(feature = "std", derive(Debug))]
pub struct PayloadBuffer<const CAPACITY: usize> {
    data: [u8; CAPACITY],
    end: usize,
}

impl<const CAPACITY: usize> PayloadBuffer<CAPACITY> {
    const CAPACITY_IS_RECORD_MULTIPLE: () = assert!(
        CAPACITY % RECORD_SIZE == 0 && CAPACITY >= RECORD_SIZE,
        "payload capacity must be a non-zero multiple of the record size"
    );

    pub const fn new() -> Self {
        let () = Self::CAPACITY_IS_RECORD_MULTIPLE;
        PayloadBuffer {
            data: [0u8; CAPACITY],
            end: 0,
        }
    }

    /// Appends one packet
    ///
    /// # Returns
    /// * `Ok(slots)` - number of further packets that still fit (see [`Self::slots_remaining`])
    /// * `Err(EncodeError::PayloadFull)` - no room for a whole packet; the buffer is unchanged
    pub fn try_append(&mut self, packet: &RoverPacket) -> Result<usize, EncodeError> {
        if self.end + RECORD_SIZE > CAPACITY {
            return Err(EncodeError::PayloadFull);
        }
        self.data[self.end..self.end + RECORD_SIZE].copy_from_slice(packet.as_bytes());
        self.end += RECORD_SIZE;
        Ok(self.slots_remaining())
    }

    /// How many more packets can be appended
    ///
    /// Computed as `(CAPACITY - cursor + 1) / RECORD_SIZE`. The `+ 1` is kept as-is so the
    /// values reported to the operator (and carried in statistics) match what deployed
    /// rovers already report.
    pub fn slots_remaining(&self) -> usize {
        (CAPACITY - self.end + 1) / RECORD_SIZE
    }

    pub const fn max_slots(&self) -> usize {
        CAPACITY / RECORD_SIZE
    }

    /// Zero-fills the written part and resets the cursor
    pub fn clear(&mut self) {
        self.data[..self.end].fill(0);
        self.end = 0;
    }

    /// Number of bytes written so far (always a multiple of [`RECORD_SIZE`])
    pub fn len(&self) -> usize {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end == 0
    }

    /// The packets appended so far
    pub fn written(&self) -> &[u8] {
        &self.data[..self.end]
    }

    /// The whole buffer, zero padded after the last packet; this is what goes on air
    pub fn frame(&self) -> &[u8] {
        &self.data
    }
}

impl<const CAPACITY: usize> Default for PayloadBuffer<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}
