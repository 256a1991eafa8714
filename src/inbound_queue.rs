//! # Inbound Queue
//!
//! Unbounded FIFO of rover packets that arrived from a trusted sender but have not been
//! decoded yet, plus the batch scan ("unwrap") that fills it.
//!
//! ## Unwrap Rules
//!
//! A batch is read in consecutive 7-byte strides:
//! 1. A stride whose timestamp bytes are all zero ends the scan (padding or a truncated
//!    frame). It is not queued.
//! 2. With application-level acknowledgments, an acknowledgment record ends the scan.
//!    Acks are normally consumed while waiting after a send; one showing up here is a
//!    stray and must not be mistaken for data.
//! 3. Anything else is queued as raw bytes.
//!
//! A trailing stride shorter than 7 bytes is ignored. The queue never reorders: an
//! emergency stop is only reported through [`UnwrapOutcome::high_priority`].

use alloc::collections::VecDeque;

use crate::messages::RoverPacket;
use crate::{AckMode, RECORD_SIZE};
use log::{Level, log};

/// Result of scanning one batch
#[derive(Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct UnwrapOutcome {
    /// Number of packets added to the queue
    pub queued: usize,
    /// At least one queued packet carries an emergency stop
    pub high_priority: bool,
}

#[derive(Default)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct InboundQueue {
    packets: VecDeque<RoverPacket>,
}

impl InboundQueue {
    pub const fn new() -> Self {
        InboundQueue { packets: VecDeque::new() }
    }

    /// Splits `batch` into rover packets and queues every valid one
    pub fn unwrap_batch(&mut self, batch: &[u8], ack_mode: AckMode) -> UnwrapOutcome {
        let mut outcome = UnwrapOutcome::default();

        for stride in batch.chunks_exact(RECORD_SIZE) {
            let mut bytes = [0u8; RECORD_SIZE];
            bytes.copy_from_slice(stride);
            let packet = RoverPacket::from_bytes(bytes);

            if packet.is_end_of_batch() {
                break;
            }

            if ack_mode == AckMode::Application && packet.is_acknowledgment() {
                log!(Level::Debug, "Stray acknowledgment inside a batch, stopping unwrap");
                break;
            }

            if packet.is_high_priority() {
                outcome.high_priority = true;
            }
            self.enqueue(packet);
            outcome.queued += 1;
        }

        log!(
            Level::Debug,
            "Unwrapped {} packet(s) from a {} byte batch, {} waiting",
            outcome.queued,
            batch.len(),
            self.packets.len()
        );
        outcome
    }

    pub fn enqueue(&mut self, packet: RoverPacket) {
        self.packets.push_back(packet);
    }

    /// Removes the oldest packet
    pub fn dequeue(&mut self) -> Option<RoverPacket> {
        self.packets.pop_front()
    }

    /// Drops everything without decoding
    pub fn drain(&mut self) {
        while self.packets.pop_front().is_some() {}
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }
}
