//! # Statistics Register
//!
//! Traffic counters kept by the link and periodically reported to the master.
//!
//! All counters wrap on overflow. The worst-RSSI value is not a counter: every unwrapped
//! frame (and every received acknowledgment) overwrites it, and a statistics reset leaves
//! it alone.
//!
//! ## Report Layout
//!
//! A report is five rover packets, each carrying a pair of counters in the left/right
//! fields:
//!
//! | Command | Left | Right |
//! |---------|------|-------|
//! | 0xF | failed encodes | packets queued |
//! | 0xB | packets encoded | packets decoded |
//! | 0xE | messages to master | acks from master |
//! | 0xD | messages to slave | acks from slave |
//! | 0xC | messages from master | messages from slave |
//!
//! The fields are 10-bit signed, so only the low 10 bits of each counter are carried.

use crate::Role;
use crate::messages::Command;

/// Order in which counter pairs are sent in a statistics report
pub const REPORT_SEQUENCE: [Command; 5] = [
    Command::FailedEncodeQueuedStats,
    Command::EncodedDecodedStats,
    Command::MasterTrafficStats,
    Command::SlaveTrafficStats,
    Command::ReceivedStats,
];

#[derive(Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct LinkStatistics {
    sent_to_master: u32,
    received_from_master: u32,
    acks_from_master: u32,
    sent_to_slave: u32,
    received_from_slave: u32,
    acks_from_slave: u32,
    encoded: u32,
    decoded: u32,
    queued: u32,
    failed_encodes: u32,
    worst_rssi: u8,
}

impl LinkStatistics {
    pub const fn new() -> Self {
        LinkStatistics {
            sent_to_master: 0,
            received_from_master: 0,
            acks_from_master: 0,
            sent_to_slave: 0,
            received_from_slave: 0,
            acks_from_slave: 0,
            encoded: 0,
            decoded: 0,
            queued: 0,
            failed_encodes: 0,
            worst_rssi: 0,
        }
    }

    pub fn sent_to_master(&self) -> u32 {
        self.sent_to_master
    }

    pub fn received_from_master(&self) -> u32 {
        self.received_from_master
    }

    pub fn acks_from_master(&self) -> u32 {
        self.acks_from_master
    }

    pub fn sent_to_slave(&self) -> u32 {
        self.sent_to_slave
    }

    pub fn received_from_slave(&self) -> u32 {
        self.received_from_slave
    }

    pub fn acks_from_slave(&self) -> u32 {
        self.acks_from_slave
    }

    pub fn encoded(&self) -> u32 {
        self.encoded
    }

    pub fn decoded(&self) -> u32 {
        self.decoded
    }

    /// Total packets ever queued by unwrap (not the current queue length)
    pub fn queued(&self) -> u32 {
        self.queued
    }

    pub fn failed_encodes(&self) -> u32 {
        self.failed_encodes
    }

    /// RSSI magnitude of the last unwrapped frame; higher is worse
    pub fn worst_rssi(&self) -> u8 {
        self.worst_rssi
    }

    pub(crate) fn record_sent(&mut self, role: Role) {
        match role {
            Role::Master => self.sent_to_master = self.sent_to_master.wrapping_add(1),
            Role::Slave => self.sent_to_slave = self.sent_to_slave.wrapping_add(1),
        }
    }

    pub(crate) fn record_received(&mut self, role: Role) {
        match role {
            Role::Master => self.received_from_master = self.received_from_master.wrapping_add(1),
            Role::Slave => self.received_from_slave = self.received_from_slave.wrapping_add(1),
        }
    }

    pub(crate) fn record_ack(&mut self, role: Role) {
        match role {
            Role::Master => self.acks_from_master = self.acks_from_master.wrapping_add(1),
            Role::Slave => self.acks_from_slave = self.acks_from_slave.wrapping_add(1),
        }
    }

    pub(crate) fn record_encoded(&mut self) {
        self.encoded = self.encoded.wrapping_add(1);
    }

    pub(crate) fn record_failed_encode(&mut self) {
        self.failed_encodes = self.failed_encodes.wrapping_add(1);
    }

    pub(crate) fn record_decoded(&mut self) {
        self.decoded = self.decoded.wrapping_add(1);
    }

    pub(crate) fn record_queued(&mut self, count: usize) {
        self.queued = self.queued.wrapping_add(count as u32);
    }

    pub(crate) fn set_worst_rssi(&mut self, rssi: u8) {
        self.worst_rssi = rssi;
    }

    /// Zeroes every counter; the worst RSSI is kept
    pub fn reset(&mut self) {
        *self = LinkStatistics {
            worst_rssi: self.worst_rssi,
            ..LinkStatistics::new()
        };
    }

    /// Counter pair reported under `command`
    ///
    /// # Returns
    /// * `Some((left, right))` for the five statistics commands
    /// * `None` for any other command
    pub fn report_pair(&self, command: Command) -> Option<(u32, u32)> {
        match command {
            Command::FailedEncodeQueuedStats => Some((self.failed_encodes, self.queued)),
            Command::EncodedDecodedStats => Some((self.encoded, self.decoded)),
            Command::MasterTrafficStats => Some((self.sent_to_master, self.acks_from_master)),
            Command::SlaveTrafficStats => Some((self.sent_to_slave, self.acks_from_slave)),
            Command::ReceivedStats => Some((self.received_from_master, self.received_from_slave)),
            _ => None,
        }
    }
}

/// Truncates a counter to the 10-bit signed field of a rover packet
///
/// Values of 512 and above come out negative on the receiving side.
pub fn counter_field(value: u32) -> i16 {
    let bits = (value & 0x03FF) as i16;
    if bits & 0x0200 != 0 { bits - 0x0400 } else { bits }
}
