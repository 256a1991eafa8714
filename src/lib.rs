//! # Rover Link
//!
//! Application-layer protocol between a base station and two rovers sharing a
//! half-duplex packet radio.
//!
//! Everything on air is built from 7-byte rover packets (timestamp, two signed 10-bit
//! values, a 4-bit command). Packets are batched per destination into one radio frame,
//! inbound frames pass a trust gate on their 64-bit sender address before they are
//! unwrapped into a FIFO queue, and sends can be confirmed either by the radio's own
//! delivery report or by an acknowledgment packet from the peer.
//!
//! The entry point is [`RoverLink`], which owns all link state and drives any
//! [`RadioTransport`].
//!
//! Embedded targets build with `default-features = false`; the crate is then `no_std` +
//! `alloc` and the target supplies the embassy time driver and critical section.

#![cfg_attr(not(feature = "std"), no_std)]
#![allow(async_fn_in_trait)] // We control the usage of this trait

extern crate alloc;

pub mod inbound_queue;
pub mod link;
pub mod messages;
pub mod payload;
pub mod radio_devices;
pub mod statistics;

use embassy_time::Duration;

pub use inbound_queue::{InboundQueue, UnwrapOutcome};
pub use link::RoverLink;
pub use messages::{Address64, Command, DecodedRecord, FrameSource, RadioFrame, ReceivedFrame, RoverPacket};
pub use payload::PayloadBuffer;
pub use radio_devices::{DeliveryStatus, RadioTransport, TransportError};
pub use statistics::LinkStatistics;

//Wire constants, these affect compatibility with deployed rovers
pub const RECORD_SIZE: usize = 7;
pub const MASTER_PAYLOAD_SIZE: usize = 35;
pub const SLAVE_PAYLOAD_SIZE: usize = 84;

//Largest frame the radio accepts
pub const RADIO_FRAME_SIZE: usize = 100;

const _: () = assert!(MASTER_PAYLOAD_SIZE <= RADIO_FRAME_SIZE && SLAVE_PAYLOAD_SIZE <= RADIO_FRAME_SIZE);

pub const DEFAULT_ACK_TIMEOUT_MS: u64 = 500;

// Numeric status codes as reported to operators and by existing firmware
pub const ACK_SUCCESS: i32 = 0;
pub const ACK_FAILURE: i32 = -1;
pub const RCV_SIXTEEN: i32 = 1;
pub const RCV_SIXTYFOUR: i32 = 2;
pub const RCV_ERROR: i32 = -1;
pub const RCV_UNTRUSTED: i32 = -2;
pub const ENCODE_ERROR: i32 = -1;

/// Which peer a buffer, address or counter belongs to
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(Debug))]
pub enum Role {
    Master,
    Slave,
}

impl Role {
    pub const fn name(self) -> &'static str {
        match self {
            Role::Master => "master",
            Role::Slave => "slave",
        }
    }
}

/// How a send is confirmed
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub enum AckMode {
    /// Wait for the radio's delivery report
    Transport,
    /// Wait for an acknowledgment packet from the peer. Any other frame arriving in
    /// the wait window is consumed as a failed acknowledgment and its data is lost.
    Application,
}

/// Link behaviour chosen at construction
///
/// # Example
/// ```rust
/// use embassy_time::Duration;
/// use rover_link::{AckMode, LinkConfiguration};
///
/// let configuration = LinkConfiguration {
///     ack_mode: AckMode::Application,
///     ..LinkConfiguration::default()
/// };
/// assert_eq!(configuration.ack_timeout, Duration::from_millis(500));
/// ```
#[derive(Clone, Copy)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct LinkConfiguration {
    pub ack_mode: AckMode,
    /// Upper bound for every acknowledgment wait
    pub ack_timeout: Duration,
}

impl Default for LinkConfiguration {
    fn default() -> Self {
        LinkConfiguration {
            ack_mode: AckMode::Transport,
            ack_timeout: Duration::from_millis(DEFAULT_ACK_TIMEOUT_MS),
        }
    }
}

/// Outcome of a send
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub enum AckStatus {
    Success,
    /// Timeout, transport error, wrong reply, or no acknowledgment requested
    Failure,
    /// The radio reported a non-zero delivery status
    Vendor(u8),
}

impl AckStatus {
    /// [`ACK_SUCCESS`], [`ACK_FAILURE`] or the positive vendor code
    pub const fn code(self) -> i32 {
        match self {
            AckStatus::Success => ACK_SUCCESS,
            AckStatus::Failure => ACK_FAILURE,
            AckStatus::Vendor(code) => code as i32,
        }
    }
}

/// Classification of one poll
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub enum ReceiveStatus {
    /// 16-bit addressed frame; not used for control traffic
    Sixteen,
    /// Trusted 64-bit frame, ready for [`RoverLink::unwrap_last_batch`]
    SixtyFour,
    /// 64-bit frame from an address outside the trusted set, discarded
    Untrusted,
    /// Nothing received in time, or the transport failed
    Error,
}

impl ReceiveStatus {
    pub const fn code(self) -> i32 {
        match self {
            ReceiveStatus::Sixteen => RCV_SIXTEEN,
            ReceiveStatus::SixtyFour => RCV_SIXTYFOUR,
            ReceiveStatus::Untrusted => RCV_UNTRUSTED,
            ReceiveStatus::Error => RCV_ERROR,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub enum EncodeError {
    /// No room for another packet; send or clear the payload first
    PayloadFull,
}

impl EncodeError {
    pub const fn code(self) -> i32 {
        ENCODE_ERROR
    }
}

#[cfg(feature = "std")]
impl core::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            EncodeError::PayloadFull => write!(f, "payload is full ({} byte packets)", RECORD_SIZE),
        }
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_wire_values() {
        assert_eq!(AckStatus::Success.code(), 0);
        assert_eq!(AckStatus::Failure.code(), -1);
        assert_eq!(AckStatus::Vendor(0x24).code(), 0x24);
        assert_eq!(ReceiveStatus::Sixteen.code(), 1);
        assert_eq!(ReceiveStatus::SixtyFour.code(), 2);
        assert_eq!(ReceiveStatus::Error.code(), -1);
        assert_eq!(ReceiveStatus::Untrusted.code(), -2);
        assert_eq!(EncodeError::PayloadFull.code(), -1);
    }

    #[test]
    fn default_configuration_uses_transport_acks() {
        let configuration = LinkConfiguration::default();
        assert_eq!(configuration.ack_mode, AckMode::Transport);
        assert_eq!(configuration.ack_timeout, Duration::from_millis(500));
    }

    #[test]
    fn payload_sizes_are_record_multiples() {
        assert_eq!(MASTER_PAYLOAD_SIZE % RECORD_SIZE, 0);
        assert_eq!(SLAVE_PAYLOAD_SIZE % RECORD_SIZE, 0);
        assert!(MASTER_PAYLOAD_SIZE < SLAVE_PAYLOAD_SIZE);
    }
}
