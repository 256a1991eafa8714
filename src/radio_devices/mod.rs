//! Radio transports
//!
//! The link does not talk to hardware itself. It drives anything implementing
//! [`RadioTransport`]: a driver for the physical radio, or the channel-backed
//! simulator in [`simulator`] used for tests and host demos.
//!
//! The transport owns framing, radio-level retransmission and RSSI measurement. Its
//! waits may be unbounded; the link races every wait against its own timeout.

#[cfg(feature = "radio-device-simulator")]
pub mod simulator;

use crate::messages::{Address64, ReceivedFrame};

/// Errors reported by a transport
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TransportError {
    /// Frame failed its checksum
    ChecksumFailure,
    /// Frame longer than the receive buffer
    FrameTooLong,
    /// Framing lost sync (unexpected start byte)
    UnexpectedStartByte,
    /// A frame arrived where a delivery status was expected (or the other way round)
    UnexpectedFrame,
    /// The radio is gone
    Disconnected,
}

#[cfg(feature = "std")]
impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TransportError::ChecksumFailure => write!(f, "frame checksum failure"),
            TransportError::FrameTooLong => write!(f, "frame exceeds receive buffer"),
            TransportError::UnexpectedStartByte => write!(f, "unexpected start byte"),
            TransportError::UnexpectedFrame => write!(f, "unexpected frame type"),
            TransportError::Disconnected => write!(f, "radio disconnected"),
        }
    }
}

/// Delivery report for a frame sent with `want_status`
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub enum DeliveryStatus {
    Delivered,
    /// Vendor status code, see [`vendor_status_description`]
    Failed(u8),
}

/// Human readable meaning of a radio TX status code, for logs
pub fn vendor_status_description(code: u8) -> &'static str {
    match code {
        0x00 => "success",
        0x01 => "MAC acknowledgement never occurred",
        0x02 => "CCA failure",
        0x03 => "purged without being transmitted",
        0x04 => "physical error on the transceiver interface",
        0x18 => "no buffers",
        0x21 => "network acknowledgement never occurred",
        0x22 => "not joined to network",
        0x23 => "self-addressed",
        0x24 => "address not found",
        0x25 => "route not found",
        0x26 => "broadcast relay was not heard",
        0x2B => "invalid binding table index",
        0x2C => "invalid endpoint",
        0x31 => "software error",
        0x32 => "resource error",
        0x74 => "data payload too large",
        0x76 => "client socket creation failed",
        0xBB => "key not authorized",
        _ => "unknown status",
    }
}

/// Interface between the rover link and a packet radio
///
/// # Examples
/// ```rust,ignore
/// async fn ping<T: RadioTransport>(radio: &mut T, to: Address64) -> bool {
///     radio.send_frame(to, &[0, 0, 0, 1, 0, 0, 2], true).await.is_ok()
///         && radio.delivery_status().await == Ok(DeliveryStatus::Delivered)
/// }
/// ```
pub trait RadioTransport {
    /// Queues `payload` for transmission to `destination`
    ///
    /// With `want_status` the radio reports the outcome through
    /// [`RadioTransport::delivery_status`]; without it no report is produced.
    async fn send_frame(&mut self, destination: Address64, payload: &[u8], want_status: bool) -> Result<(), TransportError>;

    /// Waits for the next received frame
    async fn receive_frame(&mut self) -> Result<ReceivedFrame, TransportError>;

    /// Waits for the delivery report of the last frame sent with `want_status`
    async fn delivery_status(&mut self) -> Result<DeliveryStatus, TransportError>;
}
