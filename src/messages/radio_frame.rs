//! # Radio Frame Module
//!
//! What the transport hands over: one radio frame, who sent it, and how strong it was.
//!
//! ## Architecture
//!
//! - **RadioFrame**: fixed-size buffer plus the number of valid bytes
//! - **Address64**: 64-bit hardware address of a radio, the only identity the link trusts
//! - **FrameSource**: 64-bit or 16-bit addressing of the sender
//! - **ReceivedFrame**: a frame together with its source and RSSI
//!
//! ## Design Considerations
//!
//! - **Public Fields**: `data` and `length` are public so radio drivers can fill the
//!   buffer in place
//! - **Fixed Size**: every frame has the same footprint, no allocation on the receive path

use crate::RADIO_FRAME_SIZE;

/// 64-bit radio address
///
/// Radios usually print their address as two 32-bit halves (serial number high/low);
/// [`Address64::from_parts`] builds one from those.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct Address64(pub u64);

impl Address64 {
    pub const fn from_parts(msb: u32, lsb: u32) -> Self {
        Address64(((msb as u64) << 32) | lsb as u64)
    }

    pub const fn msb(&self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub const fn lsb(&self) -> u32 {
        self.0 as u32
    }
}

#[cfg(feature = "std")]
impl core::fmt::Display for Address64 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:08X}:{:08X}", self.msb(), self.lsb())
    }
}

/// Addressing mode and address of the radio that sent a frame
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub enum FrameSource {
    /// 16-bit network address; never used for control traffic
    Short(u16),
    /// 64-bit hardware address, checked against the trusted set
    Long(Address64),
}

/// Raw frame as carried by the radio
#[derive(Clone)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct RadioFrame {
    /// Frame buffer of fixed size
    pub data: [u8; RADIO_FRAME_SIZE],

    /// Number of valid bytes in `data`
    pub length: usize,
}

impl RadioFrame {
    pub const fn new() -> Self {
        RadioFrame {
            data: [0u8; RADIO_FRAME_SIZE],
            length: 0,
        }
    }

    /// Copies `payload` into a new frame
    ///
    /// # Returns
    /// * `Some(frame)` if the payload fits
    /// * `None` if it is longer than [`RADIO_FRAME_SIZE`]
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        if payload.len() > RADIO_FRAME_SIZE {
            return None;
        }
        let mut frame = RadioFrame::new();
        frame.data[..payload.len()].copy_from_slice(payload);
        frame.length = payload.len();
        Some(frame)
    }

    /// The valid part of the buffer
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.length.min(RADIO_FRAME_SIZE)]
    }
}

impl Default for RadioFrame {
    fn default() -> Self {
        Self::new()
    }
}

/// A frame delivered by the transport
#[derive(Clone)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct ReceivedFrame {
    pub source: FrameSource,
    pub frame: RadioFrame,
    /// Magnitude of the received signal strength; higher is worse
    pub rssi: u8,
}

impl ReceivedFrame {
    pub fn payload(&self) -> &[u8] {
        self.frame.payload()
    }

    /// The 64-bit sender address, if the frame used 64-bit addressing
    pub fn long_source(&self) -> Option<Address64> {
        match self.source {
            FrameSource::Long(address) => Some(address),
            FrameSource::Short(_) => None,
        }
    }
}
