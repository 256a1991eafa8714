//! # Messages Module
//!
//! Wire-level data structures of the rover link.
//!
//! ## Architecture
//!
//! - **RoverPacket**: the fixed 7-byte record (timestamp, two signed 10-bit values, command)
//! - **Command**: the 16 command nibbles
//! - **RadioFrame / ReceivedFrame**: one radio frame and the metadata the transport reports with it
//!
//! ## Batching
//!
//! A radio frame carries zero or more rover packets back to back. The frame is padded
//! with zeros up to the payload capacity; the first packet whose timestamp is zero
//! terminates the batch.

pub mod command;
pub mod radio_frame;
pub mod rover_packet;

pub use command::Command;
pub use radio_frame::{Address64, FrameSource, RadioFrame, ReceivedFrame};
pub use rover_packet::{DecodedRecord, RoverPacket};
