//! # Rover Commands
//!
//! The 4-bit command nibble carried in the last byte of every rover packet.
//!
//! | Nibble | Command |
//! |--------|---------|
//! | 0x0 | Emergency stop |
//! | 0x1 | Slow stop |
//! | 0x2 | Forward |
//! | 0x3 | Backward |
//! | 0x4 | Turn left 90 |
//! | 0x5 | Turn right 90 |
//! | 0x6 | Start search/follow |
//! | 0x7 | IR sensor data/request |
//! | 0x8 | Magnetometer sensor data |
//! | 0x9 | (unassigned) |
//! | 0xA | Navigation data / acknowledgment |
//! | 0xB | Statistics: packets encoded/decoded |
//! | 0xC | Statistics: messages from master/slave |
//! | 0xD | Statistics: messages to slave/acks from slave |
//! | 0xE | Statistics: messages to master/acks from master |
//! | 0xF | Statistics: failed encodes/packets queued |
//!
//! Every nibble maps to a variant, so decoding a command never fails.

/// Command carried in the low nibble of byte 6 of a rover packet
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(Debug))]
#[repr(u8)]
pub enum Command {
    /// High priority: the receiver should react before draining the rest of its queue
    EmergencyStop = 0x0,
    SlowStop = 0x1,
    Forward = 0x2,
    Backward = 0x3,
    TurnLeft90 = 0x4,
    TurnRight90 = 0x5,
    SearchFollow = 0x6,
    IrSensor = 0x7,
    MagSensor = 0x8,
    Unassigned = 0x9,
    /// Navigation data, or (with an all-ones timestamp) an acknowledgment
    NavigationOrAck = 0xA,
    EncodedDecodedStats = 0xB,
    ReceivedStats = 0xC,
    SlaveTrafficStats = 0xD,
    MasterTrafficStats = 0xE,
    FailedEncodeQueuedStats = 0xF,
}

impl Command {
    /// Maps the low nibble of `value` to a command. The high nibble is ignored.
    pub const fn from_nibble(value: u8) -> Self {
        match value & 0x0F {
            0x0 => Command::EmergencyStop,
            0x1 => Command::SlowStop,
            0x2 => Command::Forward,
            0x3 => Command::Backward,
            0x4 => Command::TurnLeft90,
            0x5 => Command::TurnRight90,
            0x6 => Command::SearchFollow,
            0x7 => Command::IrSensor,
            0x8 => Command::MagSensor,
            0x9 => Command::Unassigned,
            0xA => Command::NavigationOrAck,
            0xB => Command::EncodedDecodedStats,
            0xC => Command::ReceivedStats,
            0xD => Command::SlaveTrafficStats,
            0xE => Command::MasterTrafficStats,
            _ => Command::FailedEncodeQueuedStats,
        }
    }

    pub const fn nibble(self) -> u8 {
        self as u8
    }

    /// True for the commands a receiver must act on before anything else queued
    pub const fn is_high_priority(self) -> bool {
        matches!(self, Command::EmergencyStop)
    }

    /// True for the reserved codes used by statistics reports
    pub const fn is_statistics(self) -> bool {
        matches!(
            self,
            Command::EncodedDecodedStats
                | Command::ReceivedStats
                | Command::SlaveTrafficStats
                | Command::MasterTrafficStats
                | Command::FailedEncodeQueuedStats
        )
    }
}

impl From<Command> for u8 {
    fn from(command: Command) -> Self {
        command.nibble()
    }
}
