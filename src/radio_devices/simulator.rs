//! # Radio Simulator - Testing and Development Mock
//!
//! A channel-backed [`RadioTransport`] plus a simulated "air" that moves frames between
//! attached radios, so whole links can run on a host without hardware.
//!
//! ## Architecture
//!
//! ```text
//! RoverLink -> SimulatedRadio --(output queue)--> SimulatedAir --(input queue)--> SimulatedRadio -> RoverLink
//! ```
//!
//! - **Output Queue**: frames a radio wants to transmit
//! - **Input Queue**: frames delivered to a radio, and delivery reports for its own sends
//! - **SimulatedAir**: routes by 64-bit destination, drops a configurable share of frames
//!   and answers every send that asked for a status
//!
//! ## Delivery Reports
//!
//! | Situation | Report |
//! |-----------|--------|
//! | delivered | `Delivered` |
//! | lost on air | `Failed(0x01)`, no MAC acknowledgement |
//! | no radio with that address | `Failed(0x24)`, address not found |
//!
//! Reported RSSI is a base value plus random jitter, like a real link that fades a little
//! from frame to frame.

use crate::messages::{Address64, FrameSource, RadioFrame, ReceivedFrame};
use crate::radio_devices::{DeliveryStatus, RadioTransport, TransportError};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Timer};
use log::{Level, log};
use rand_core::RngCore;
use rand_core::SeedableRng;
use rand_wyrand::WyRand;

const STATUS_NO_MAC_ACK: u8 = 0x01;
const STATUS_ADDRESS_NOT_FOUND: u8 = 0x24;

const RADIO_OUTPUT_QUEUE_SIZE: usize = 10;

pub type RadioOutputQueue = embassy_sync::channel::Channel<CriticalSectionRawMutex, RadioOutputMessage, RADIO_OUTPUT_QUEUE_SIZE>;
pub type RadioOutputQueueReceiver = embassy_sync::channel::Receiver<'static, CriticalSectionRawMutex, RadioOutputMessage, RADIO_OUTPUT_QUEUE_SIZE>;
pub type RadioOutputQueueSender = embassy_sync::channel::Sender<'static, CriticalSectionRawMutex, RadioOutputMessage, RADIO_OUTPUT_QUEUE_SIZE>;

const RADIO_INPUT_QUEUE_SIZE: usize = 10;

pub type RadioInputQueue = embassy_sync::channel::Channel<CriticalSectionRawMutex, RadioInputMessage, RADIO_INPUT_QUEUE_SIZE>;
pub type RadioInputQueueReceiver = embassy_sync::channel::Receiver<'static, CriticalSectionRawMutex, RadioInputMessage, RADIO_INPUT_QUEUE_SIZE>;
pub type RadioInputQueueSender = embassy_sync::channel::Sender<'static, CriticalSectionRawMutex, RadioInputMessage, RADIO_INPUT_QUEUE_SIZE>;

/// Messages from a simulated radio to the air
#[derive(Debug)]
pub enum RadioOutputMessage {
    SendFrame {
        destination: Address64,
        frame: RadioFrame,
        want_status: bool,
    },
}

/// Messages from the air to a simulated radio
#[derive(Debug)]
pub enum RadioInputMessage {
    ReceiveFrame(ReceivedFrame),
    /// Report for the last send that asked for one
    DeliveryStatus(DeliveryStatus),
}

/// Simulated radio, one per node
///
/// Created by [`SimulatedAir::attach`].
pub struct SimulatedRadio {
    address: Address64,
    output_queue_sender: RadioOutputQueueSender,
    input_queue_receiver: RadioInputQueueReceiver,
}

impl SimulatedRadio {
    pub const fn with(address: Address64, output_queue_sender: RadioOutputQueueSender, input_queue_receiver: RadioInputQueueReceiver) -> Self {
        SimulatedRadio {
            address,
            output_queue_sender,
            input_queue_receiver,
        }
    }

    pub fn address(&self) -> Address64 {
        self.address
    }
}

impl core::fmt::Debug for SimulatedRadio {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SimulatedRadio").field("address", &self.address).finish_non_exhaustive()
    }
}

impl RadioTransport for SimulatedRadio {
    async fn send_frame(&mut self, destination: Address64, payload: &[u8], want_status: bool) -> Result<(), TransportError> {
        let frame = RadioFrame::from_payload(payload).ok_or(TransportError::FrameTooLong)?;
        log!(Level::Trace, "[{}] Sending {} bytes to {}", self.address, payload.len(), destination);
        self.output_queue_sender
            .send(RadioOutputMessage::SendFrame {
                destination,
                frame,
                want_status,
            })
            .await;
        Ok(())
    }

    async fn receive_frame(&mut self) -> Result<ReceivedFrame, TransportError> {
        loop {
            match self.input_queue_receiver.receive().await {
                RadioInputMessage::ReceiveFrame(received) => return Ok(received),
                RadioInputMessage::DeliveryStatus(status) => {
                    log!(Level::Warn, "[{}] Not waiting for a delivery status, dropping {:?}", self.address, status);
                }
            }
        }
    }

    async fn delivery_status(&mut self) -> Result<DeliveryStatus, TransportError> {
        match self.input_queue_receiver.receive().await {
            RadioInputMessage::DeliveryStatus(status) => Ok(status),
            RadioInputMessage::ReceiveFrame(received) => {
                log!(
                    Level::Warn,
                    "[{}] Frame arrived while waiting for a delivery status, dropping {} bytes",
                    self.address,
                    received.payload().len()
                );
                Err(TransportError::UnexpectedFrame)
            }
        }
    }
}

struct AttachedRadio {
    address: Address64,
    output_queue_receiver: RadioOutputQueueReceiver,
    input_queue_sender: RadioInputQueueSender,
}

/// Shared medium for any number of [`SimulatedRadio`]s
pub struct SimulatedAir {
    radios: Vec<AttachedRadio>,
    rng: WyRand,
    loss_percent: u8,
    base_rssi: u8,
    rssi_jitter: u8,
}

impl SimulatedAir {
    /// # Arguments
    /// * `rng_seed` - seed for loss and RSSI jitter, runs with the same seed behave the same
    /// * `loss_percent` - share of frames lost on air, 0..=100
    /// * `base_rssi` - RSSI magnitude reported for every delivered frame
    pub fn new(rng_seed: u64, loss_percent: u8, base_rssi: u8) -> Self {
        SimulatedAir {
            radios: Vec::new(),
            rng: WyRand::seed_from_u64(rng_seed),
            loss_percent: loss_percent.min(100),
            base_rssi,
            rssi_jitter: 0,
        }
    }

    /// Adds up to `jitter` to the reported RSSI of each frame
    pub fn with_rssi_jitter(mut self, jitter: u8) -> Self {
        self.rssi_jitter = jitter;
        self
    }

    /// Creates a radio listening on `address`
    pub fn attach(&mut self, address: Address64) -> SimulatedRadio {
        let output_queue: &'static RadioOutputQueue = Box::leak(Box::new(RadioOutputQueue::new()));
        let input_queue: &'static RadioInputQueue = Box::leak(Box::new(RadioInputQueue::new()));
        self.radios.push(AttachedRadio {
            address,
            output_queue_receiver: output_queue.receiver(),
            input_queue_sender: input_queue.sender(),
        });
        log!(Level::Info, "Radio {} attached to simulated air", address);
        SimulatedRadio::with(address, output_queue.sender(), input_queue.receiver())
    }

    /// Routes every frame waiting in the output queues
    ///
    /// # Returns
    /// Number of frames delivered
    pub fn deliver_pending(&mut self) -> usize {
        let mut delivered = 0;
        for index in 0..self.radios.len() {
            while let Ok(RadioOutputMessage::SendFrame {
                destination,
                frame,
                want_status,
            }) = self.radios[index].output_queue_receiver.try_receive()
            {
                let source = self.radios[index].address;
                let status = self.route(source, destination, frame);
                if status == DeliveryStatus::Delivered {
                    delivered += 1;
                }
                if want_status && self.radios[index].input_queue_sender.try_send(RadioInputMessage::DeliveryStatus(status)).is_err() {
                    log!(Level::Warn, "Input queue of {} full, delivery status lost", source);
                }
            }
        }
        delivered
    }

    fn route(&mut self, source: Address64, destination: Address64, frame: RadioFrame) -> DeliveryStatus {
        let Some(target) = self.radios.iter().position(|radio| radio.address == destination) else {
            log!(Level::Debug, "{} -> {}: no such radio", source, destination);
            return DeliveryStatus::Failed(STATUS_ADDRESS_NOT_FOUND);
        };

        if self.rng.next_u32() % 100 < self.loss_percent as u32 {
            log!(Level::Debug, "{} -> {}: lost on air", source, destination);
            return DeliveryStatus::Failed(STATUS_NO_MAC_ACK);
        }

        let received = ReceivedFrame {
            source: FrameSource::Long(source),
            frame,
            rssi: self.next_rssi(),
        };
        match self.radios[target].input_queue_sender.try_send(RadioInputMessage::ReceiveFrame(received)) {
            Ok(()) => {
                log!(Level::Trace, "{} -> {}: delivered", source, destination);
                DeliveryStatus::Delivered
            }
            Err(_) => {
                log!(Level::Warn, "{} -> {}: receiver overrun", source, destination);
                DeliveryStatus::Failed(STATUS_NO_MAC_ACK)
            }
        }
    }

    fn next_rssi(&mut self) -> u8 {
        let jitter = (self.rng.next_u32() % (self.rssi_jitter as u32 + 1)) as u8;
        self.base_rssi.saturating_add(jitter)
    }

    /// Puts a frame straight into the input queue of `to`, bypassing loss
    ///
    /// Used to simulate foreign traffic, for example from an untrusted address.
    ///
    /// # Returns
    /// false if `to` is not attached, the payload is too long or the queue is full
    pub fn inject_noise(&mut self, to: Address64, source: FrameSource, payload: &[u8]) -> bool {
        let Some(frame) = RadioFrame::from_payload(payload) else {
            return false;
        };
        let rssi = self.next_rssi();
        let Some(radio) = self.radios.iter().find(|radio| radio.address == to) else {
            return false;
        };
        radio
            .input_queue_sender
            .try_send(RadioInputMessage::ReceiveFrame(ReceivedFrame { source, frame, rssi }))
            .is_ok()
    }

    /// Delivers frames every `tick`, forever
    ///
    /// Race it against the links under test, or spawn it as its own task.
    pub async fn run(&mut self, tick: Duration) {
        loop {
            self.deliver_pending();
            Timer::after(tick).await;
        }
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::messages::{Command, RoverPacket};
    use crate::{AckMode, AckStatus, LinkConfiguration, RADIO_FRAME_SIZE, ReceiveStatus, Role, RoverLink};
    use embassy_futures::join::join;
    use embassy_futures::select::{Either, select};
    use futures::executor::block_on;

    const BASE: Address64 = Address64(0x0013_A200_4000_00B0);
    const ROVER_A: Address64 = Address64(0x0013_A200_4000_00A1);
    const ROVER_B: Address64 = Address64(0x0013_A200_4000_00A2);
    const TICK: Duration = Duration::from_millis(1);
    const WAIT: Duration = Duration::from_millis(200);

    fn configuration(ack_mode: AckMode) -> LinkConfiguration {
        LinkConfiguration { ack_mode, ack_timeout: WAIT }
    }

    /// Rover A takes orders from the base and talks to rover B as its slave
    fn rover_and_base(air: &mut SimulatedAir, ack_mode: AckMode) -> (RoverLink<SimulatedRadio>, RoverLink<SimulatedRadio>) {
        let rover = RoverLink::setup(air.attach(ROVER_A), configuration(ack_mode), BASE, ROVER_B);
        let base = RoverLink::setup(air.attach(BASE), configuration(ack_mode), ROVER_A, ROVER_B);
        (rover, base)
    }

    async fn with_air<F: core::future::Future>(air: &mut SimulatedAir, work: F) -> F::Output {
        match select(work, air.run(TICK)).await {
            Either::First(output) => output,
            Either::Second(()) => panic!("simulated air stopped"),
        }
    }

    #[test]
    fn transport_ack_round_trip() {
        let mut air = SimulatedAir::new(7, 0, 40);
        let (mut rover, mut base) = rover_and_base(&mut air, AckMode::Transport);

        rover.encode_for(Role::Master, Command::IrSensor, 120, -120).unwrap();
        let status = block_on(with_air(&mut air, rover.send(Role::Master, true)));
        assert_eq!(status, AckStatus::Success);
        assert!(rover.pending_payload(Role::Master).is_empty());

        assert_eq!(block_on(base.poll(WAIT, true)), ReceiveStatus::SixtyFour);
        assert!(!base.unwrap_last_batch());
        let record = base.decode_next().unwrap();
        assert_eq!(record.command, Command::IrSensor);
        assert_eq!((record.left, record.right), (120, -120));
        assert_eq!(base.worst_rssi(), 40);
        assert_eq!(base.statistics().received_from_master(), 1);
    }

    #[test]
    fn application_ack_round_trip() {
        let mut air = SimulatedAir::new(11, 0, 55).with_rssi_jitter(5);
        let (mut rover, mut base) = rover_and_base(&mut air, AckMode::Application);

        base.encode_for(Role::Master, Command::EmergencyStop, 0, 0).unwrap();
        let (status, received) = block_on(with_air(&mut air, join(base.send(Role::Master, true), rover.poll(WAIT, true))));
        assert_eq!(received, ReceiveStatus::SixtyFour);
        assert_eq!(status, AckStatus::Success);
        assert_eq!(base.statistics().acks_from_master(), 1);
        assert!((55..=60).contains(&base.worst_rssi()));

        assert!(rover.unwrap_last_batch());
        assert_eq!(rover.decode_next().map(|r| r.command), Some(Command::EmergencyStop));
        assert_eq!(rover.currently_queued(), 0);
    }

    #[test]
    fn lost_frame_keeps_payload_for_resend() {
        let mut air = SimulatedAir::new(3, 100, 40);
        let (mut rover, _base) = rover_and_base(&mut air, AckMode::Transport);

        rover.encode_for(Role::Master, Command::Forward, 10, 10).unwrap();
        let status = block_on(with_air(&mut air, rover.send(Role::Master, true)));
        assert_eq!(status, AckStatus::Vendor(0x01));
        assert_eq!(rover.pending_payload(Role::Master).len(), 7);
    }

    #[test]
    fn unknown_destination_is_reported() {
        let mut air = SimulatedAir::new(3, 0, 40);
        // Rover B is trusted but never attached
        let (mut rover, _base) = rover_and_base(&mut air, AckMode::Transport);

        rover.encode_for(Role::Slave, Command::Forward, 10, 10).unwrap();
        let status = block_on(with_air(&mut air, rover.send(Role::Slave, true)));
        assert_eq!(status, AckStatus::Vendor(0x24));
    }

    #[test]
    fn noise_from_stranger_is_untrusted() {
        let mut air = SimulatedAir::new(5, 0, 40);
        let (_rover, mut base) = rover_and_base(&mut air, AckMode::Transport);

        let stranger = FrameSource::Long(Address64(0xDEAD_BEEF));
        let packet = RoverPacket::encode(Command::EmergencyStop, 0, 0, 99);
        assert!(air.inject_noise(BASE, stranger, packet.as_bytes()));
        assert_eq!(block_on(base.poll(WAIT, true)), ReceiveStatus::Untrusted);
        assert_eq!(base.currently_queued(), 0);

        assert!(air.inject_noise(BASE, FrameSource::Short(0x1234), packet.as_bytes()));
        assert_eq!(block_on(base.poll(WAIT, true)), ReceiveStatus::Sixteen);

        assert!(!air.inject_noise(ROVER_B, stranger, packet.as_bytes()));
    }

    #[test]
    fn sends_without_status_get_no_report() {
        let mut air = SimulatedAir::new(1, 0, 40);
        let mut sender = air.attach(ROVER_A);
        let _receiver = air.attach(ROVER_B);

        block_on(sender.send_frame(ROVER_B, &[1, 2, 3, 4, 5, 6, 7], false)).unwrap();
        assert_eq!(air.deliver_pending(), 1);
        let waited = block_on(select(sender.delivery_status(), Timer::after(Duration::from_millis(10))));
        assert!(matches!(waited, Either::Second(())));
    }

    #[test]
    fn frame_during_status_wait_is_unexpected() {
        let mut air = SimulatedAir::new(1, 0, 40);
        let mut radio = air.attach(ROVER_A);
        assert!(air.inject_noise(ROVER_A, FrameSource::Long(ROVER_B), &[9; 7]));
        assert_eq!(block_on(radio.delivery_status()), Err(TransportError::UnexpectedFrame));
    }

    #[test]
    fn radio_debug_shows_address_only() {
        let mut air = SimulatedAir::new(1, 0, 40);
        let radio = air.attach(ROVER_A);
        let printed = format!("{:?}", radio);
        assert!(printed.starts_with("SimulatedRadio"));
        assert!(printed.contains("address"));
        assert!(!printed.contains("queue"));
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut air = SimulatedAir::new(1, 0, 40);
        let mut radio = air.attach(ROVER_A);
        let payload = [1u8; RADIO_FRAME_SIZE + 1];
        assert_eq!(block_on(radio.send_frame(ROVER_B, &payload, true)), Err(TransportError::FrameTooLong));
        assert_eq!(air.deliver_pending(), 0);
    }
}
