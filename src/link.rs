//! # Rover Link - Trust Gate and Acknowledgments
//!
//! [`RoverLink`] owns every piece of link state: both outbound payloads, the inbound
//! queue, the statistics register, the last trusted batch and the transport.
//!
//! ## Receive Path
//!
//! ```text
//! poll(timeout) -> frame in time? --no--> Error
//!                        |yes
//!               64-bit addressing? --no--> Sixteen
//!                        |yes
//!        sender is master or slave? --no--> Untrusted (dropped)
//!                        |yes
//!        [application acks + auto_ack: ack the sender]
//!                        -> SixtyFour, frame kept for unwrap_last_batch()
//! ```
//!
//! ## Acknowledgments
//!
//! - [`AckMode::Transport`]: the radio's delivery report decides, within the ack timeout
//! - [`AckMode::Application`]: the next inbound frame must be a trusted acknowledgment
//!   packet; anything else (including real data) counts as a failed ack and is dropped
//!
//! A payload is cleared after a send when no ack was requested or the ack succeeded.
//! On a failed ack the payload is kept so the caller can resend it unchanged.

use embassy_futures::select::{Either, select};
use embassy_time::{Duration, Instant, Timer};
use log::{Level, log};

use crate::inbound_queue::InboundQueue;
use crate::messages::{Address64, Command, DecodedRecord, ReceivedFrame, RoverPacket};
use crate::payload::PayloadBuffer;
use crate::radio_devices::{DeliveryStatus, RadioTransport, vendor_status_description};
use crate::statistics::{LinkStatistics, REPORT_SEQUENCE, counter_field};
use crate::{AckMode, AckStatus, EncodeError, LinkConfiguration, MASTER_PAYLOAD_SIZE, ReceiveStatus, Role, SLAVE_PAYLOAD_SIZE};

/// Milliseconds since boot as carried in the packet timestamp
///
/// Wraps after ~49 days like the rover firmware clock. A reading of 0 is sent as 1, a
/// zero timestamp would read as end-of-batch on the receiving side.
fn current_timestamp() -> u32 {
    (Instant::now().as_millis() as u32).max(1)
}

pub struct RoverLink<T: RadioTransport> {
    transport: T,
    configuration: LinkConfiguration,
    master_address: Address64,
    slave_address: Address64,
    master_payload: PayloadBuffer<MASTER_PAYLOAD_SIZE>,
    slave_payload: PayloadBuffer<SLAVE_PAYLOAD_SIZE>,
    inbound_queue: InboundQueue,
    statistics: LinkStatistics,
    last_batch: Option<ReceivedFrame>,
}

impl<T: RadioTransport> RoverLink<T> {
    /// Creates the link with its two trusted peers
    ///
    /// The addresses are fixed for the lifetime of the link. They decide which inbound
    /// frames are accepted and where [`RoverLink::send`] transmits each role's payload.
    pub fn setup(transport: T, configuration: LinkConfiguration, master_address: Address64, slave_address: Address64) -> Self {
        log!(
            Level::Info,
            "Rover link up, master {:08X}:{:08X}, slave {:08X}:{:08X}, application acks: {}",
            master_address.msb(),
            master_address.lsb(),
            slave_address.msb(),
            slave_address.lsb(),
            configuration.ack_mode == AckMode::Application
        );
        RoverLink {
            transport,
            configuration,
            master_address,
            slave_address,
            master_payload: PayloadBuffer::new(),
            slave_payload: PayloadBuffer::new(),
            inbound_queue: InboundQueue::new(),
            statistics: LinkStatistics::new(),
            last_batch: None,
        }
    }

    pub fn configuration(&self) -> &LinkConfiguration {
        &self.configuration
    }

    pub fn address_of(&self, role: Role) -> Address64 {
        match role {
            Role::Master => self.master_address,
            Role::Slave => self.slave_address,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Encodes one packet into the payload for `role`, stamped with the current time
    ///
    /// # Returns
    /// * `Ok(slots)` - how many more packets fit
    /// * `Err(EncodeError::PayloadFull)` - nothing was written; send or clear first
    pub fn encode_for(&mut self, role: Role, command: Command, left: i16, right: i16) -> Result<usize, EncodeError> {
        let packet = RoverPacket::encode(command, left, right, current_timestamp());
        let result = match role {
            Role::Master => self.master_payload.try_append(&packet),
            Role::Slave => self.slave_payload.try_append(&packet),
        };

        match result {
            Ok(slots) => {
                self.statistics.record_encoded();
                log!(
                    Level::Trace,
                    "Encoded cmd {:#x} ({}, {}) for {}, {} slot(s) left",
                    command.nibble(),
                    left,
                    right,
                    role.name(),
                    slots
                );
            }
            Err(_) => {
                self.statistics.record_failed_encode();
                log!(Level::Warn, "Payload for {} is full, dropping cmd {:#x}", role.name(), command.nibble());
            }
        }
        result
    }

    pub fn slots_remaining(&self, role: Role) -> usize {
        match role {
            Role::Master => self.master_payload.slots_remaining(),
            Role::Slave => self.slave_payload.slots_remaining(),
        }
    }

    pub fn max_slots(&self, role: Role) -> usize {
        match role {
            Role::Master => self.master_payload.max_slots(),
            Role::Slave => self.slave_payload.max_slots(),
        }
    }

    /// Packets encoded for `role` and not yet cleared
    pub fn pending_payload(&self, role: Role) -> &[u8] {
        match role {
            Role::Master => self.master_payload.written(),
            Role::Slave => self.slave_payload.written(),
        }
    }

    pub fn clear_payload(&mut self, role: Role) {
        match role {
            Role::Master => self.master_payload.clear(),
            Role::Slave => self.slave_payload.clear(),
        }
    }

    /// Transmits the payload for `role`
    ///
    /// The whole buffer goes on air, zero padded after the last packet.
    ///
    /// # Returns
    /// * `AckStatus::Success` - acknowledged; the payload has been cleared
    /// * `AckStatus::Vendor(code)` - the radio reported a delivery error; payload kept
    /// * `AckStatus::Failure` - no ack in time or transport error (payload kept), or
    ///   `check_ack` was false (payload cleared)
    pub async fn send(&mut self, role: Role, check_ack: bool) -> AckStatus {
        self.statistics.record_sent(role);

        let destination = self.address_of(role);
        let want_status = check_ack && self.configuration.ack_mode == AckMode::Transport;
        let sent = match role {
            Role::Master => self.transport.send_frame(destination, self.master_payload.frame(), want_status).await,
            Role::Slave => self.transport.send_frame(destination, self.slave_payload.frame(), want_status).await,
        };

        let status = match sent {
            Err(error) => {
                log!(Level::Warn, "Sending to {} failed: {:?}", role.name(), error);
                AckStatus::Failure
            }
            Ok(()) if !check_ack => AckStatus::Failure,
            Ok(()) => {
                let status = match self.configuration.ack_mode {
                    AckMode::Transport => self.wait_for_delivery_status().await,
                    AckMode::Application => self.wait_for_application_ack().await,
                };
                if status == AckStatus::Success {
                    self.statistics.record_ack(role);
                }
                log!(Level::Debug, "Send to {} acknowledged with status {}", role.name(), status.code());
                status
            }
        };

        if !check_ack || status == AckStatus::Success {
            self.clear_payload(role);
        }
        status
    }

    async fn wait_for_delivery_status(&mut self) -> AckStatus {
        match select(self.transport.delivery_status(), Timer::after(self.configuration.ack_timeout)).await {
            Either::First(Ok(DeliveryStatus::Delivered)) | Either::First(Ok(DeliveryStatus::Failed(0))) => AckStatus::Success,
            Either::First(Ok(DeliveryStatus::Failed(code))) => {
                log!(Level::Warn, "Radio reported delivery status {:#04x}: {}", code, vendor_status_description(code));
                AckStatus::Vendor(code)
            }
            Either::First(Err(error)) => {
                log!(Level::Warn, "No delivery status: {:?}", error);
                AckStatus::Failure
            }
            Either::Second(()) => {
                log!(Level::Warn, "Delivery status timed out");
                AckStatus::Failure
            }
        }
    }

    async fn wait_for_application_ack(&mut self) -> AckStatus {
        let Some(received) = self.receive_within(self.configuration.ack_timeout).await else {
            log!(Level::Warn, "Acknowledgment timed out");
            return AckStatus::Failure;
        };
        if self.admit(&received).is_err() {
            return AckStatus::Failure;
        }
        self.statistics.set_worst_rssi(received.rssi);

        match RoverPacket::from_slice(received.payload()) {
            Some(packet) if packet.is_acknowledgment() => AckStatus::Success,
            _ => {
                log!(Level::Warn, "Expected an acknowledgment, dropping {} byte frame", received.payload().len());
                AckStatus::Failure
            }
        }
    }

    async fn receive_within(&mut self, timeout: Duration) -> Option<ReceivedFrame> {
        match select(self.transport.receive_frame(), Timer::after(timeout)).await {
            Either::First(Ok(received)) => Some(received),
            Either::First(Err(error)) => {
                log!(Level::Warn, "Receive failed: {:?}", error);
                None
            }
            Either::Second(()) => None,
        }
    }

    /// Trust gate: maps the sender to a role and counts the frame, or rejects it
    fn admit(&mut self, received: &ReceivedFrame) -> Result<Role, ReceiveStatus> {
        let Some(address) = received.long_source() else {
            log!(Level::Debug, "16-bit frame ignored");
            return Err(ReceiveStatus::Sixteen);
        };

        let role = if address == self.master_address {
            Role::Master
        } else if address == self.slave_address {
            Role::Slave
        } else {
            log!(Level::Warn, "Untrusted frame from {:08X}:{:08X} discarded", address.msb(), address.lsb());
            return Err(ReceiveStatus::Untrusted);
        };

        self.statistics.record_received(role);
        Ok(role)
    }

    /// Waits up to `timeout` for one frame and runs it through the trust gate
    ///
    /// A trusted 64-bit frame is kept for [`RoverLink::unwrap_last_batch`]. With
    /// application acks and `auto_ack`, an acknowledgment goes back to the sender first.
    pub async fn poll(&mut self, timeout: Duration, auto_ack: bool) -> ReceiveStatus {
        let Some(received) = self.receive_within(timeout).await else {
            return ReceiveStatus::Error;
        };
        let role = match self.admit(&received) {
            Ok(role) => role,
            Err(status) => return status,
        };

        if auto_ack && self.configuration.ack_mode == AckMode::Application {
            let destination = self.address_of(role);
            if let Err(error) = self.transport.send_frame(destination, RoverPacket::ACKNOWLEDGMENT.as_bytes(), false).await {
                log!(Level::Warn, "Acknowledging {} failed: {:?}", role.name(), error);
            }
        }

        log!(Level::Debug, "{} byte frame from {}", received.payload().len(), role.name());
        self.last_batch = Some(received);
        ReceiveStatus::SixtyFour
    }

    /// Queues the packets of the last trusted frame
    ///
    /// Each frame is unwrapped at most once; without a new [`ReceiveStatus::SixtyFour`]
    /// poll this returns false and queues nothing.
    ///
    /// # Returns
    /// true if the batch contained an emergency stop
    pub fn unwrap_last_batch(&mut self) -> bool {
        match self.last_batch.take() {
            Some(received) => self.unwrap_frame(&received),
            None => false,
        }
    }

    fn unwrap_frame(&mut self, received: &ReceivedFrame) -> bool {
        self.statistics.set_worst_rssi(received.rssi);
        let outcome = self.inbound_queue.unwrap_batch(received.payload(), self.configuration.ack_mode);
        self.statistics.record_queued(outcome.queued);
        outcome.high_priority
    }

    /// Dequeues and decodes the oldest packet
    pub fn decode_next(&mut self) -> Option<DecodedRecord> {
        let packet = self.inbound_queue.dequeue()?;
        self.statistics.record_decoded();
        let record = packet.decode();
        if record.command.is_statistics() {
            log!(
                Level::Debug,
                "Statistics cmd {:#x} from peer: {}, {}",
                record.command.nibble(),
                record.left,
                record.right
            );
        }
        Some(record)
    }

    pub fn clear_queue(&mut self) {
        self.inbound_queue.drain();
    }

    pub fn currently_queued(&self) -> usize {
        self.inbound_queue.len()
    }

    pub fn statistics(&self) -> &LinkStatistics {
        &self.statistics
    }

    pub fn worst_rssi(&self) -> u8 {
        self.statistics.worst_rssi()
    }

    pub fn reset_statistics(&mut self) {
        self.statistics.reset();
    }

    /// Sends the statistics register to the master as five packets
    ///
    /// Packets are batched into the master payload, which is sent whenever it runs out
    /// of room and once more after the last packet. Counter values are read at the
    /// moment each packet is encoded.
    ///
    /// # Returns
    /// Sum of the [`AckStatus::code`] of every send performed
    pub async fn report_to_master(&mut self, check_ack: bool) -> i32 {
        let mut total = 0;
        for (index, command) in REPORT_SEQUENCE.iter().copied().enumerate() {
            let Some((left, right)) = self.statistics.report_pair(command) else {
                continue;
            };
            let encoded = self.encode_for(Role::Master, command, counter_field(left), counter_field(right));
            let last = index == REPORT_SEQUENCE.len() - 1;
            let payload_full = !matches!(encoded, Ok(slots) if slots > 0);
            if last || payload_full {
                total += self.send(Role::Master, check_ack).await.code();
            }
        }
        log!(Level::Info, "Statistics reported to master, ack sum {}", total);
        total
    }
}
