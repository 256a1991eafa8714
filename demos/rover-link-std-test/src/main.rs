use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use env_logger::Builder;
use log::LevelFilter;
use log::log;
use rover_link::radio_devices::simulator::{SimulatedAir, SimulatedRadio};
use rover_link::{Address64, AckMode, AckStatus, Command, LinkConfiguration, ReceiveStatus, Role, RoverLink};

const BASE_STATION: Address64 = Address64::from_parts(0x0013_A200, 0x4000_00B0);
const LEAD_ROVER: Address64 = Address64::from_parts(0x0013_A200, 0x4000_00A1);
const FOLLOW_ROVER: Address64 = Address64::from_parts(0x0013_A200, 0x4000_00A2);

#[embassy_executor::task]
async fn air_task(mut air: SimulatedAir) {
    air.run(Duration::from_millis(2)).await;
}

/// Sends a drive pattern to the lead rover, stats request every few rounds
#[embassy_executor::task]
async fn base_station_task(mut link: RoverLink<SimulatedRadio>) -> ! {
    let mut round: i16 = 0;
    loop {
        let command = if round % 8 == 7 { Command::EmergencyStop } else { Command::Forward };
        let speed = (round % 8) * 60;
        if let Err(error) = link.encode_for(Role::Master, command, speed, speed) {
            log!(log::Level::Error, "Encode failed: {:?}", error);
        }

        match link.send(Role::Master, true).await {
            AckStatus::Success => log!(log::Level::Info, "Base: round {} acknowledged", round),
            other => {
                log!(log::Level::Warn, "Base: round {} not acknowledged ({}), dropping it", round, other.code());
                link.clear_payload(Role::Master);
            }
        }

        if link.poll(Duration::from_millis(300), true).await == ReceiveStatus::SixtyFour {
            link.unwrap_last_batch();
            while let Some(record) = link.decode_next() {
                log!(
                    log::Level::Info,
                    "Base: stats {:?} left={} right={}",
                    record.command,
                    record.left,
                    record.right
                );
            }
        }

        round = round.wrapping_add(1);
        Timer::after(Duration::from_millis(500)).await;
    }
}

/// Executes orders from the base, reports statistics every fifth batch
#[embassy_executor::task]
async fn rover_task(mut link: RoverLink<SimulatedRadio>) -> ! {
    let mut batches: u32 = 0;
    loop {
        match link.poll(Duration::from_secs(2), true).await {
            ReceiveStatus::SixtyFour => {}
            ReceiveStatus::Error => {
                log!(log::Level::Debug, "Rover: nothing heard");
                continue;
            }
            other => {
                log!(log::Level::Warn, "Rover: ignored frame ({})", other.code());
                continue;
            }
        }

        if link.unwrap_last_batch() {
            log!(log::Level::Warn, "Rover: emergency stop in batch, stopping motors");
            link.clear_queue();
        }
        while let Some(record) = link.decode_next() {
            log!(
                log::Level::Info,
                "Rover: {:?} left={} right={} at {} ms",
                record.command,
                record.left,
                record.right,
                record.timestamp
            );
        }

        batches += 1;
        if batches % 5 == 0 {
            let result = link.report_to_master(true).await;
            log!(log::Level::Info, "Rover: statistics sent, result {}, worst RSSI -{} dBm", result, link.worst_rssi());
        }
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    Builder::new().filter_level(LevelFilter::Debug).init();

    log!(log::Level::Info, "Starting simulated base station and rovers");
    let mut air = SimulatedAir::new(0x5EED, 10, 48).with_rssi_jitter(12);

    let configuration = LinkConfiguration {
        ack_mode: AckMode::Application,
        ..LinkConfiguration::default()
    };
    let base = RoverLink::setup(air.attach(BASE_STATION), configuration, LEAD_ROVER, FOLLOW_ROVER);
    let rover = RoverLink::setup(air.attach(LEAD_ROVER), configuration, BASE_STATION, FOLLOW_ROVER);

    spawner.spawn(air_task(air)).unwrap();
    spawner.spawn(rover_task(rover)).unwrap();
    spawner.spawn(base_station_task(base)).unwrap();
}
