use std::{
    error::Error,
    path::PathBuf,
    time::{Duration, Instant},
};

use clap::Args;
use tokio::sync::broadcast;

use crate::{
    bus::{device::ChildDevice, Bus, BusEvent},
    client::{target::Target, Client},
    drivers::{
        ds4::hid_report::{Direction, Ds4Button, Ds4Report},
        xgip::{
            descriptor::XGIP_CONFIGURATION_SIZE,
            hid_report::{XgipButton, XgipReport},
        },
        xusb::hid_report::{XusbButton, XusbReport},
    },
    error,
    target::{Report, TargetType},
};

/// Interval between two demonstration reports
const REPORT_INTERVAL: Duration = Duration::from_millis(16);
/// Number of inbound transfers between two simulated host rumble commands
const RUMBLE_EVERY: u32 = 120;

#[derive(Args, Debug, Clone, Default)]
pub struct RunOptions {
    /// Path to a bus configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Comma separated target classes to plug in (x360, ds4, xgip). Plugs
    /// in one of every class if omitted.
    #[arg(long, value_delimiter = ',')]
    pub targets: Vec<TargetType>,
    /// Seconds to run before shutting down. Runs until interrupted if
    /// omitted.
    #[arg(long)]
    pub duration: Option<u64>,
}

pub async fn handle_run(options: RunOptions) -> Result<(), Box<dyn Error>> {
    let config = super::load_config(options.config)?;
    let mut bus = Bus::new(config);
    let depth = bus.config().notification_depth;
    let bus_client = bus.client();
    let events = bus.subscribe();
    let bus_task = tokio::spawn(async move {
        if let Err(e) = bus.run().await {
            log::error!("Bus stopped with error: {e}");
        }
    });

    // Stand-in for the class driver stack reading from every child
    let class_task = tokio::spawn(run_class_stack(events));

    let client = Client::new(bus_client.clone()).with_notification_depth(depth);
    client.connect().await?;

    let kinds = if options.targets.is_empty() {
        TargetType::supported_types()
    } else {
        options.targets
    };
    let mut targets = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let target = Target::new(kind);
        client.add_target(&target).await?;
        log::info!("Added {} at slot {}", kind.name(), target.index()?);
        client.register_notification(&target, |target, notification| {
            log::info!("Host event for {} target: {notification:?}", target.target_type());
        })?;
        targets.push(target);
    }

    let deadline = options
        .duration
        .map(|seconds| Instant::now() + Duration::from_secs(seconds));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(REPORT_INTERVAL);
    let mut frame: u32 = 0;
    loop {
        tokio::select! {
            _ = ticker.tick() => (),
            _ = &mut ctrl_c => {
                log::info!("Shutting down");
                break;
            }
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            break;
        }

        frame = frame.wrapping_add(1);
        for target in targets.iter() {
            match target.update(demo_report(target.target_type(), frame)) {
                Ok(_) => (),
                // Still enumerating
                Err(error::Error::TargetNotPluggedIn) => (),
                Err(e) => log::warn!("Failed to update {} target: {e}", target.target_type()),
            }
        }
    }

    client.disconnect().await?;
    for target in targets {
        target.free()?;
    }
    bus_client.stop().await?;
    bus_task.await?;
    class_task.abort();

    Ok(())
}

/// Build a report that slowly sweeps the left stick and taps the south face
/// button.
fn demo_report(kind: TargetType, frame: u32) -> Report {
    let sweep = (frame % 256) as u8;
    let axis = (sweep as i16 - 128) * 256;
    let pressed = frame % 60 < 10;
    match kind {
        TargetType::Xbox360 => {
            let mut report = XusbReport::new();
            report.set_button(XusbButton::A, pressed);
            report.set_left_stick(axis, 0);
            report.into()
        }
        TargetType::DualShock4 => {
            let mut report = Ds4Report::new();
            report.set_button(Ds4Button::Cross, pressed);
            report.set_dpad(Direction::None);
            report.thumb_lx = sweep;
            report.into()
        }
        TargetType::XboxOne => {
            let mut report = XgipReport::new();
            report.set_button(XgipButton::A, pressed);
            report.set_left_stick(axis, 0);
            report.into()
        }
    }
}

/// Build a host rumble packet for the given device class
fn demo_rumble(kind: TargetType, level: u8) -> Vec<u8> {
    match kind {
        TargetType::Xbox360 => vec![0x00, 0x08, 0x00, level, level / 2, 0x00, 0x00, 0x00],
        TargetType::DualShock4 => vec![
            0x05, 0x07, 0x00, 0x00, level / 2, level, 0x00, 0x00, 0x40,
        ],
        TargetType::XboxOne => vec![
            0x09, 0x00, 0x01, 0x09, 0x00, 0x0F, 0x00, 0x00, level, level / 2,
        ],
    }
}

/// Read inbound transfers from every child device as it arrives
async fn run_class_stack(mut events: broadcast::Receiver<BusEvent>) {
    loop {
        match events.recv().await {
            Ok(BusEvent::DeviceArrived { index, device }) => {
                log::debug!("Class stack found device at slot {index}");
                tokio::spawn(run_child(device));
            }
            Ok(BusEvent::DeviceRemoved { id }) => {
                log::debug!("Class stack lost device {id}");
            }
            Err(broadcast::error::RecvError::Lagged(count)) => {
                log::warn!("Class stack missed {count} bus event(s)");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn run_child(device: ChildDevice) {
    let kind = device.target_type();
    match device.device_descriptor() {
        Ok(descriptor) => log::debug!("Device descriptor of {kind}: {descriptor:02x?}"),
        Err(e) => log::warn!("Failed to read device descriptor of {kind}: {e}"),
    }
    let mut config = [0u8; 0x100];
    match device.read_configuration_descriptor(&mut config) {
        Ok(size) => log::debug!("Configuration descriptor of {kind}: {size} byte(s)"),
        Err(e) => log::warn!("Failed to read configuration descriptor of {kind}: {e}"),
    }
    if kind.requires_init_sequence() {
        match device.select_configuration(XGIP_CONFIGURATION_SIZE) {
            Ok(interfaces) => log::debug!("Selected {} interface(s) of {kind}", interfaces.len()),
            Err(e) => log::warn!("Failed to select configuration of {kind}: {e}"),
        }
        for guid in device.interface_guids() {
            log::trace!("Device {} exposes interface {guid}", device.id());
        }
    }

    let mut transfers: u32 = 0;
    loop {
        let packet = match device.submit_interrupt_in().await {
            Ok(packet) => packet,
            Err(e) => {
                log::debug!("Stopped reading from device {}: {e}", device.id());
                break;
            }
        };
        log::trace!("Device {} sent {packet:02x?}", device.id());

        transfers = transfers.wrapping_add(1);
        if device.is_sys_init_ready() && transfers % RUMBLE_EVERY == 0 {
            let level = ((transfers / RUMBLE_EVERY) % 4 * 64) as u8;
            device.submit_interrupt_out(&demo_rumble(kind, level));
        }
    }
}
