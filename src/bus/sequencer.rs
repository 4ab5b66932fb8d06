//! Timer driven replay of the init packet sequence while a device enumerates.
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};

use crate::drivers::xgip::init::InitSequence;

use super::device::{ChildDevice, InitStep};

/// Pull packets from the given sequence on every tick until it is exhausted
/// or the device stops enumerating.
pub async fn run(device: ChildDevice, mut sequence: InitSequence, period: Duration) {
    log::debug!(
        "Starting init sequencer for device {} with {} packet(s) every {period:?}",
        device.id(),
        sequence.total()
    );
    let mut timer = interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut staged = None;

    loop {
        timer.tick().await;
        match device.feed_init_packet(&mut sequence, &mut staged) {
            InitStep::Waiting | InitStep::Fed => continue,
            InitStep::Finished => break,
            InitStep::Aborted => {
                log::debug!(
                    "Device {} stopped enumerating with {} init packet(s) left",
                    device.id(),
                    sequence.remaining()
                );
                break;
            }
        }
    }
    log::debug!("Init sequencer for device {} stopped", device.id());
}
