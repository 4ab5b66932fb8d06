use tokio::sync::mpsc;

use crate::{error::Error, target::TargetType};

use super::{device::ChildDevice, slot::TargetId, ConnectionId};

/// Bus commands define all the different ways to interact with [super::Bus]
/// over a channel. These commands are processed in an asyncronous task and
/// dispatched as they come in.
#[derive(Debug, Clone)]
pub enum BusCommand {
    GetVersion(mpsc::Sender<String>),
    Connect(mpsc::Sender<ConnectionId>),
    PlugIn {
        owner: ConnectionId,
        kind: TargetType,
        vendor_id: u16,
        product_id: u16,
        sender: mpsc::Sender<Result<ChildDevice, Error>>,
    },
    Unplug {
        owner: ConnectionId,
        id: TargetId,
        sender: mpsc::Sender<Result<(), Error>>,
    },
    UnplugOwner {
        owner: ConnectionId,
        sender: Option<mpsc::Sender<usize>>,
    },
    GetDevice {
        index: u32,
        sender: mpsc::Sender<Option<ChildDevice>>,
    },
    ListDevices(mpsc::Sender<Vec<ChildDevice>>),
    Stop,
}
