//! The bus service owns the slot table and the lifecycle of every child
//! device. Clients talk to it over a command channel, while the data plane
//! of each child (reports, transfers and notifications) bypasses the service
//! entirely and only takes the child's own lock.
pub mod client;
pub mod command;
pub mod device;
pub mod notification;
pub mod sequencer;
pub mod slot;
pub mod transfer;

use std::{error::Error, fmt::Display};

use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};

use crate::{config::BusConfig, constants::BUS_VERSION, error, target::TargetType};

use self::{
    client::BusClient,
    command::BusCommand,
    device::ChildDevice,
    slot::{SlotTable, TargetId},
};

/// Capacity of the bus event channel
const EVENT_BUFFER_SIZE: usize = 256;

/// Identifier of a client connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "connection-{}", self.0)
    }
}

/// Events published to the device-class side of the bus
#[derive(Debug, Clone)]
pub enum BusEvent {
    /// A child device was plugged into a slot
    DeviceArrived { index: u32, device: ChildDevice },
    /// A child device was removed from its slot
    DeviceRemoved { id: TargetId },
}

/// An occupied slot on the bus
#[derive(Debug)]
struct BusSlot {
    device: ChildDevice,
    sequencer: Option<JoinHandle<()>>,
}

/// Virtual bus that child devices are plugged into
#[derive(Debug)]
pub struct Bus {
    config: BusConfig,
    rx: mpsc::Receiver<BusCommand>,
    tx: mpsc::Sender<BusCommand>,
    events: broadcast::Sender<BusEvent>,
    slots: SlotTable<BusSlot>,
    next_connection: u64,
}

impl Bus {
    /// Create a new bus with the given configuration
    pub fn new(config: BusConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.command_buffer_size);
        let (events, _) = broadcast::channel(EVENT_BUFFER_SIZE);
        let slots = SlotTable::new(config.max_targets);
        Self {
            config,
            rx,
            tx,
            events,
            slots,
            next_connection: 0,
        }
    }

    /// Returns a client to communicate with the bus
    pub fn client(&self) -> BusClient {
        self.tx.clone().into()
    }

    /// Subscribe to device arrival and removal events
    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.events.subscribe()
    }

    /// Returns the configuration of the bus
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Run the bus service, processing commands until the bus is stopped
    pub async fn run(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        log::debug!(
            "Starting bus '{}' v{BUS_VERSION} with {} slot(s)",
            self.config.name,
            self.slots.capacity()
        );

        while let Some(cmd) = self.rx.recv().await {
            log::trace!("Received command: {cmd:?}");
            match cmd {
                BusCommand::GetVersion(sender) => {
                    if let Err(e) = sender.send(BUS_VERSION.to_string()).await {
                        log::error!("Failed to send bus version: {e:?}");
                    }
                }
                BusCommand::Connect(sender) => {
                    self.next_connection += 1;
                    let id = ConnectionId(self.next_connection);
                    log::debug!("Opened {id}");
                    if let Err(e) = sender.send(id).await {
                        log::error!("Failed to send connection id: {e:?}");
                    }
                }
                BusCommand::PlugIn {
                    owner,
                    kind,
                    vendor_id,
                    product_id,
                    sender,
                } => {
                    let result = self.plug_in(owner, kind, vendor_id, product_id);
                    if let Err(e) = sender.send(result).await {
                        log::error!("Failed to send plug in result: {e:?}");
                        // Nobody is waiting for the device, take it back out
                        if let Ok(device) = e.0 {
                            self.remove_slot(device.id());
                        }
                    }
                }
                BusCommand::Unplug { owner, id, sender } => {
                    let result = self.unplug(owner, id);
                    if let Err(e) = sender.send(result).await {
                        log::error!("Failed to send unplug result: {e:?}");
                    }
                }
                BusCommand::UnplugOwner { owner, sender } => {
                    let count = self.unplug_owner(owner);
                    if let Some(sender) = sender {
                        if let Err(e) = sender.send(count).await {
                            log::error!("Failed to send unplug count: {e:?}");
                        }
                    }
                }
                BusCommand::GetDevice { index, sender } => {
                    let device = self
                        .slots
                        .get_by_index(index)
                        .map(|(_, slot)| slot.device.clone());
                    if let Err(e) = sender.send(device).await {
                        log::error!("Failed to send device: {e:?}");
                    }
                }
                BusCommand::ListDevices(sender) => {
                    let devices = self
                        .slots
                        .iter()
                        .map(|(_, slot)| slot.device.clone())
                        .collect();
                    if let Err(e) = sender.send(devices).await {
                        log::error!("Failed to send device list: {e:?}");
                    }
                }
                BusCommand::Stop => {
                    log::debug!("Stopping bus");
                    break;
                }
            }
        }

        // Refuse any further commands and unplug everything
        self.rx.close();
        let ids = self.slots.ids_where(|_| true);
        for id in ids {
            self.remove_slot(id);
        }
        log::debug!("Bus stopped");

        Ok(())
    }

    /// Plug a new child device into the lowest free slot
    fn plug_in(
        &mut self,
        owner: ConnectionId,
        kind: TargetType,
        vendor_id: u16,
        product_id: u16,
    ) -> Result<ChildDevice, error::Error> {
        let period = self.config.sys_init_period();
        let id = self.slots.insert_with(|id| {
            let device = ChildDevice::new(id, kind, vendor_id, product_id, owner);
            let sequencer = device.spawn_init_sequencer(period);
            BusSlot { device, sequencer }
        })?;
        let Some(slot) = self.slots.get(id) else {
            return Err(error::Error::NoFreeSlot);
        };
        let device = slot.device.clone();
        log::info!(
            "Plugged {} ({:04x}:{:04x}) into slot {} for {owner}",
            kind.name(),
            vendor_id,
            product_id,
            id.index
        );

        let event = BusEvent::DeviceArrived {
            index: id.index,
            device: device.clone(),
        };
        if let Err(e) = self.events.send(event) {
            log::trace!("No listeners for device arrival: {e:?}");
        }

        Ok(device)
    }

    /// Unplug the child device with the given id. Only the owning connection
    /// may remove a device.
    fn unplug(&mut self, owner: ConnectionId, id: TargetId) -> Result<(), error::Error> {
        let Some(slot) = self.slots.get(id) else {
            log::debug!("Refusing to unplug stale device {id}");
            return Err(error::Error::RemovalFailed);
        };
        if slot.device.owner() != owner {
            log::debug!("Refusing to unplug device {id} owned by {}", slot.device.owner());
            return Err(error::Error::RemovalFailed);
        }
        self.remove_slot(id);
        Ok(())
    }

    /// Unplug every child device owned by the given connection
    fn unplug_owner(&mut self, owner: ConnectionId) -> usize {
        let ids = self.slots.ids_where(|slot| slot.device.owner() == owner);
        let count = ids.len();
        for id in ids {
            self.remove_slot(id);
        }
        if count > 0 {
            log::debug!("Unplugged {count} device(s) owned by {owner}");
        }
        count
    }

    /// Cancel all queues of the device in the given slot and release it
    fn remove_slot(&mut self, id: TargetId) {
        let Some(slot) = self.slots.get(id) else {
            return;
        };
        if let Some(sequencer) = slot.sequencer.as_ref() {
            sequencer.abort();
        }
        slot.device.unplug();

        // The slot is only released once every queue is drained
        if self.slots.remove(id).is_none() {
            return;
        }
        log::info!("Unplugged device from slot {}", id.index);
        if let Err(e) = self.events.send(BusEvent::DeviceRemoved { id }) {
            log::trace!("No listeners for device removal: {e:?}");
        }
    }
}
