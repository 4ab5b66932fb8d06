//! Controlling-process side of the bus: connections, targets and the
//! notification pump.
pub mod notification;
pub mod target;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use version_compare::{compare, Cmp};

use crate::{
    bus::{client::BusClient, device::ChildDevice, ConnectionId},
    config::DEFAULT_NOTIFICATION_DEPTH,
    constants::MIN_SUPPORTED_BUS_VERSION,
    error::Error,
    target::{Notification, TargetState},
};

use self::{notification::spawn_pump, target::Target};

/// Connection state of a [Client]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unconnected,
    Connected,
}

#[derive(Debug, Default)]
struct ClientState {
    connection: Option<ConnectionId>,
    targets: Vec<Target>,
}

/// A controlling process' session with the bus
#[derive(Debug)]
pub struct Client {
    bus: BusClient,
    min_version: String,
    notification_depth: usize,
    state: Arc<Mutex<ClientState>>,
}

impl Client {
    /// Allocate a new, unconnected client for the given bus
    pub fn new(bus: BusClient) -> Self {
        Self {
            bus,
            min_version: MIN_SUPPORTED_BUS_VERSION.to_string(),
            notification_depth: DEFAULT_NOTIFICATION_DEPTH,
            state: Arc::new(Mutex::new(ClientState::default())),
        }
    }

    /// Set the minimum bus version this client accepts
    pub fn with_min_version(mut self, version: &str) -> Self {
        self.min_version = version.to_string();
        self
    }

    /// Set the number of notification requests kept outstanding per target
    pub fn with_notification_depth(mut self, depth: usize) -> Self {
        self.notification_depth = depth.max(1);
        self
    }

    fn lock(&self) -> MutexGuard<'_, ClientState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        match self.lock().connection {
            Some(_) => ConnectionState::Connected,
            None => ConnectionState::Unconnected,
        }
    }

    /// Id of the current connection
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.lock().connection
    }

    /// Targets currently added through this connection
    pub fn targets(&self) -> Vec<Target> {
        self.lock().targets.clone()
    }

    fn require_connection(&self) -> Result<ConnectionId, Error> {
        self.lock().connection.ok_or(Error::BusNotFound)
    }

    /// Connect to the bus
    pub async fn connect(&self) -> Result<(), Error> {
        if self.lock().connection.is_some() {
            return Err(Error::BusAlreadyConnected);
        }

        let version = self.bus.get_version().await?;
        if compare(version.as_str(), self.min_version.as_str()) == Ok(Cmp::Lt) {
            log::error!(
                "Bus v{version} does not meet the minimum supported version v{}",
                self.min_version
            );
            return Err(Error::BusVersionMismatch);
        }

        let id = self.bus.connect().await?;
        let mut state = self.lock();
        if state.connection.is_some() {
            return Err(Error::BusAlreadyConnected);
        }
        state.connection = Some(id);
        log::debug!("Connected to bus v{version} as {id}");
        Ok(())
    }

    /// Disconnect from the bus. Every target added through this connection
    /// is removed, ignoring individual failures. The client may connect
    /// again afterwards.
    pub async fn disconnect(&self) -> Result<(), Error> {
        let (owner, targets) = {
            let mut state = self.lock();
            let Some(owner) = state.connection.take() else {
                return Ok(());
            };
            (owner, std::mem::take(&mut state.targets))
        };

        for target in targets {
            target.set_removing(true);
            let Ok(device) = target.attached_device() else {
                continue;
            };
            if let Err(e) = self.bus.unplug(owner, device.id()).await {
                log::debug!("Failed to remove device {} on disconnect: {e}", device.id());
            }
            target.detach(&device);
        }

        // Sweep devices whose add raced this disconnect
        if let Err(e) = self.bus.unplug_owner(owner).await {
            log::debug!("Failed to sweep devices of {owner}: {e}");
        }
        log::debug!("Disconnected {owner}");

        Ok(())
    }

    /// Attach a freshly plugged device to its target. The device is taken
    /// back out if the target was freed or the connection went away while
    /// the add was in flight.
    async fn attach(
        bus: &BusClient,
        state: &Arc<Mutex<ClientState>>,
        owner: ConnectionId,
        target: &Target,
        device: ChildDevice,
    ) -> Result<(), Error> {
        let connected = {
            let state = state.lock().unwrap_or_else(PoisonError::into_inner);
            state.connection == Some(owner)
        };
        if !connected {
            target.abort_add();
            if let Err(e) = bus.unplug(owner, device.id()).await {
                log::debug!("Failed to remove orphaned device {}: {e}", device.id());
            }
            return Err(Error::BusNotFound);
        }

        if !target.finish_add(device.clone(), owner) {
            log::debug!("Target was freed while being added, removing device {}", device.id());
            if let Err(e) = bus.unplug(owner, device.id()).await {
                log::debug!("Failed to remove orphaned device {}: {e}", device.id());
            }
            return Err(Error::TargetUninitialized);
        }

        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.targets.iter().any(|t| t.ptr_eq(target)) {
            state.targets.push(target.clone());
        }
        Ok(())
    }

    /// Add the target to the bus. Returns once the target is plugged in;
    /// device classes with an init sequence may still be enumerating.
    pub async fn add_target(&self, target: &Target) -> Result<(), Error> {
        let owner = self.require_connection()?;
        let (vendor_id, product_id) = target.begin_add()?;

        let device = match self
            .bus
            .plug_in(owner, target.target_type(), vendor_id, product_id)
            .await
        {
            Ok(device) => device,
            Err(e) => {
                target.abort_add();
                return Err(e.into());
            }
        };

        Self::attach(&self.bus, &self.state, owner, target, device).await
    }

    /// Add the target to the bus without waiting. Validation happens right
    /// away. The callback fires at most once from a separate task, after the
    /// target finished enumerating or with the error that prevented the add.
    /// If the target is removed or freed before that, the callback never
    /// fires. If the bus takes the target away on its own, for example
    /// because it stopped, the callback gets [Error::BusNotFound].
    pub fn add_target_async<F>(&self, target: &Target, callback: F) -> Result<(), Error>
    where
        F: FnOnce(Result<(), Error>) + Send + 'static,
    {
        let owner = self.require_connection()?;
        let (vendor_id, product_id) = target.begin_add()?;

        let bus = self.bus.clone();
        let state = self.state.clone();
        let target = target.clone();
        tokio::spawn(async move {
            let kind = target.target_type();
            let device = match bus.plug_in(owner, kind, vendor_id, product_id).await {
                Ok(device) => device,
                Err(e) => {
                    target.abort_add();
                    if target.is_freed() {
                        log::debug!("Dropping add result of freed target: {e}");
                        return;
                    }
                    callback(Err(e.into()));
                    return;
                }
            };

            let mut state_rx = device.subscribe_state();
            if let Err(e) = Self::attach(&bus, &state, owner, &target, device).await {
                log::debug!("Neutralized add of {kind} target: {e}");
                return;
            }

            let state = state_rx
                .wait_for(|state| *state != TargetState::Enumerating)
                .await
                .map(|state| *state);
            match state {
                Ok(TargetState::Plugged) => callback(Ok(())),
                _ if target.is_removing() || target.is_freed() => {
                    log::debug!("{kind} target removed while enumerating, no result");
                }
                Ok(state) => {
                    log::debug!("Bus took {kind} target away while enumerating: {state}");
                    callback(Err(Error::BusNotFound));
                }
                Err(e) => {
                    log::debug!("Target state channel closed: {e}");
                    callback(Err(Error::BusNotFound));
                }
            }
        });

        Ok(())
    }

    /// Remove the target from the bus. Every outstanding transfer and
    /// notification request of the target is cancelled.
    pub async fn remove_target(&self, target: &Target) -> Result<(), Error> {
        let device = target.attached_device()?;
        let owner = self.require_connection()?;
        if target.owner() != Some(owner) {
            return Err(Error::RemovalFailed);
        }

        target.set_removing(true);
        if let Err(e) = self.bus.unplug(owner, device.id()).await {
            target.set_removing(false);
            return Err(e.into());
        }
        target.detach(&device);
        self.lock().targets.retain(|t| !t.ptr_eq(target));
        Ok(())
    }

    /// Register a callback for host events of the given target. Only one
    /// callback can be registered per target. The callback is handed the
    /// target alongside every event.
    pub fn register_notification<F>(&self, target: &Target, callback: F) -> Result<(), Error>
    where
        F: FnMut(&Target, Notification) + Send + 'static,
    {
        let device = target.attached_device()?;
        device.register_notification()?;
        let pump = spawn_pump(target.clone(), device, self.notification_depth, Box::new(callback));
        target.set_pump(pump);
        Ok(())
    }

    /// Clear the host event callback of the given target
    pub fn unregister_notification(&self, target: &Target) -> Result<(), Error> {
        let device = target.attached_device()?;
        device.unregister_notification()?;
        target.stop_pump();
        Ok(())
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        let state = self.lock();
        let Some(owner) = state.connection else {
            return;
        };
        for target in state.targets.iter() {
            target.set_removing(true);
            if let Ok(device) = target.attached_device() {
                target.detach(&device);
            }
        }
        if let Err(e) = self.bus.try_unplug_owner(owner) {
            log::debug!("Unable to sweep devices of {owner} on drop: {e}");
        }
    }
}
