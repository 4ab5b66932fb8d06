use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::{sync::watch, task::JoinHandle};

use crate::{
    drivers::{
        usb::{self, ConfigurationError, InterfaceInformation},
        xgip::{descriptor::Guid, init::InitSequence},
        DeviceDriver,
    },
    error::Error,
    target::{Notification, Report, TargetState, TargetType},
};

use super::{
    notification::{DeliveryOutcome, NotificationQueue, PendingNotification},
    slot::TargetId,
    transfer::{PendingTransferRequest, TransferQueue},
    ConnectionId,
};

/// Result of a single init sequencer tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStep {
    /// No transfer request was waiting
    Waiting,
    /// An init packet completed a transfer request
    Fed,
    /// The sequence is exhausted and the device is plugged in
    Finished,
    /// The device left the enumerating state
    Aborted,
}

/// Mutable state of a child device. Guarded by a lock local to the device
/// so that concurrent devices never contend with each other.
#[derive(Debug)]
struct DeviceState {
    state: TargetState,
    driver: DeviceDriver,
    transfers: TransferQueue,
    notifications: NotificationQueue,
    sys_init_ready: bool,
}

#[derive(Debug)]
struct Inner {
    id: TargetId,
    kind: TargetType,
    vendor_id: u16,
    product_id: u16,
    owner: ConnectionId,
    state: Mutex<DeviceState>,
    state_tx: watch::Sender<TargetState>,
}

/// A virtual child device plugged into the bus. This is the handle the
/// device-class stack uses to submit transfers and deliver host events, and
/// the handle a controlling process uses to push reports.
#[derive(Debug, Clone)]
pub struct ChildDevice {
    inner: Arc<Inner>,
}

impl ChildDevice {
    /// Create a new child device. Device classes that need an init sequence
    /// start out enumerating, all others are plugged in right away.
    pub(crate) fn new(
        id: TargetId,
        kind: TargetType,
        vendor_id: u16,
        product_id: u16,
        owner: ConnectionId,
    ) -> Self {
        let state = if kind.requires_init_sequence() {
            TargetState::Enumerating
        } else {
            TargetState::Plugged
        };
        let (state_tx, _) = watch::channel(state);
        let device_state = DeviceState {
            state,
            driver: DeviceDriver::new(kind, vendor_id, product_id),
            transfers: TransferQueue::new(),
            notifications: NotificationQueue::new(),
            sys_init_ready: !kind.requires_init_sequence(),
        };

        Self {
            inner: Arc::new(Inner {
                id,
                kind,
                vendor_id,
                product_id,
                owner,
                state: Mutex::new(device_state),
                state_tx,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, device: &mut DeviceState, state: TargetState) {
        log::debug!(
            "Device {} changed state: {} -> {}",
            self.inner.id,
            device.state,
            state
        );
        device.state = state;
        self.inner.state_tx.send_replace(state);
    }

    /// Slot id of the device
    pub fn id(&self) -> TargetId {
        self.inner.id
    }

    /// Slot index of the device
    pub fn index(&self) -> u32 {
        self.inner.id.index
    }

    pub fn target_type(&self) -> TargetType {
        self.inner.kind
    }

    pub fn vendor_id(&self) -> u16 {
        self.inner.vendor_id
    }

    pub fn product_id(&self) -> u16 {
        self.inner.product_id
    }

    /// Connection that plugged in the device
    pub fn owner(&self) -> ConnectionId {
        self.inner.owner
    }

    /// Current lifecycle state
    pub fn state(&self) -> TargetState {
        self.lock().state
    }

    /// Subscribe to lifecycle state changes
    pub fn subscribe_state(&self) -> watch::Receiver<TargetState> {
        self.inner.state_tx.subscribe()
    }

    /// Returns true once the init sequence has been fully replayed
    pub fn is_sys_init_ready(&self) -> bool {
        self.lock().sys_init_ready
    }

    /// Returns true if both handles refer to the same device
    pub fn ptr_eq(&self, other: &ChildDevice) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Push a report update. The oldest waiting transfer request completes
    /// with it, or it is cached for the next request.
    pub fn update(&self, report: &Report) -> Result<(), Error> {
        let mut device = self.lock();
        if device.state != TargetState::Plugged {
            return Err(Error::TargetNotPluggedIn);
        }
        let packet = device.driver.encode(report)?;
        device.transfers.complete(packet);
        Ok(())
    }

    /// Submit an inbound interrupt transfer request
    pub fn submit_interrupt_in(&self) -> PendingTransferRequest {
        self.lock().transfers.enqueue()
    }

    /// Submit an outbound interrupt transfer written by the host. Packets that
    /// carry a host event are forwarded to the notification channel.
    pub fn submit_interrupt_out(&self, data: &[u8]) -> Option<DeliveryOutcome> {
        let mut device = self.lock();
        if matches!(device.state, TargetState::Unplugging | TargetState::Removed) {
            return None;
        }
        let notification = device.driver.handle_output(data)?;
        Some(device.notifications.deliver(notification))
    }

    /// Deliver a host event to the controlling process
    pub fn deliver_event(&self, notification: Notification) -> DeliveryOutcome {
        self.lock().notifications.deliver(notification)
    }

    /// Register interest in host events
    pub fn register_notification(&self) -> Result<(), Error> {
        self.lock().notifications.register()
    }

    /// Drop interest in host events
    pub fn unregister_notification(&self) -> Result<(), Error> {
        self.lock().notifications.unregister()
    }

    /// Returns true if a notification callback is registered
    pub fn has_notification(&self) -> bool {
        self.lock().notifications.is_registered()
    }

    /// Submit a request for the next host event
    pub fn submit_notification(&self) -> PendingNotification {
        self.lock().notifications.submit()
    }

    /// Number of queued transfer and notification requests
    pub fn pending_requests(&self) -> (usize, usize) {
        let device = self.lock();
        (
            device.transfers.pending_len(),
            device.notifications.pending_len(),
        )
    }

    /// Returns the packed device descriptor
    pub fn device_descriptor(&self) -> Result<Vec<u8>, ConfigurationError> {
        self.lock().driver.device_descriptor()
    }

    /// Returns the configuration descriptor
    pub fn configuration_descriptor(&self) -> &'static [u8] {
        self.lock().driver.configuration_descriptor()
    }

    /// Copy the configuration descriptor into the given buffer. Returns the
    /// number of bytes written.
    pub fn read_configuration_descriptor(&self, buf: &mut [u8]) -> Result<usize, ConfigurationError> {
        usb::copy_descriptor(self.configuration_descriptor(), buf)
    }

    /// Fill in the interface selection table of the given size
    pub fn select_configuration(
        &self,
        table_len: usize,
    ) -> Result<Vec<InterfaceInformation>, ConfigurationError> {
        self.lock().driver.select_configuration(table_len)
    }

    /// Device interfaces the child exposes
    pub fn interface_guids(&self) -> &'static [Guid] {
        self.lock().driver.interface_guids()
    }

    /// Feed the next init packet to a waiting transfer request. A packet that
    /// could not be delivered is kept in `staged` for the next tick.
    pub(crate) fn feed_init_packet(
        &self,
        sequence: &mut InitSequence,
        staged: &mut Option<Vec<u8>>,
    ) -> InitStep {
        let mut device = self.lock();
        if device.state != TargetState::Enumerating {
            return InitStep::Aborted;
        }
        if !device.transfers.has_waiter() {
            return InitStep::Waiting;
        }

        if let Some(packet) = staged.take().or_else(|| sequence.next()) {
            if let Some(packet) = device.transfers.try_complete(packet) {
                *staged = Some(packet);
                return InitStep::Waiting;
            }
            log::trace!(
                "Device {} fed init packet {}/{}",
                self.inner.id,
                sequence.total() - sequence.remaining(),
                sequence.total()
            );
            if !sequence.is_exhausted() {
                return InitStep::Fed;
            }
        }

        log::debug!("Device {} finished init sequence", self.inner.id);
        device.sys_init_ready = true;
        self.set_state(&mut device, TargetState::Plugged);
        InitStep::Finished
    }

    /// Spawn the timer task replaying the init sequence for device classes
    /// that need one.
    pub(crate) fn spawn_init_sequencer(&self, period: Duration) -> Option<JoinHandle<()>> {
        let sequence = self.lock().driver.init_sequence()?;
        let device = self.clone();
        Some(tokio::spawn(super::sequencer::run(device, sequence, period)))
    }

    /// Unplug the device, cancelling every outstanding transfer and
    /// notification request. Returns the number of cancelled requests.
    pub(crate) fn unplug(&self) -> (usize, usize) {
        let mut device = self.lock();
        self.set_state(&mut device, TargetState::Unplugging);
        let transfers = device.transfers.cancel_all();
        let notifications = device.notifications.cancel_all();
        self.set_state(&mut device, TargetState::Removed);
        log::debug!(
            "Device {} cancelled {transfers} transfer(s) and {notifications} notification(s)",
            self.inner.id
        );
        (transfers, notifications)
    }
}
