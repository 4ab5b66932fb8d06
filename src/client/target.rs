use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;

use crate::{
    bus::{device::ChildDevice, ConnectionId},
    error::Error,
    target::{Report, TargetState, TargetType},
};

#[derive(Debug)]
struct TargetInner {
    vendor_id: u16,
    product_id: u16,
    device: Option<ChildDevice>,
    owner: Option<ConnectionId>,
    pending_add: bool,
    removing: bool,
    freed: bool,
    pump: Option<JoinHandle<()>>,
}

impl TargetInner {
    /// Forget a device that the bus removed on its own (bus stopped or a
    /// connection sweep).
    fn prune_removed(&mut self) {
        let removed = self
            .device
            .as_ref()
            .is_some_and(|device| device.state() == TargetState::Removed);
        if removed {
            self.clear_device();
        }
    }

    fn clear_device(&mut self) {
        self.device = None;
        self.owner = None;
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }

    fn check_freed(&self) -> Result<(), Error> {
        if self.freed {
            return Err(Error::TargetUninitialized);
        }
        Ok(())
    }
}

/// A virtual controller owned by the controlling process. Targets are
/// created independent of any connection and can be added to and removed
/// from the bus any number of times until they are freed.
#[derive(Debug, Clone)]
pub struct Target {
    kind: TargetType,
    inner: Arc<Mutex<TargetInner>>,
}

impl Target {
    /// Allocate a new target of the given class with its default hardware ids
    pub fn new(kind: TargetType) -> Self {
        let inner = TargetInner {
            vendor_id: kind.default_vendor_id(),
            product_id: kind.default_product_id(),
            device: None,
            owner: None,
            pending_add: false,
            removing: false,
            freed: false,
            pump: None,
        };
        Self {
            kind,
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Allocate a new Xbox 360 target
    pub fn xbox360() -> Self {
        Self::new(TargetType::Xbox360)
    }

    /// Allocate a new DualShock 4 target
    pub fn dualshock4() -> Self {
        Self::new(TargetType::DualShock4)
    }

    /// Allocate a new Xbox One target
    pub fn xbox_one() -> Self {
        Self::new(TargetType::XboxOne)
    }

    fn lock(&self) -> MutexGuard<'_, TargetInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns true if both handles refer to the same target
    pub fn ptr_eq(&self, other: &Target) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Device class of the target
    pub fn target_type(&self) -> TargetType {
        self.kind
    }

    pub fn vendor_id(&self) -> Result<u16, Error> {
        let inner = self.lock();
        inner.check_freed()?;
        Ok(inner.vendor_id)
    }

    pub fn product_id(&self) -> Result<u16, Error> {
        let inner = self.lock();
        inner.check_freed()?;
        Ok(inner.product_id)
    }

    /// Set the vendor id. Only possible while the target is not on the bus.
    pub fn set_vendor_id(&self, vendor_id: u16) -> Result<(), Error> {
        let mut inner = self.lock();
        inner.check_freed()?;
        inner.prune_removed();
        if inner.device.is_some() || inner.pending_add {
            return Err(Error::AlreadyConnected);
        }
        inner.vendor_id = vendor_id;
        Ok(())
    }

    /// Set the product id. Only possible while the target is not on the bus.
    pub fn set_product_id(&self, product_id: u16) -> Result<(), Error> {
        let mut inner = self.lock();
        inner.check_freed()?;
        inner.prune_removed();
        if inner.device.is_some() || inner.pending_add {
            return Err(Error::AlreadyConnected);
        }
        inner.product_id = product_id;
        Ok(())
    }

    /// Slot index assigned by the bus
    pub fn index(&self) -> Result<u32, Error> {
        Ok(self.attached_device()?.index())
    }

    /// Current lifecycle state of the target
    pub fn state(&self) -> TargetState {
        let mut inner = self.lock();
        if inner.freed {
            return TargetState::Removed;
        }
        inner.prune_removed();
        match inner.device.as_ref() {
            Some(device) => device.state(),
            None => TargetState::Unplugged,
        }
    }

    /// Returns true if the target is on the bus
    pub fn is_attached(&self) -> bool {
        self.attached_device().is_ok()
    }

    /// Returns true once the target has been freed
    pub fn is_freed(&self) -> bool {
        self.lock().freed
    }

    /// Push a report update to the target
    pub fn update<R>(&self, report: R) -> Result<(), Error>
    where
        R: Into<Report>,
    {
        let report = report.into();
        let device = self.attached_device()?;
        if report.target_type() != self.kind {
            return Err(Error::InvalidTarget);
        }
        device.update(&report)
    }

    /// Release the target. Targets on the bus must be removed first. Any
    /// add still in flight is neutralized.
    pub fn free(&self) -> Result<(), Error> {
        let mut inner = self.lock();
        inner.check_freed()?;
        inner.prune_removed();
        if inner.device.is_some() {
            return Err(Error::AlreadyConnected);
        }
        if inner.pending_add {
            log::debug!("Freeing {} target with an add in flight", self.kind);
        }
        inner.freed = true;
        Ok(())
    }

    /// Returns the child device of the target if it is on the bus
    pub(crate) fn attached_device(&self) -> Result<ChildDevice, Error> {
        let mut inner = self.lock();
        inner.check_freed()?;
        inner.prune_removed();
        inner.device.clone().ok_or(Error::TargetNotPluggedIn)
    }

    /// Returns the connection that added the target
    pub(crate) fn owner(&self) -> Option<ConnectionId> {
        self.lock().owner
    }

    /// Mark an add as in flight. Returns the hardware ids to plug in with.
    pub(crate) fn begin_add(&self) -> Result<(u16, u16), Error> {
        let mut inner = self.lock();
        inner.check_freed()?;
        inner.prune_removed();
        if inner.device.is_some() || inner.pending_add {
            return Err(Error::AlreadyConnected);
        }
        inner.pending_add = true;
        inner.removing = false;
        Ok((inner.vendor_id, inner.product_id))
    }

    /// Attach the plugged in device. Returns false if the target was freed
    /// while the add was in flight.
    pub(crate) fn finish_add(&self, device: ChildDevice, owner: ConnectionId) -> bool {
        let mut inner = self.lock();
        inner.pending_add = false;
        if inner.freed {
            return false;
        }
        inner.device = Some(device);
        inner.owner = Some(owner);
        true
    }

    /// Clear the in flight add after a failure
    pub(crate) fn abort_add(&self) {
        self.lock().pending_add = false;
    }

    /// Record that the controlling process asked for the target to be taken
    /// off the bus, as opposed to the bus removing it on its own.
    pub(crate) fn set_removing(&self, removing: bool) {
        self.lock().removing = removing;
    }

    /// Returns true if the last removal of the target was requested by the
    /// controlling process
    pub(crate) fn is_removing(&self) -> bool {
        self.lock().removing
    }

    /// Forget the given device after it was removed from the bus
    pub(crate) fn detach(&self, device: &ChildDevice) {
        let mut inner = self.lock();
        let current = inner
            .device
            .as_ref()
            .is_some_and(|current| current.ptr_eq(device));
        if current {
            inner.clear_device();
        }
    }

    /// Store the task pumping notifications for this target
    pub(crate) fn set_pump(&self, pump: JoinHandle<()>) {
        if let Some(old) = self.lock().pump.replace(pump) {
            old.abort();
        }
    }

    /// Stop the notification pump of this target
    pub(crate) fn stop_pump(&self) {
        if let Some(pump) = self.lock().pump.take() {
            pump.abort();
        }
    }
}
