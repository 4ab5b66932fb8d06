//! Device class drivers translating between caller supplied reports, the
//! packets a USB class driver expects and host output events.
pub mod ds4;
pub mod usb;
pub mod xgip;
pub mod xusb;

use crate::{
    error::Error,
    target::{Notification, Report, TargetType},
};

use self::{
    usb::{ConfigurationError, InterfaceInformation},
    xgip::{descriptor::Guid, init::InitSequence},
};

/// Class driver of a single child device
#[derive(Debug, Clone)]
pub enum DeviceDriver {
    Xbox360(xusb::driver::Driver),
    DualShock4(ds4::driver::Driver),
    XboxOne(xgip::driver::Driver),
}

impl DeviceDriver {
    /// Create a new driver for the given device class and hardware ids
    pub fn new(kind: TargetType, vendor_id: u16, product_id: u16) -> Self {
        match kind {
            TargetType::Xbox360 => Self::Xbox360(xusb::driver::Driver::new(vendor_id, product_id)),
            TargetType::DualShock4 => {
                Self::DualShock4(ds4::driver::Driver::new(vendor_id, product_id))
            }
            TargetType::XboxOne => Self::XboxOne(xgip::driver::Driver::new(vendor_id, product_id)),
        }
    }

    /// Returns the device class of this driver
    pub fn target_type(&self) -> TargetType {
        match self {
            DeviceDriver::Xbox360(_) => TargetType::Xbox360,
            DeviceDriver::DualShock4(_) => TargetType::DualShock4,
            DeviceDriver::XboxOne(_) => TargetType::XboxOne,
        }
    }

    /// Encode the given report into an inbound packet. Reports of a
    /// different device class are rejected with [Error::InvalidTarget].
    pub fn encode(&mut self, report: &Report) -> Result<Vec<u8>, Error> {
        let result = match (self, report) {
            (DeviceDriver::Xbox360(driver), Report::Xbox360(report)) => driver.encode(report),
            (DeviceDriver::DualShock4(driver), Report::DualShock4(report)) => {
                driver.encode(report)
            }
            (DeviceDriver::DualShock4(driver), Report::DualShock4Ex(report)) => {
                driver.encode_ex(report)
            }
            (DeviceDriver::XboxOne(driver), Report::XboxOne(report)) => driver.encode(report),
            (driver, report) => {
                log::debug!(
                    "Rejecting {} report for {} device",
                    report.target_type(),
                    driver.target_type()
                );
                return Err(Error::InvalidTarget);
            }
        };

        result.map_err(|e| {
            log::error!("Failed to pack report: {e:?}");
            Error::InvalidTarget
        })
    }

    /// Parse an outbound packet written by the host. Returns the resulting
    /// host event if the packet carried one.
    pub fn handle_output(&mut self, data: &[u8]) -> Option<Notification> {
        match self {
            DeviceDriver::Xbox360(driver) => driver.handle_output(data),
            DeviceDriver::DualShock4(driver) => driver.handle_output(data),
            DeviceDriver::XboxOne(driver) => driver.handle_output(data),
        }
    }

    /// Returns the packed device descriptor
    pub fn device_descriptor(&self) -> Result<Vec<u8>, ConfigurationError> {
        let descriptor = match self {
            DeviceDriver::Xbox360(driver) => driver.device_descriptor()?,
            DeviceDriver::DualShock4(driver) => driver.device_descriptor()?,
            DeviceDriver::XboxOne(driver) => driver.device_descriptor()?,
        };
        Ok(descriptor)
    }

    /// Returns the full configuration descriptor
    pub fn configuration_descriptor(&self) -> &'static [u8] {
        match self {
            DeviceDriver::Xbox360(driver) => driver.configuration_descriptor(),
            DeviceDriver::DualShock4(driver) => driver.configuration_descriptor(),
            DeviceDriver::XboxOne(driver) => driver.configuration_descriptor(),
        }
    }

    /// Select the device configuration. Only device classes that expose an
    /// interface selection table support this.
    pub fn select_configuration(
        &self,
        table_len: usize,
    ) -> Result<Vec<InterfaceInformation>, ConfigurationError> {
        match self {
            DeviceDriver::XboxOne(driver) => driver.select_configuration(table_len),
            _ => Err(ConfigurationError::Unsupported),
        }
    }

    /// Returns the init packet sequence for device classes that need one
    pub fn init_sequence(&self) -> Option<InitSequence> {
        match self {
            DeviceDriver::XboxOne(driver) => Some(driver.init_sequence()),
            _ => None,
        }
    }

    /// Returns the device interfaces the child must expose
    pub fn interface_guids(&self) -> &'static [Guid] {
        match self {
            DeviceDriver::XboxOne(_) => &xgip::descriptor::INTERFACE_GUIDS,
            _ => &[],
        }
    }
}
