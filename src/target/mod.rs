//! Types describing virtual targets that can be plugged into the bus.
use std::{fmt::Display, str::FromStr};

use crate::drivers::{
    ds4::hid_report::{Ds4Report, Ds4ReportEx},
    xgip::hid_report::XgipReport,
    xusb::hid_report::XusbReport,
};

/// Device class of a virtual target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetType {
    /// Microsoft Xbox 360 wired controller (XUSB)
    Xbox360,
    /// Sony DualShock 4 controller
    DualShock4,
    /// Microsoft Xbox One controller (XGIP)
    XboxOne,
}

impl TargetType {
    /// Returns all target types supported by the bus
    pub fn supported_types() -> Vec<TargetType> {
        vec![Self::Xbox360, Self::DualShock4, Self::XboxOne]
    }

    /// Returns the string identifier of the target type
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Xbox360 => "x360",
            TargetType::DualShock4 => "ds4",
            TargetType::XboxOne => "xgip",
        }
    }

    /// Returns the human readable name of the target type
    pub fn name(&self) -> &'static str {
        match self {
            TargetType::Xbox360 => "Microsoft Xbox 360 Controller",
            TargetType::DualShock4 => "Sony DualShock 4 Controller",
            TargetType::XboxOne => "Microsoft Xbox One Controller",
        }
    }

    /// Default vendor id used when a target of this type is allocated
    pub fn default_vendor_id(&self) -> u16 {
        match self {
            TargetType::Xbox360 => crate::drivers::xusb::driver::VID,
            TargetType::DualShock4 => crate::drivers::ds4::driver::VID,
            TargetType::XboxOne => crate::drivers::xgip::driver::VID,
        }
    }

    /// Default product id used when a target of this type is allocated
    pub fn default_product_id(&self) -> u16 {
        match self {
            TargetType::Xbox360 => crate::drivers::xusb::driver::PID,
            TargetType::DualShock4 => crate::drivers::ds4::driver::PID,
            TargetType::XboxOne => crate::drivers::xgip::driver::PID,
        }
    }

    /// Size of the inbound report buffer. This is fixed for the lifetime of
    /// a target.
    pub fn report_size(&self) -> usize {
        match self {
            TargetType::Xbox360 => crate::drivers::xusb::hid_report::INPUT_PACKET_SIZE,
            TargetType::DualShock4 => crate::drivers::ds4::hid_report::INPUT_REPORT_SIZE,
            TargetType::XboxOne => crate::drivers::xgip::driver::XGIP_REPORT_SIZE,
        }
    }

    /// Returns true if the class stack expects the init packet sequence to be
    /// replayed during enumeration.
    pub fn requires_init_sequence(&self) -> bool {
        matches!(self, TargetType::XboxOne)
    }
}

impl Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x360" => Ok(Self::Xbox360),
            "ds4" => Ok(Self::DualShock4),
            "xgip" => Ok(Self::XboxOne),
            _ => Err(format!("Unsupported target type: {s}")),
        }
    }
}

/// Lifecycle state of a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetState {
    /// Allocated but not attached to the bus
    Unplugged,
    /// Attached and replaying the init packet sequence
    Enumerating,
    /// Attached and accepting report updates
    Plugged,
    /// Removal is in progress
    Unplugging,
    /// Removed from the bus
    Removed,
}

impl Display for TargetState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            TargetState::Unplugged => "unplugged",
            TargetState::Enumerating => "enumerating",
            TargetState::Plugged => "plugged",
            TargetState::Unplugging => "unplugging",
            TargetState::Removed => "removed",
        };
        write!(f, "{value}")
    }
}

/// Gamepad state report pushed by the controlling process
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Report {
    Xbox360(XusbReport),
    DualShock4(Ds4Report),
    DualShock4Ex(Ds4ReportEx),
    XboxOne(XgipReport),
}

impl Report {
    /// Returns the target type this report can be sent to
    pub fn target_type(&self) -> TargetType {
        match self {
            Report::Xbox360(_) => TargetType::Xbox360,
            Report::DualShock4(_) => TargetType::DualShock4,
            Report::DualShock4Ex(_) => TargetType::DualShock4,
            Report::XboxOne(_) => TargetType::XboxOne,
        }
    }
}

impl From<XusbReport> for Report {
    fn from(report: XusbReport) -> Self {
        Self::Xbox360(report)
    }
}

impl From<Ds4Report> for Report {
    fn from(report: Ds4Report) -> Self {
        Self::DualShock4(report)
    }
}

impl From<Ds4ReportEx> for Report {
    fn from(report: Ds4ReportEx) -> Self {
        Self::DualShock4Ex(report)
    }
}

impl From<XgipReport> for Report {
    fn from(report: XgipReport) -> Self {
        Self::XboxOne(report)
    }
}

/// Color of the DualShock 4 lightbar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LightbarColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl LightbarColor {
    pub fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

/// Host event (force feedback, LED, lightbar) emitted by the class driver for
/// a target and relayed to the controlling process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Notification {
    Xbox360 {
        large_motor: u8,
        small_motor: u8,
        led_number: u8,
    },
    DualShock4 {
        large_motor: u8,
        small_motor: u8,
        lightbar: LightbarColor,
    },
    XboxOne {
        large_motor: u8,
        small_motor: u8,
    },
}

impl Notification {
    /// Returns the large (low frequency) motor intensity
    pub fn large_motor(&self) -> u8 {
        match self {
            Notification::Xbox360 { large_motor, .. } => *large_motor,
            Notification::DualShock4 { large_motor, .. } => *large_motor,
            Notification::XboxOne { large_motor, .. } => *large_motor,
        }
    }

    /// Returns the small (high frequency) motor intensity
    pub fn small_motor(&self) -> u8 {
        match self {
            Notification::Xbox360 { small_motor, .. } => *small_motor,
            Notification::DualShock4 { small_motor, .. } => *small_motor,
            Notification::XboxOne { small_motor, .. } => *small_motor,
        }
    }
}
