use packed_struct::prelude::*;

use crate::target::Notification;

use super::{
    descriptor,
    hid_report::{
        OutputMessageType, PackedInputPacket, PackedLedPacket, PackedRumblePacket, XusbReport,
    },
};

// Hardware ID's
pub const VID: u16 = 0x045e;
pub const PID: u16 = 0x028e;

/// Encodes [XusbReport] updates into inbound packets and tracks the force
/// feedback and LED state written by the host.
#[derive(Debug, Clone)]
pub struct Driver {
    vendor_id: u16,
    product_id: u16,
    large_motor: u8,
    small_motor: u8,
    led_number: u8,
}

impl Driver {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
            large_motor: 0,
            small_motor: 0,
            led_number: 0,
        }
    }

    /// Pack the given report into an inbound interrupt packet
    pub fn encode(&self, report: &XusbReport) -> Result<Vec<u8>, PackingError> {
        let packet = PackedInputPacket::new(*report);
        Ok(packet.pack()?.to_vec())
    }

    /// Handle a host -> device packet. Returns a notification carrying the
    /// full output state when the packet changed it.
    pub fn handle_output(&mut self, data: &[u8]) -> Option<Notification> {
        let message_type = OutputMessageType::from_u8(*data.first()?)?;
        match message_type {
            OutputMessageType::Rumble => {
                let buf: &[u8; 8] = data.get(..8)?.try_into().ok()?;
                let packet = PackedRumblePacket::unpack(buf).ok()?;
                log::trace!(
                    "Got XUSB rumble: large: {}, small: {}",
                    packet.large_motor,
                    packet.small_motor
                );
                self.large_motor = packet.large_motor;
                self.small_motor = packet.small_motor;
            }
            OutputMessageType::Led => {
                let buf: &[u8; 3] = data.get(..3)?.try_into().ok()?;
                let packet = PackedLedPacket::unpack(buf).ok()?;
                log::trace!("Got XUSB LED pattern: {}", packet.pattern);
                self.led_number = packet.led_number()?;
            }
        }

        Some(Notification::Xbox360 {
            large_motor: self.large_motor,
            small_motor: self.small_motor,
            led_number: self.led_number,
        })
    }

    /// Returns the device descriptor
    pub fn device_descriptor(&self) -> Result<Vec<u8>, PackingError> {
        descriptor::device_descriptor(self.vendor_id, self.product_id)
    }

    /// Returns the configuration descriptor
    pub fn configuration_descriptor(&self) -> &'static [u8] {
        &descriptor::CONFIGURATION_DESCRIPTOR
    }
}
