use packed_struct::prelude::*;

use crate::{
    drivers::usb::{ConfigurationError, InterfaceInformation},
    target::Notification,
};

use super::{
    descriptor,
    hid_report::{GipCommand, PackedInputPacket, PackedRumblePacket, XgipReport},
    init::InitSequence,
};

// Hardware ID's
pub const VID: u16 = 0x045e;
pub const PID: u16 = 0x02d1;

/// Size of an input packet sent to the class driver
pub const XGIP_REPORT_SIZE: usize = 0x12;
/// Default interval in milliseconds between two init packets
pub const XGIP_SYS_INIT_PERIOD: u64 = 0x32;

/// Encodes [XgipReport] updates into GIP input packets and tracks the rumble
/// state written by the host.
#[derive(Debug, Clone)]
pub struct Driver {
    vendor_id: u16,
    product_id: u16,
    sequence: u8,
    large_motor: u8,
    small_motor: u8,
}

impl Driver {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
            sequence: 0,
            large_motor: 0,
            small_motor: 0,
        }
    }

    /// Returns the next packet sequence number. Zero is never used.
    fn next_sequence(&mut self) -> u8 {
        self.sequence = self.sequence.wrapping_add(1);
        if self.sequence == 0 {
            self.sequence = 1;
        }
        self.sequence
    }

    /// Pack the given report into an input packet
    pub fn encode(&mut self, report: &XgipReport) -> Result<Vec<u8>, PackingError> {
        let sequence = self.next_sequence();
        let packet = PackedInputPacket::new(sequence, *report);
        Ok(packet.pack()?.to_vec())
    }

    /// Handle a host -> device packet. Returns a notification carrying the
    /// rumble state when the packet is a rumble command.
    pub fn handle_output(&mut self, data: &[u8]) -> Option<Notification> {
        let command = GipCommand::from_u8(*data.first()?)?;
        match command {
            GipCommand::Rumble => {
                let buf: &[u8; 10] = data.get(..10)?.try_into().ok()?;
                let packet = PackedRumblePacket::unpack(buf).ok()?;
                log::trace!(
                    "Got XGIP rumble: large: {}, small: {}",
                    packet.large_motor,
                    packet.small_motor
                );
                self.large_motor = packet.large_motor;
                self.small_motor = packet.small_motor;
                Some(Notification::XboxOne {
                    large_motor: self.large_motor,
                    small_motor: self.small_motor,
                })
            }
            _ => {
                log::trace!("Ignoring XGIP command: {command:?}");
                None
            }
        }
    }

    /// Returns a fresh init sequence for this device
    pub fn init_sequence(&self) -> InitSequence {
        InitSequence::new(self.vendor_id, self.product_id)
    }

    /// Returns the device descriptor
    pub fn device_descriptor(&self) -> Result<Vec<u8>, PackingError> {
        descriptor::device_descriptor(self.vendor_id, self.product_id)
    }

    /// Returns the configuration descriptor
    pub fn configuration_descriptor(&self) -> &'static [u8] {
        &descriptor::CONFIGURATION_DESCRIPTOR
    }

    /// Select the device configuration. See [descriptor::select_configuration].
    pub fn select_configuration(
        &self,
        table_len: usize,
    ) -> Result<Vec<InterfaceInformation>, ConfigurationError> {
        descriptor::select_configuration(table_len)
    }
}
