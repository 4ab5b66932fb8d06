use std::fmt::Display;

use packed_struct::prelude::*;

use crate::drivers::usb::{
    ConfigurationError, DeviceDescriptor, InterfaceInformation, PipeInformation, PipeType,
};

/// Size of the XGIP configuration descriptor
pub const XGIP_DESCRIPTOR_SIZE: usize = 0x0040;
/// Minimum size of the interface selection table handed to
/// [select_configuration]
pub const XGIP_CONFIGURATION_SIZE: usize = 0x88;

/// Configuration descriptor of a wired Xbox One controller
pub const CONFIGURATION_DESCRIPTOR: [u8; XGIP_DESCRIPTOR_SIZE] = [
    0x09, 0x02, 0x40, 0x00, 0x02, 0x01, 0x00, 0xC0, 0xFA, // Configuration
    // Interface 0: GIP
    0x09, 0x04, 0x00, 0x00, 0x02, 0xFF, 0x47, 0xD0, 0x00, //
    0x07, 0x05, 0x81, 0x03, 0x40, 0x00, 0x04, // EP 1 IN
    0x07, 0x05, 0x01, 0x03, 0x40, 0x00, 0x04, // EP 1 OUT
    // Interface 1: Audio
    0x09, 0x04, 0x01, 0x00, 0x00, 0xFF, 0x47, 0xD0, 0x00, //
    0x09, 0x04, 0x01, 0x01, 0x02, 0xFF, 0x47, 0xD0, 0x00, //
    0x07, 0x05, 0x02, 0x01, 0xE0, 0x00, 0x01, // EP 2 OUT
    0x07, 0x05, 0x82, 0x01, 0x80, 0x00, 0x01, // EP 2 IN
];

/// A globally unique interface identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl Guid {
    pub const fn new(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }

    /// Returns the mixed-endian wire representation of the identifier
    pub fn to_bytes(&self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[0..4].copy_from_slice(&self.data1.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.data2.to_le_bytes());
        bytes[6..8].copy_from_slice(&self.data3.to_le_bytes());
        bytes[8..16].copy_from_slice(&self.data4);
        bytes
    }
}

impl Display for Guid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let d = &self.data4;
        write!(
            f,
            "{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
            self.data1, self.data2, self.data3, d[0], d[1], d[2], d[3], d[4], d[5], d[6], d[7]
        )
    }
}

/// Device interfaces that must be exposed by every XGIP child or the class
/// stack refuses to start it.
pub const INTERFACE_GUIDS: [Guid; 5] = [
    Guid::new(
        0x70211B0E,
        0x0AFB,
        0x47DB,
        [0xAF, 0xC1, 0x41, 0x0B, 0xF8, 0x42, 0x49, 0x7A],
    ),
    Guid::new(
        0xB38290E5,
        0x3CD0,
        0x4F9D,
        [0x99, 0x37, 0xF5, 0xFE, 0x2B, 0x44, 0xD4, 0x7A],
    ),
    Guid::new(
        0x2AEB0243,
        0x6A6E,
        0x486B,
        [0x82, 0xFC, 0xD8, 0x15, 0xF6, 0xB9, 0x70, 0x06],
    ),
    Guid::new(
        0xDC7A8E51,
        0x49B3,
        0x4A3A,
        [0x9E, 0x81, 0x62, 0x52, 0x05, 0xE7, 0xD7, 0x29],
    ),
    Guid::new(
        0xDEEE98EA,
        0xC0A1,
        0x42C3,
        [0x97, 0x38, 0xA0, 0x46, 0x06, 0xC8, 0x4E, 0x93],
    ),
];

/// Returns the packed device descriptor for the given hardware ids
pub fn device_descriptor(vendor_id: u16, product_id: u16) -> Result<Vec<u8>, PackingError> {
    let descriptor = DeviceDescriptor {
        device_class: 0xFF,
        device_subclass: 0x47,
        device_protocol: 0xD0,
        vendor_id,
        product_id,
        bcd_device: 0x0203,
        ..Default::default()
    };
    Ok(descriptor.pack()?.to_vec())
}

/// Fill in the interface selection for the class driver. The interface
/// table supplied by the caller must be at least [XGIP_CONFIGURATION_SIZE]
/// bytes long.
pub fn select_configuration(
    table_len: usize,
) -> Result<Vec<InterfaceInformation>, ConfigurationError> {
    if table_len < XGIP_CONFIGURATION_SIZE {
        return Err(ConfigurationError::BufferTooSmall {
            given: table_len,
            required: XGIP_CONFIGURATION_SIZE,
        });
    }

    let gamepad = InterfaceInformation {
        interface_number: 0,
        alternate_setting: 0,
        class: 0xFF,
        subclass: 0x47,
        protocol: 0xD0,
        pipes: vec![
            PipeInformation {
                endpoint_address: 0x81,
                pipe_type: PipeType::Interrupt,
                max_packet_size: 0x40,
                interval: 0x04,
            },
            PipeInformation {
                endpoint_address: 0x01,
                pipe_type: PipeType::Interrupt,
                max_packet_size: 0x40,
                interval: 0x04,
            },
        ],
    };
    let audio = InterfaceInformation {
        interface_number: 1,
        alternate_setting: 0,
        class: 0xFF,
        subclass: 0x47,
        protocol: 0xD0,
        pipes: vec![],
    };

    Ok(vec![gamepad, audio])
}
