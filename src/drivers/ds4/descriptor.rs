use packed_struct::prelude::*;

use crate::drivers::usb::DeviceDescriptor;

/// Size of the DualShock 4 configuration descriptor
pub const DS4_DESCRIPTOR_SIZE: usize = 0x0029;

/// Configuration descriptor of a wired DualShock 4 with a single HID
/// interface and one interrupt pipe in each direction.
pub const CONFIGURATION_DESCRIPTOR: [u8; DS4_DESCRIPTOR_SIZE] = [
    0x09, 0x02, 0x29, 0x00, 0x01, 0x01, 0x00, 0xC0, 0xFA, // Configuration
    0x09, 0x04, 0x00, 0x00, 0x02, 0x03, 0x00, 0x00, 0x00, // Interface 0: HID
    0x09, 0x21, 0x11, 0x01, 0x00, 0x01, 0x22, 0xD3, 0x01, // HID
    0x07, 0x05, 0x84, 0x03, 0x40, 0x00, 0x05, // EP 4 IN
    0x07, 0x05, 0x03, 0x03, 0x40, 0x00, 0x05, // EP 3 OUT
];

/// Returns the packed device descriptor for the given hardware ids
pub fn device_descriptor(vendor_id: u16, product_id: u16) -> Result<Vec<u8>, PackingError> {
    let descriptor = DeviceDescriptor {
        vendor_id,
        product_id,
        ..Default::default()
    };
    Ok(descriptor.pack()?.to_vec())
}
