use packed_struct::prelude::*;

use crate::drivers::usb::DeviceDescriptor;

/// Size of the XUSB configuration descriptor
pub const XUSB_DESCRIPTOR_SIZE: usize = 0x0099;

/// Configuration descriptor of a wired Xbox 360 controller. Values can be
/// obtained from a real device with "sudo lsusb -v".
pub const CONFIGURATION_DESCRIPTOR: [u8; XUSB_DESCRIPTOR_SIZE] = [
    0x09, 0x02, 0x99, 0x00, 0x04, 0x01, 0x00, 0xA0, 0xFA, // Configuration
    // Interface 0: Gamepad
    0x09, 0x04, 0x00, 0x00, 0x02, 0xFF, 0x5D, 0x01, 0x00, //
    0x11, 0x21, 0x00, 0x01, 0x01, 0x25, 0x81, 0x14, 0x00, 0x00, 0x00, 0x00, 0x13, 0x01, 0x08, 0x00,
    0x00, //
    0x07, 0x05, 0x81, 0x03, 0x20, 0x00, 0x04, // EP 1 IN
    0x07, 0x05, 0x01, 0x03, 0x20, 0x00, 0x08, // EP 1 OUT
    // Interface 1: Headset
    0x09, 0x04, 0x01, 0x00, 0x04, 0xFF, 0x5D, 0x03, 0x00, //
    0x1B, 0x21, 0x00, 0x01, 0x01, 0x01, 0x82, 0x40, 0x01, 0x02, 0x20, 0x16, 0x83, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x16, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x07, 0x05, 0x82, 0x03, 0x20, 0x00, 0x02, // EP 2 IN
    0x07, 0x05, 0x02, 0x03, 0x20, 0x00, 0x04, // EP 2 OUT
    0x07, 0x05, 0x83, 0x03, 0x20, 0x00, 0x40, // EP 3 IN
    0x07, 0x05, 0x03, 0x03, 0x20, 0x00, 0x10, // EP 3 OUT
    // Interface 2: Plugin module
    0x09, 0x04, 0x02, 0x00, 0x01, 0xFF, 0x5D, 0x02, 0x00, //
    0x09, 0x21, 0x00, 0x01, 0x01, 0x22, 0x84, 0x07, 0x00, //
    0x07, 0x05, 0x84, 0x03, 0x20, 0x00, 0x10, // EP 4 IN
    // Interface 3: Security
    0x09, 0x04, 0x03, 0x00, 0x00, 0xFF, 0xFD, 0x13, 0x04, //
    0x06, 0x41, 0x00, 0x01, 0x01, 0x03, //
];

/// Returns the packed device descriptor for the given hardware ids
pub fn device_descriptor(vendor_id: u16, product_id: u16) -> Result<Vec<u8>, PackingError> {
    let descriptor = DeviceDescriptor {
        device_class: 0xFF,
        device_subclass: 0xFF,
        device_protocol: 0xFF,
        max_packet_size: 0x08,
        vendor_id,
        product_id,
        bcd_device: 0x0114,
        ..Default::default()
    };
    Ok(descriptor.pack()?.to_vec())
}
