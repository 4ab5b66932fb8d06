//! Minimal USB descriptor and interface-selection structures shared by all
//! emulated device classes.
use packed_struct::prelude::*;
use thiserror::Error;

/// Descriptor type of a standard USB device descriptor
pub const DEVICE_DESCRIPTOR_TYPE: u8 = 0x01;
/// Descriptor type of a standard USB configuration descriptor
pub const CONFIGURATION_DESCRIPTOR_TYPE: u8 = 0x02;
/// Size of a standard USB device descriptor
pub const DEVICE_DESCRIPTOR_SIZE: usize = 18;

/// Possible errors while serving descriptors or selecting a configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("buffer of {given} bytes is too small, need at least {required} bytes")]
    BufferTooSmall { given: usize, required: usize },
    #[error("device class does not use an interface selection table")]
    Unsupported,
    #[error("unable to pack descriptor: {0}")]
    PackingError(#[from] PackingError),
}

/// Standard USB device descriptor
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "18")]
pub struct DeviceDescriptor {
    #[packed_field(bytes = "0")]
    pub length: u8,
    #[packed_field(bytes = "1")]
    pub descriptor_type: u8,
    #[packed_field(bytes = "2..=3", endian = "lsb")]
    pub bcd_usb: u16,
    #[packed_field(bytes = "4")]
    pub device_class: u8,
    #[packed_field(bytes = "5")]
    pub device_subclass: u8,
    #[packed_field(bytes = "6")]
    pub device_protocol: u8,
    #[packed_field(bytes = "7")]
    pub max_packet_size: u8,
    #[packed_field(bytes = "8..=9", endian = "lsb")]
    pub vendor_id: u16,
    #[packed_field(bytes = "10..=11", endian = "lsb")]
    pub product_id: u16,
    #[packed_field(bytes = "12..=13", endian = "lsb")]
    pub bcd_device: u16,
    #[packed_field(bytes = "14")]
    pub manufacturer_index: u8,
    #[packed_field(bytes = "15")]
    pub product_index: u8,
    #[packed_field(bytes = "16")]
    pub serial_number_index: u8,
    #[packed_field(bytes = "17")]
    pub num_configurations: u8,
}

impl Default for DeviceDescriptor {
    fn default() -> Self {
        Self {
            length: DEVICE_DESCRIPTOR_SIZE as u8,
            descriptor_type: DEVICE_DESCRIPTOR_TYPE,
            bcd_usb: 0x0200,
            device_class: 0x00,
            device_subclass: 0x00,
            device_protocol: 0x00,
            max_packet_size: 0x40,
            vendor_id: 0,
            product_id: 0,
            bcd_device: 0x0100,
            manufacturer_index: 0x01,
            product_index: 0x02,
            serial_number_index: 0x03,
            num_configurations: 0x01,
        }
    }
}

/// Copy the given descriptor into a caller supplied buffer. The buffer must
/// be able to hold the complete descriptor.
pub fn copy_descriptor(descriptor: &[u8], buf: &mut [u8]) -> Result<usize, ConfigurationError> {
    if buf.len() < descriptor.len() {
        return Err(ConfigurationError::BufferTooSmall {
            given: buf.len(),
            required: descriptor.len(),
        });
    }
    buf[..descriptor.len()].copy_from_slice(descriptor);
    Ok(descriptor.len())
}

/// Transfer type of an endpoint pipe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeType {
    Control,
    Isochronous,
    Bulk,
    Interrupt,
}

/// Pipe information returned when selecting a configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeInformation {
    pub endpoint_address: u8,
    pub pipe_type: PipeType,
    pub max_packet_size: u16,
    pub interval: u8,
}

/// Interface information returned when selecting a configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceInformation {
    pub interface_number: u8,
    pub alternate_setting: u8,
    pub class: u8,
    pub subclass: u8,
    pub protocol: u8,
    pub pipes: Vec<PipeInformation>,
}
