//! Wire structures of the XUSB (Xbox 360 wired) protocol.
//! Reference: https://www.partsnotincluded.com/understanding-the-xbox-360-wired-controllers-usb-data/

use packed_struct::prelude::*;

/// Size of the caller supplied [XusbReport]
pub const XUSB_REPORT_SIZE: usize = 12;
/// Size of the inbound interrupt packet sent to the class driver
pub const INPUT_PACKET_SIZE: usize = 20;

/// Message types sent by the host to the device on the OUT endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMessageType {
    Rumble = 0x00,
    Led = 0x01,
}

impl OutputMessageType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Rumble),
            0x01 => Some(Self::Led),
            _ => None,
        }
    }
}

/// Button bits of [XusbReport::buttons]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XusbButton {
    DPadUp = 0x0001,
    DPadDown = 0x0002,
    DPadLeft = 0x0004,
    DPadRight = 0x0008,
    Start = 0x0010,
    Back = 0x0020,
    LeftThumb = 0x0040,
    RightThumb = 0x0080,
    LeftShoulder = 0x0100,
    RightShoulder = 0x0200,
    Guide = 0x0400,
    A = 0x1000,
    B = 0x2000,
    X = 0x4000,
    Y = 0x8000,
}

/// Gamepad state of an Xbox 360 controller as supplied by the controlling
/// process. Layout matches the XInput gamepad structure.
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "12")]
pub struct XusbReport {
    #[packed_field(bytes = "0..=1", endian = "lsb")]
    pub buttons: u16,
    #[packed_field(bytes = "2")]
    pub left_trigger: u8,
    #[packed_field(bytes = "3")]
    pub right_trigger: u8,
    #[packed_field(bytes = "4..=5", endian = "lsb")]
    pub thumb_lx: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "6..=7", endian = "lsb")]
    pub thumb_ly: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "8..=9", endian = "lsb")]
    pub thumb_rx: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "10..=11", endian = "lsb")]
    pub thumb_ry: Integer<i16, packed_bits::Bits<16>>,
}

impl XusbReport {
    /// Return a new neutral report
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear the given button
    pub fn set_button(&mut self, button: XusbButton, pressed: bool) {
        if pressed {
            self.buttons |= button as u16;
        } else {
            self.buttons &= !(button as u16);
        }
    }

    /// Returns true if the given button is pressed
    pub fn is_pressed(&self, button: XusbButton) -> bool {
        self.buttons & button as u16 != 0
    }

    /// Set both thumb stick axes of the left stick
    pub fn set_left_stick(&mut self, x: i16, y: i16) {
        self.thumb_lx = Integer::from_primitive(x);
        self.thumb_ly = Integer::from_primitive(y);
    }

    /// Set both thumb stick axes of the right stick
    pub fn set_right_stick(&mut self, x: i16, y: i16) {
        self.thumb_rx = Integer::from_primitive(x);
        self.thumb_ry = Integer::from_primitive(y);
    }
}

/// Inbound interrupt packet (device -> host) carrying the gamepad state
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "20")]
pub struct PackedInputPacket {
    // byte 0
    #[packed_field(bytes = "0")]
    pub message_type: u8, // Always 0x00
    // byte 1
    #[packed_field(bytes = "1")]
    pub length: u8, // Always 0x14
    // byte 2-13
    #[packed_field(bytes = "2..=13")]
    pub report: XusbReport,
    // byte 14-19
    #[packed_field(bytes = "14..=19")]
    pub _reserved: [u8; 6],
}

impl PackedInputPacket {
    pub fn new(report: XusbReport) -> Self {
        Self {
            message_type: 0x00,
            length: INPUT_PACKET_SIZE as u8,
            report,
            _reserved: [0; 6],
        }
    }
}

impl Default for PackedInputPacket {
    fn default() -> Self {
        Self::new(XusbReport::default())
    }
}

/// Rumble packet (host -> device)
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "8")]
pub struct PackedRumblePacket {
    #[packed_field(bytes = "0")]
    pub message_type: u8, // Always 0x00
    #[packed_field(bytes = "1")]
    pub length: u8, // Always 0x08
    #[packed_field(bytes = "2")]
    pub _unk_2: u8,
    #[packed_field(bytes = "3")]
    pub large_motor: u8,
    #[packed_field(bytes = "4")]
    pub small_motor: u8,
    #[packed_field(bytes = "5..=7")]
    pub _unk_5: [u8; 3],
}

/// LED packet (host -> device)
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "3")]
pub struct PackedLedPacket {
    #[packed_field(bytes = "0")]
    pub message_type: u8, // Always 0x01
    #[packed_field(bytes = "1")]
    pub length: u8, // Always 0x03
    #[packed_field(bytes = "2")]
    pub pattern: u8,
}

impl PackedLedPacket {
    /// Translate the LED animation pattern into the player LED index (0-3).
    /// Patterns that do not select a single player LED return `None`.
    pub fn led_number(&self) -> Option<u8> {
        match self.pattern {
            // Flash then on
            0x02..=0x05 => Some(self.pattern - 0x02),
            // On
            0x06..=0x09 => Some(self.pattern - 0x06),
            _ => None,
        }
    }
}
