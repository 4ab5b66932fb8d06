//! Packet layouts of the Xbox One Gaming Input Protocol (GIP)

use packed_struct::prelude::*;

/// Size of the caller supplied [XgipReport] payload
pub const XGIP_PAYLOAD_SIZE: usize = 14;
/// Size of the GIP packet header
pub const GIP_HEADER_SIZE: usize = 4;

/// Maximum value of an analog trigger
pub const TRIGGER_MAX: u16 = 1023;

/// Known GIP command ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GipCommand {
    Announce = 0x02,
    Status = 0x03,
    Metadata = 0x04,
    Guide = 0x07,
    Rumble = 0x09,
    Input = 0x20,
}

impl GipCommand {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x02 => Some(Self::Announce),
            0x03 => Some(Self::Status),
            0x04 => Some(Self::Metadata),
            0x07 => Some(Self::Guide),
            0x09 => Some(Self::Rumble),
            0x20 => Some(Self::Input),
            _ => None,
        }
    }
}

/// Button bits of [XgipReport::buttons]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XgipButton {
    Sync = 0x0001,
    Menu = 0x0004,
    View = 0x0008,
    A = 0x0010,
    B = 0x0020,
    X = 0x0040,
    Y = 0x0080,
    DPadUp = 0x0100,
    DPadDown = 0x0200,
    DPadLeft = 0x0400,
    DPadRight = 0x0800,
    LeftShoulder = 0x1000,
    RightShoulder = 0x2000,
    LeftThumb = 0x4000,
    RightThumb = 0x8000,
}

/// Gamepad state of an Xbox One controller as supplied by the controlling
/// process.
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "14")]
pub struct XgipReport {
    #[packed_field(bytes = "0..=1", endian = "lsb")]
    pub buttons: u16,
    #[packed_field(bytes = "2..=3", endian = "lsb")]
    pub left_trigger: u16,
    #[packed_field(bytes = "4..=5", endian = "lsb")]
    pub right_trigger: u16,
    #[packed_field(bytes = "6..=7", endian = "lsb")]
    pub thumb_lx: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "8..=9", endian = "lsb")]
    pub thumb_ly: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "10..=11", endian = "lsb")]
    pub thumb_rx: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "12..=13", endian = "lsb")]
    pub thumb_ry: Integer<i16, packed_bits::Bits<16>>,
}

impl XgipReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear the given button
    pub fn set_button(&mut self, button: XgipButton, pressed: bool) {
        if pressed {
            self.buttons |= button as u16;
        } else {
            self.buttons &= !(button as u16);
        }
    }

    /// Returns true if the given button is pressed
    pub fn is_pressed(&self, button: XgipButton) -> bool {
        self.buttons & button as u16 != 0
    }

    /// Set both triggers. Values are clamped to [TRIGGER_MAX].
    pub fn set_triggers(&mut self, left: u16, right: u16) {
        self.left_trigger = left.min(TRIGGER_MAX);
        self.right_trigger = right.min(TRIGGER_MAX);
    }

    pub fn set_left_stick(&mut self, x: i16, y: i16) {
        self.thumb_lx = Integer::from_primitive(x);
        self.thumb_ly = Integer::from_primitive(y);
    }

    pub fn set_right_stick(&mut self, x: i16, y: i16) {
        self.thumb_rx = Integer::from_primitive(x);
        self.thumb_ry = Integer::from_primitive(y);
    }
}

/// Input packet (device -> host) wrapping an [XgipReport]
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "18")]
pub struct PackedInputPacket {
    #[packed_field(bytes = "0")]
    pub command: u8,
    #[packed_field(bytes = "1")]
    pub options: u8,
    #[packed_field(bytes = "2")]
    pub sequence: u8,
    #[packed_field(bytes = "3")]
    pub length: u8,
    #[packed_field(bytes = "4..=17")]
    pub report: XgipReport,
}

impl PackedInputPacket {
    pub fn new(sequence: u8, report: XgipReport) -> Self {
        Self {
            command: GipCommand::Input as u8,
            options: 0x00,
            sequence,
            length: XGIP_PAYLOAD_SIZE as u8,
            report,
        }
    }
}

/// Rumble packet (host -> device)
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "10")]
pub struct PackedRumblePacket {
    #[packed_field(bytes = "0")]
    pub command: u8,
    #[packed_field(bytes = "1")]
    pub options: u8,
    #[packed_field(bytes = "2")]
    pub sequence: u8,
    #[packed_field(bytes = "3")]
    pub length: u8,
    #[packed_field(bytes = "4")]
    pub _unkn_0: u8,
    #[packed_field(bytes = "5")]
    pub motor_mask: u8,
    #[packed_field(bytes = "6")]
    pub left_trigger_motor: u8,
    #[packed_field(bytes = "7")]
    pub right_trigger_motor: u8,
    #[packed_field(bytes = "8")]
    pub large_motor: u8,
    #[packed_field(bytes = "9")]
    pub small_motor: u8,
}
