//! Structures derived from the great work of the community of the Game Controller
//! Collective Wiki.
//! Source: https://controllers.fandom.com/wiki/Sony_DualShock_4

use packed_struct::prelude::*;

/// Size of the caller supplied [Ds4Report]
pub const DS4_REPORT_SIZE: usize = 9;
/// Size of the caller supplied [Ds4ReportEx]
pub const DS4_REPORT_EX_SIZE: usize = 63;
/// Size of the USB input report sent to the class driver
pub const INPUT_REPORT_SIZE: usize = 64;
/// Report ID of the USB input report
pub const INPUT_REPORT_USB: u8 = 0x01;
/// Report ID of the USB output report
pub const OUTPUT_REPORT_USB: u8 = 0x05;
/// Minimum size of an output report that carries rumble and lightbar data
pub const OUTPUT_REPORT_MIN_SIZE: usize = 9;

/// Directions of the D-pad stored in the low nibble of [Ds4Report::buttons]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    North = 0,
    NorthEast = 1,
    East = 2,
    SouthEast = 3,
    South = 4,
    SouthWest = 5,
    West = 6,
    NorthWest = 7,
    #[default]
    None = 8,
}

impl Direction {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::North,
            1 => Self::NorthEast,
            2 => Self::East,
            3 => Self::SouthEast,
            4 => Self::South,
            5 => Self::SouthWest,
            6 => Self::West,
            7 => Self::NorthWest,
            _ => Self::None,
        }
    }

    /// Build a hat direction from individual D-pad button states
    pub fn from_buttons(up: bool, down: bool, left: bool, right: bool) -> Self {
        match (up && !down, down && !up, left && !right, right && !left) {
            (true, _, false, true) => Self::NorthEast,
            (true, _, true, false) => Self::NorthWest,
            (true, _, false, false) => Self::North,
            (_, true, false, true) => Self::SouthEast,
            (_, true, true, false) => Self::SouthWest,
            (_, true, false, false) => Self::South,
            (false, false, true, _) => Self::West,
            (false, false, _, true) => Self::East,
            _ => Self::None,
        }
    }
}

/// Button bits of [Ds4Report::buttons]. The low nibble holds the D-pad
/// [Direction].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ds4Button {
    Square = 1 << 4,
    Cross = 1 << 5,
    Circle = 1 << 6,
    Triangle = 1 << 7,
    ShoulderLeft = 1 << 8,
    ShoulderRight = 1 << 9,
    TriggerLeft = 1 << 10,
    TriggerRight = 1 << 11,
    Share = 1 << 12,
    Options = 1 << 13,
    ThumbLeft = 1 << 14,
    ThumbRight = 1 << 15,
}

/// Bits of [Ds4Report::special]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ds4SpecialButton {
    Ps = 1 << 0,
    Touchpad = 1 << 1,
}

/// Gamepad state of a DualShock 4 as supplied by the controlling process
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "9")]
pub struct Ds4Report {
    #[packed_field(bytes = "0")]
    pub thumb_lx: u8,
    #[packed_field(bytes = "1")]
    pub thumb_ly: u8,
    #[packed_field(bytes = "2")]
    pub thumb_rx: u8,
    #[packed_field(bytes = "3")]
    pub thumb_ry: u8,
    #[packed_field(bytes = "4..=5", endian = "lsb")]
    pub buttons: u16,
    #[packed_field(bytes = "6")]
    pub special: u8,
    #[packed_field(bytes = "7")]
    pub trigger_l: u8,
    #[packed_field(bytes = "8")]
    pub trigger_r: u8,
}

impl Default for Ds4Report {
    fn default() -> Self {
        Self {
            thumb_lx: 0x80,
            thumb_ly: 0x80,
            thumb_rx: 0x80,
            thumb_ry: 0x80,
            buttons: Direction::None as u16,
            special: 0,
            trigger_l: 0,
            trigger_r: 0,
        }
    }
}

impl Ds4Report {
    /// Return a new neutral report
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear the given button
    pub fn set_button(&mut self, button: Ds4Button, pressed: bool) {
        if pressed {
            self.buttons |= button as u16;
        } else {
            self.buttons &= !(button as u16);
        }
    }

    /// Returns true if the given button is pressed
    pub fn is_pressed(&self, button: Ds4Button) -> bool {
        self.buttons & button as u16 != 0
    }

    /// Set or clear the given special button
    pub fn set_special(&mut self, button: Ds4SpecialButton, pressed: bool) {
        if pressed {
            self.special |= button as u8;
        } else {
            self.special &= !(button as u8);
        }
    }

    /// Set the D-pad direction
    pub fn set_dpad(&mut self, direction: Direction) {
        self.buttons = (self.buttons & !0x000F) | direction as u16;
    }

    /// Returns the D-pad direction
    pub fn dpad(&self) -> Direction {
        Direction::from_u8((self.buttons & 0x000F) as u8)
    }
}

/// A single finger of a touch packet
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "4")]
pub struct TouchFingerData {
    // byte 0
    // High bit is set when the finger is NOT touching, the rest is the tracking number.
    #[packed_field(bytes = "0")]
    pub context: u8,
    // byte 1
    #[packed_field(bytes = "1")]
    pub x_lo: u8,
    // byte 2
    #[packed_field(bits = "16..=19")]
    pub y_lo: Integer<u8, packed_bits::Bits<4>>,
    #[packed_field(bits = "20..=23")]
    pub x_hi: Integer<u8, packed_bits::Bits<4>>,
    // byte 3
    #[packed_field(bytes = "3")]
    pub y_hi: u8,
}

impl Default for TouchFingerData {
    fn default() -> Self {
        Self {
            context: 0x80,
            x_lo: Default::default(),
            y_lo: Default::default(),
            x_hi: Default::default(),
            y_hi: Default::default(),
        }
    }
}

impl TouchFingerData {
    pub fn is_touching(&self) -> bool {
        self.context & 0x80 == 0
    }

    /// Mark the finger as touching with the given tracking number, or as
    /// lifted.
    pub fn set_touching(&mut self, touching: bool, tracking_num: u8) {
        let tracking_num = tracking_num & 0x7F;
        self.context = if touching {
            tracking_num
        } else {
            0x80 | tracking_num
        };
    }

    pub fn get_x(&self) -> u16 {
        let x_hi = self.x_hi.to_primitive() as u16;
        let x_hi = x_hi.rotate_left(8);
        x_hi | self.x_lo as u16
    }

    pub fn get_y(&self) -> u16 {
        let y_lo = self.y_lo.to_primitive() as u16;
        let y_hi = (self.y_hi as u16).rotate_left(4);
        y_hi | y_lo
    }

    pub fn set_x(&mut self, x_raw: u16) {
        self.x_lo = (x_raw & 0x00FF) as u8;
        self.x_hi = Integer::from_primitive((x_raw & 0x0F00).rotate_right(8) as u8);
    }

    pub fn set_y(&mut self, y_raw: u16) {
        self.y_lo = Integer::from_primitive((y_raw & 0x000F) as u8);
        self.y_hi = (y_raw & 0x0FF0).rotate_right(4) as u8;
    }
}

/// A touch packet of up to two fingers
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "9")]
pub struct TouchPacket {
    #[packed_field(bytes = "0")]
    pub packet_counter: u8,
    #[packed_field(bytes = "1..=8", element_size_bytes = "4")]
    pub fingers: [TouchFingerData; 2],
}

/// Extended DualShock 4 state including motion and touch data as supplied by
/// the controlling process.
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "63")]
pub struct Ds4ReportEx {
    // byte 0-8
    #[packed_field(bytes = "0..=8")]
    pub report: Ds4Report,

    // byte 9-11
    #[packed_field(bytes = "9..=10", endian = "lsb")]
    pub timestamp: u16,
    #[packed_field(bytes = "11")]
    pub battery_temperature: u8,

    // byte 12-23
    #[packed_field(bytes = "12..=13", endian = "lsb")]
    pub gyro_x: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "14..=15", endian = "lsb")]
    pub gyro_y: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "16..=17", endian = "lsb")]
    pub gyro_z: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "18..=19", endian = "lsb")]
    pub accel_x: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "20..=21", endian = "lsb")]
    pub accel_y: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "22..=23", endian = "lsb")]
    pub accel_z: Integer<i16, packed_bits::Bits<16>>,

    // byte 24-31
    #[packed_field(bytes = "24..=28")]
    pub _unkn_0: [u8; 5],
    #[packed_field(bytes = "29")]
    pub battery_level: u8,
    #[packed_field(bytes = "30..=31")]
    pub _unkn_1: [u8; 2],

    // byte 32-59
    #[packed_field(bytes = "32")]
    pub touch_packets: u8,
    #[packed_field(bytes = "33..=41")]
    pub current_touch: TouchPacket,
    #[packed_field(bytes = "42..=59", element_size_bytes = "9")]
    pub previous_touch: [TouchPacket; 2],

    // byte 60-62
    #[packed_field(bytes = "60..=62")]
    pub _unkn_2: [u8; 3],
}

impl Default for Ds4ReportEx {
    fn default() -> Self {
        Self {
            report: Default::default(),
            timestamp: Default::default(),
            battery_temperature: Default::default(),
            gyro_x: Default::default(),
            gyro_y: Default::default(),
            gyro_z: Default::default(),
            accel_x: Default::default(),
            accel_y: Default::default(),
            accel_z: Default::default(),
            _unkn_0: Default::default(),
            // Cable connected, fully charged
            battery_level: 0x1B,
            _unkn_1: Default::default(),
            touch_packets: Default::default(),
            current_touch: Default::default(),
            previous_touch: Default::default(),
            _unkn_2: Default::default(),
        }
    }
}

impl From<Ds4Report> for Ds4ReportEx {
    fn from(report: Ds4Report) -> Self {
        Self {
            report,
            ..Default::default()
        }
    }
}

/// USB input report (device -> host)
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "64")]
pub struct PackedInputDataReport {
    // byte 0
    #[packed_field(bytes = "0")]
    pub report_id: u8, // Report ID (always 0x01)

    // byte 1-63
    #[packed_field(bytes = "1..=63")]
    pub state: Ds4ReportEx,
}

impl PackedInputDataReport {
    pub fn new(state: Ds4ReportEx) -> Self {
        Self {
            report_id: INPUT_REPORT_USB,
            state,
        }
    }
}

impl Default for PackedInputDataReport {
    fn default() -> Self {
        Self::new(Ds4ReportEx::default())
    }
}

/// USB output report (host -> device)
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "9")]
pub struct PackedOutputReport {
    // byte 0
    #[packed_field(bytes = "0")]
    pub report_id: u8, // Report ID (always 0x05)

    // byte 1
    #[packed_field(bits = "8..=12")]
    pub _unkn_flags: Integer<u8, packed_bits::Bits<5>>,
    #[packed_field(bits = "13")]
    pub enable_flash: bool,
    #[packed_field(bits = "14")]
    pub enable_lightbar: bool,
    #[packed_field(bits = "15")]
    pub enable_rumble: bool,

    // byte 2-3
    #[packed_field(bytes = "2..=3")]
    pub _unkn_2: [u8; 2],

    // byte 4-5
    #[packed_field(bytes = "4")]
    pub small_motor: u8,
    #[packed_field(bytes = "5")]
    pub large_motor: u8,

    // byte 6-8
    #[packed_field(bytes = "6")]
    pub red: u8,
    #[packed_field(bytes = "7")]
    pub green: u8,
    #[packed_field(bytes = "8")]
    pub blue: u8,
}
