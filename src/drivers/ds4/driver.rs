use packed_struct::prelude::*;

use crate::target::{LightbarColor, Notification};

use super::{
    descriptor,
    hid_report::{
        Ds4Report, Ds4ReportEx, PackedInputDataReport, PackedOutputReport, OUTPUT_REPORT_MIN_SIZE,
        OUTPUT_REPORT_USB,
    },
};

// Hardware ID's
pub const VID: u16 = 0x054c;
pub const PID: u16 = 0x05c4;

/// Mask of the report counter stored in the upper six bits of the special
/// button byte.
const FRAME_COUNTER_MASK: u8 = 0xFC;

/// Encodes DualShock 4 state updates into USB input reports and tracks the
/// rumble and lightbar state written by the host.
#[derive(Debug, Clone)]
pub struct Driver {
    vendor_id: u16,
    product_id: u16,
    frame_counter: u8,
    large_motor: u8,
    small_motor: u8,
    lightbar: LightbarColor,
}

impl Driver {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
            frame_counter: 0,
            large_motor: 0,
            small_motor: 0,
            // The blue lightbar of a freshly connected controller
            lightbar: LightbarColor::new(0x00, 0x00, 0x40),
        }
    }

    /// Pack the given basic report into a USB input report. Motion and touch
    /// data are left neutral.
    pub fn encode(&mut self, report: &Ds4Report) -> Result<Vec<u8>, PackingError> {
        self.encode_ex(&Ds4ReportEx::from(*report))
    }

    /// Pack the given extended report into a USB input report
    pub fn encode_ex(&mut self, report: &Ds4ReportEx) -> Result<Vec<u8>, PackingError> {
        let mut state = *report;
        state.report.special =
            (state.report.special & !FRAME_COUNTER_MASK) | (self.frame_counter << 2);
        self.frame_counter = (self.frame_counter + 1) & 0x3F;

        let input = PackedInputDataReport::new(state);
        Ok(input.pack()?.to_vec())
    }

    /// Handle a host -> device output report. Only the parts enabled by the
    /// report flags are applied. Returns a notification carrying the full
    /// output state, or `None` if the report changed nothing.
    pub fn handle_output(&mut self, data: &[u8]) -> Option<Notification> {
        if *data.first()? != OUTPUT_REPORT_USB {
            return None;
        }
        let buf: &[u8; OUTPUT_REPORT_MIN_SIZE] = data.get(..OUTPUT_REPORT_MIN_SIZE)?.try_into().ok()?;
        let report = PackedOutputReport::unpack(buf).ok()?;
        if !report.enable_rumble && !report.enable_lightbar {
            log::trace!("Ignoring DS4 output report without rumble or lightbar flags");
            return None;
        }

        if report.enable_rumble {
            log::trace!(
                "Got DS4 rumble: large: {}, small: {}",
                report.large_motor,
                report.small_motor
            );
            self.large_motor = report.large_motor;
            self.small_motor = report.small_motor;
        }
        if report.enable_lightbar {
            log::trace!(
                "Got DS4 lightbar: #{:02x}{:02x}{:02x}",
                report.red,
                report.green,
                report.blue
            );
            self.lightbar = LightbarColor::new(report.red, report.green, report.blue);
        }

        Some(Notification::DualShock4 {
            large_motor: self.large_motor,
            small_motor: self.small_motor,
            lightbar: self.lightbar,
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
