use std::error::Error;

use packed_struct::prelude::*;

use crate::{
    drivers::xusb::{
        descriptor::{CONFIGURATION_DESCRIPTOR, XUSB_DESCRIPTOR_SIZE},
        driver::{Driver, PID, VID},
        hid_report::{XusbButton, XusbReport, INPUT_PACKET_SIZE},
    },
    target::Notification,
};

#[tokio::test]
async fn test_xusb_input_packet() -> Result<(), Box<dyn Error>> {
    let mut report = XusbReport::new();
    report.set_button(XusbButton::A, true);
    report.set_button(XusbButton::DPadLeft, true);
    report.left_trigger = 0x80;
    report.set_left_stick(-32768, 32767);
    println!("Report: {report}");

    let driver = Driver::new(VID, PID);
    let packet = driver.encode(&report)?;
    assert_eq!(packet.len(), INPUT_PACKET_SIZE);
    assert_eq!(
        packet[..10].to_vec(),
        vec![0x00, 0x14, 0x04, 0x10, 0x80, 0x00, 0x00, 0x80, 0xFF, 0x7F]
    );
    assert!(packet[14..].iter().all(|b| *b == 0));

    // Releasing a button only clears its bit
    report.set_button(XusbButton::A, false);
    assert!(!report.is_pressed(XusbButton::A));
    assert!(report.is_pressed(XusbButton::DPadLeft));

    Ok(())
}

#[tokio::test]
async fn test_xusb_output_state() -> Result<(), Box<dyn Error>> {
    let mut driver = Driver::new(VID, PID);

    // LED pattern "player 2 on"
    let notification = driver.handle_output(&[0x01, 0x03, 0x07]);
    assert_eq!(
        notification,
        Some(Notification::Xbox360 {
            large_motor: 0,
            small_motor: 0,
            led_number: 1
        })
    );

    // Rumble keeps the last LED number
    let notification = driver.handle_output(&[0x00, 0x08, 0x00, 0xFF, 0x40, 0x00, 0x00, 0x00]);
    assert_eq!(
        notification,
        Some(Notification::Xbox360 {
            large_motor: 0xFF,
            small_motor: 0x40,
            led_number: 1
        })
    );

    // Truncated and unknown packets are ignored
    assert_eq!(driver.handle_output(&[0x00, 0x08, 0x00]), None);
    assert_eq!(driver.handle_output(&[0x02, 0x03, 0x00]), None);
    assert_eq!(driver.handle_output(&[]), None);

    Ok(())
}

#[tokio::test]
async fn test_xusb_descriptors() -> Result<(), Box<dyn Error>> {
    let driver = Driver::new(0x1234, 0x5678);
    let descriptor = driver.device_descriptor()?;
    assert_eq!(descriptor.len(), 18);
    assert_eq!(descriptor[0], 0x12);
    assert_eq!(descriptor[8..12].to_vec(), vec![0x34, 0x12, 0x78, 0x56]);

    let config = driver.configuration_descriptor();
    assert_eq!(config.len(), XUSB_DESCRIPTOR_SIZE);
    // Total length field of the configuration must match the descriptor size
    assert_eq!(
        u16::from_le_bytes([CONFIGURATION_DESCRIPTOR[2], CONFIGURATION_DESCRIPTOR[3]]) as usize,
        XUSB_DESCRIPTOR_SIZE
    );

    let unpacked = XusbReport::unpack(&[0x00, 0x10, 0xFF, 0x00, 0, 0, 0, 0, 0, 0, 0, 0])?;
    assert!(unpacked.is_pressed(XusbButton::A));
    assert_eq!(unpacked.left_trigger, 0xFF);

    Ok(())
}
