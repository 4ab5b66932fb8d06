use std::error::Error;

use packed_struct::prelude::*;

use crate::{
    drivers::ds4::{
        descriptor::DS4_DESCRIPTOR_SIZE,
        driver::{Driver, PID, VID},
        hid_report::{
            Direction, Ds4Button, Ds4Report, Ds4ReportEx, Ds4SpecialButton, TouchFingerData,
            INPUT_REPORT_SIZE,
        },
    },
    target::{LightbarColor, Notification},
};

#[tokio::test]
async fn test_ds4_input_report() -> Result<(), Box<dyn Error>> {
    let mut report = Ds4Report::new();
    report.set_button(Ds4Button::Cross, true);
    report.set_special(Ds4SpecialButton::Ps, true);
    report.trigger_l = 0xFF;
    println!("Report: {report}");

    let mut driver = Driver::new(VID, PID);
    let packet = driver.encode(&report)?;
    assert_eq!(packet.len(), INPUT_REPORT_SIZE);
    assert_eq!(
        packet[..10].to_vec(),
        vec![0x01, 0x80, 0x80, 0x80, 0x80, 0x28, 0x00, 0x01, 0xFF, 0x00]
    );
    // Both touch fingers are reported as lifted
    assert_eq!(packet[35], 0x80);
    assert_eq!(packet[39], 0x80);

    // The report counter advances with every update
    let packet = driver.encode(&report)?;
    assert_eq!(packet[7], 0x05);
    let packet = driver.encode(&report)?;
    assert_eq!(packet[7], 0x09);

    Ok(())
}

#[tokio::test]
async fn test_ds4_dpad() -> Result<(), Box<dyn Error>> {
    let mut report = Ds4Report::new();
    assert_eq!(report.dpad(), Direction::None);

    report.set_button(Ds4Button::Triangle, true);
    report.set_dpad(Direction::from_buttons(true, false, false, true));
    assert_eq!(report.dpad(), Direction::NorthEast);
    assert!(report.is_pressed(Ds4Button::Triangle));

    report.set_dpad(Direction::from_buttons(true, true, true, false));
    assert_eq!(report.dpad(), Direction::West);

    report.set_dpad(Direction::None);
    assert_eq!(report.buttons, Ds4Button::Triangle as u16 | 0x08);

    Ok(())
}

#[tokio::test]
async fn test_ds4_report_ex() -> Result<(), Box<dyn Error>> {
    let mut finger = TouchFingerData::default();
    assert!(!finger.is_touching());
    finger.set_touching(true, 3);
    finger.set_x(1919);
    finger.set_y(942);
    assert!(finger.is_touching());
    assert_eq!(finger.get_x(), 1919);
    assert_eq!(finger.get_y(), 942);

    let mut report = Ds4ReportEx::default();
    report.timestamp = 0x1234;
    report.gyro_x = Integer::from_primitive(-2);
    report.touch_packets = 1;
    report.current_touch.packet_counter = 7;
    report.current_touch.fingers[0] = finger;

    let packed = report.pack()?;
    assert_eq!(packed.len(), 63);
    assert_eq!(packed[9..11].to_vec(), vec![0x34, 0x12]);
    assert_eq!(packed[12..14].to_vec(), vec![0xFE, 0xFF]);
    assert_eq!(packed[32], 1);
    assert_eq!(packed[33], 7);
    assert_eq!(packed[34], 3);

    let unpacked = Ds4ReportEx::unpack(&packed)?;
    assert_eq!(unpacked.current_touch.fingers[0].get_x(), 1919);

    Ok(())
}

#[tokio::test]
async fn test_ds4_output_state() -> Result<(), Box<dyn Error>> {
    let mut driver = Driver::new(VID, PID);

    let notification =
        driver.handle_output(&[0x05, 0x07, 0x00, 0x00, 0x40, 0x80, 0xFF, 0x00, 0x10, 0x00]);
    assert_eq!(
        notification,
        Some(Notification::DualShock4 {
            large_motor: 0x80,
            small_motor: 0x40,
            lightbar: LightbarColor::new(0xFF, 0x00, 0x10),
        })
    );

    // Wrong report id and short reports are ignored
    assert_eq!(driver.handle_output(&[0x11, 0x00, 0x00]), None);
    assert_eq!(driver.handle_output(&[0x05, 0x07, 0x00]), None);

    let descriptor = driver.device_descriptor()?;
    assert_eq!(descriptor[8..12].to_vec(), vec![0x4C, 0x05, 0xC4, 0x05]);
    let config = driver.configuration_descriptor();
    assert_eq!(config.len(), DS4_DESCRIPTOR_SIZE);
    assert_eq!(config[2] as usize, DS4_DESCRIPTOR_SIZE);

    Ok(())
}

#[tokio::test]
async fn test_ds4_partial_output_keeps_state() -> Result<(), Box<dyn Error>> {
    let mut driver = Driver::new(VID, PID);

    // Lightbar only, the motors stay off
    let notification =
        driver.handle_output(&[0x05, 0x02, 0x00, 0x00, 0x55, 0x66, 0xFF, 0x00, 0x00]);
    assert_eq!(
        notification,
        Some(Notification::DualShock4 {
            large_motor: 0x00,
            small_motor: 0x00,
            lightbar: LightbarColor::new(0xFF, 0x00, 0x00),
        })
    );

    // Rumble only, the lightbar keeps its color
    let notification =
        driver.handle_output(&[0x05, 0x01, 0x00, 0x00, 0x10, 0x20, 0x00, 0x00, 0x00]);
    assert_eq!(
        notification,
        Some(Notification::DualShock4 {
            large_motor: 0x20,
            small_motor: 0x10,
            lightbar: LightbarColor::new(0xFF, 0x00, 0x00),
        })
    );

    // Reports without either flag change nothing
    assert_eq!(
        driver.handle_output(&[0x05, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0xFF, 0x00]),
        None
    );
    let notification =
        driver.handle_output(&[0x05, 0x01, 0x00, 0x00, 0x10, 0x20, 0x00, 0x00, 0x00]);
    assert_eq!(
        notification.map(|n| (n.large_motor(), n.small_motor())),
        Some((0x20, 0x10))
    );

    Ok(())
}
