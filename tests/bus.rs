use std::{error::Error, time::Duration};

use padbus::{
    bus::{client::BusClient, device::ChildDevice, notification::DeliveryOutcome, Bus, BusEvent},
    client::{target::Target, Client},
    config::{BusConfig, XgipConfig},
    drivers::{
        xgip::{
            driver::XGIP_REPORT_SIZE,
            hid_report::{GipCommand, XgipButton, XgipReport},
            init::XGIP_SYS_INIT_PACKETS,
        },
        xusb::{
            driver::Driver as XusbDriver,
            hid_report::{XusbButton, XusbReport},
        },
    },
    error,
    target::{Notification, TargetState, TargetType},
};
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
    time::timeout,
};

const WAIT: Duration = Duration::from_secs(2);

fn start_bus(config: BusConfig) -> (BusClient, broadcast::Receiver<BusEvent>, JoinHandle<()>) {
    let mut bus = Bus::new(config);
    let client = bus.client();
    let events = bus.subscribe();
    let task = tokio::spawn(async move {
        bus.run().await.expect("bus failed");
    });
    (client, events, task)
}

async fn device_at(bus: &BusClient, index: u32) -> Result<ChildDevice, Box<dyn Error>> {
    let device = bus.get_device(index).await?;
    Ok(device.ok_or(format!("no device in slot {index}"))?)
}

fn xusb_report(pressed: bool) -> XusbReport {
    let mut report = XusbReport::new();
    report.set_button(XusbButton::A, pressed);
    report
}

#[tokio::test]
async fn test_slots_assigned_lowest_free() -> Result<(), Box<dyn Error>> {
    let (bus, _events, _task) = start_bus(BusConfig::default());
    let client = Client::new(bus.clone());
    client.connect().await?;

    let a = Target::xbox360();
    let b = Target::dualshock4();
    client.add_target(&a).await?;
    client.add_target(&b).await?;
    assert_eq!(a.index()?, 0);
    assert_eq!(b.index()?, 1);

    client.remove_target(&a).await?;
    assert_eq!(a.state(), TargetState::Unplugged);
    let c = Target::xbox360();
    client.add_target(&c).await?;
    assert_eq!(c.index()?, 0);
    assert_eq!(bus.list_devices().await?.len(), 2);

    client.disconnect().await?;
    bus.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_no_free_slot() -> Result<(), Box<dyn Error>> {
    let config = BusConfig {
        max_targets: 1,
        ..Default::default()
    };
    let (bus, _events, _task) = start_bus(config);
    let client = Client::new(bus.clone());
    client.connect().await?;

    let a = Target::xbox360();
    let b = Target::xbox360();
    client.add_target(&a).await?;
    assert_eq!(client.add_target(&b).await, Err(error::Error::NoFreeSlot));
    assert_eq!(b.state(), TargetState::Unplugged);

    // The failed target can be added once a slot frees up
    client.remove_target(&a).await?;
    client.add_target(&b).await?;
    assert_eq!(b.index()?, 0);

    bus.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_cached_report_completes_next_transfer() -> Result<(), Box<dyn Error>> {
    let (bus, _events, _task) = start_bus(BusConfig::default());
    let client = Client::new(bus.clone());
    client.connect().await?;
    let target = Target::xbox360();
    client.add_target(&target).await?;
    let device = device_at(&bus, target.index()?).await?;

    // No transfer pending, so the report is cached and the next one replaces it
    target.update(xusb_report(false))?;
    target.update(xusb_report(true))?;

    let packet = timeout(WAIT, device.submit_interrupt_in()).await??;
    let driver = XusbDriver::new(0x045e, 0x028e);
    assert_eq!(packet, driver.encode(&xusb_report(true))?);

    // The cache was consumed
    let mut request = device.submit_interrupt_in();
    assert_eq!(request.try_complete(), None);

    bus.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_transfers_complete_in_order() -> Result<(), Box<dyn Error>> {
    let (bus, _events, _task) = start_bus(BusConfig::default());
    let client = Client::new(bus.clone());
    client.connect().await?;
    let target = Target::xbox360();
    client.add_target(&target).await?;
    let device = device_at(&bus, target.index()?).await?;

    let first = device.submit_interrupt_in();
    let second = device.submit_interrupt_in();
    target.update(xusb_report(true))?;
    target.update(xusb_report(false))?;

    let driver = XusbDriver::new(0x045e, 0x028e);
    assert_eq!(timeout(WAIT, first).await??, driver.encode(&xusb_report(true))?);
    assert_eq!(timeout(WAIT, second).await??, driver.encode(&xusb_report(false))?);

    bus.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_removal_cancels_pending_requests() -> Result<(), Box<dyn Error>> {
    let (bus, mut events, _task) = start_bus(BusConfig::default());
    let client = Client::new(bus.clone());
    client.connect().await?;
    let target = Target::dualshock4();
    client.add_target(&target).await?;
    let device = device_at(&bus, target.index()?).await?;
    client.register_notification(&target, |_, _| ())?;

    let first = device.submit_interrupt_in();
    let second = device.submit_interrupt_in();
    let notification = device.submit_notification();
    client.remove_target(&target).await?;

    assert!(timeout(WAIT, first).await?.is_err());
    assert!(timeout(WAIT, second).await?.is_err());
    assert!(timeout(WAIT, notification).await?.is_err());
    assert_eq!(device.state(), TargetState::Removed);
    assert_eq!(device.pending_requests(), (0, 0));

    // Requests submitted after removal are cancelled right away
    assert!(timeout(WAIT, device.submit_interrupt_in()).await?.is_err());
    assert_eq!(
        target.update(padbus::drivers::ds4::hid_report::Ds4Report::new()),
        Err(error::Error::TargetNotPluggedIn)
    );

    let mut arrived = 0;
    let mut removed = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            BusEvent::DeviceArrived { .. } => arrived += 1,
            BusEvent::DeviceRemoved { .. } => removed += 1,
        }
    }
    assert_eq!((arrived, removed), (1, 1));

    bus.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_host_event_without_callback_discarded() -> Result<(), Box<dyn Error>> {
    let (bus, _events, _task) = start_bus(BusConfig::default());
    let client = Client::new(bus.clone());
    client.connect().await?;
    let target = Target::xbox360();
    client.add_target(&target).await?;
    let device = device_at(&bus, target.index()?).await?;

    let rumble = [0x00, 0x08, 0x00, 0xFF, 0x80, 0x00, 0x00, 0x00];
    assert_eq!(
        device.submit_interrupt_out(&rumble),
        Some(DeliveryOutcome::Discarded)
    );
    // Unknown packets carry no host event
    assert_eq!(device.submit_interrupt_out(&[0x42]), None);
    assert!(!device.has_notification());
    assert_eq!(
        device.deliver_event(Notification::Xbox360 {
            large_motor: 1,
            small_motor: 1,
            led_number: 1,
        }),
        DeliveryOutcome::Discarded
    );

    bus.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_host_events_reach_callback() -> Result<(), Box<dyn Error>> {
    let (bus, _events, _task) = start_bus(BusConfig::default());
    let client = Client::new(bus.clone());
    client.connect().await?;
    let target = Target::xbox360();
    client.add_target(&target).await?;
    let device = device_at(&bus, target.index()?).await?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let expected = target.clone();
    client.register_notification(&target, move |target, notification| {
        assert!(target.ptr_eq(&expected));
        let _ = tx.send(notification);
    })?;
    assert_eq!(
        client.register_notification(&target, |_, _| ()),
        Err(error::Error::CallbackAlreadyRegistered)
    );

    device.submit_interrupt_out(&[0x00, 0x08, 0x00, 0xFF, 0x80, 0x00, 0x00, 0x00]);
    let notification = timeout(WAIT, rx.recv()).await?.ok_or("callback dropped")?;
    assert_eq!(notification.large_motor(), 0xFF);
    assert_eq!(notification.small_motor(), 0x80);

    // LED packets carry the full state including the last rumble values
    device.submit_interrupt_out(&[0x01, 0x03, 0x06]);
    let notification = timeout(WAIT, rx.recv()).await?.ok_or("callback dropped")?;
    assert_eq!(
        notification,
        Notification::Xbox360 {
            large_motor: 0xFF,
            small_motor: 0x80,
            led_number: 0,
        }
    );

    assert!(device.has_notification());
    client.unregister_notification(&target)?;
    assert!(!device.has_notification());
    assert_eq!(
        client.unregister_notification(&target),
        Err(error::Error::CallbackNotFound)
    );

    bus.stop().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_register_single_winner() -> Result<(), Box<dyn Error>> {
    let (bus, _events, _task) = start_bus(BusConfig::default());
    let client = std::sync::Arc::new(Client::new(bus.clone()));
    client.connect().await?;
    let target = Target::xbox_one();
    client.add_target(&target).await?;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let client = client.clone();
        let target = target.clone();
        tasks.push(tokio::spawn(async move {
            client.register_notification(&target, |_, _| ())
        }));
    }
    let mut succeeded = 0;
    for task in tasks {
        match task.await? {
            Ok(_) => succeeded += 1,
            Err(e) => assert_eq!(e, error::Error::CallbackAlreadyRegistered),
        }
    }
    assert_eq!(succeeded, 1);

    bus.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_xgip_init_sequence() -> Result<(), Box<dyn Error>> {
    let config = BusConfig {
        xgip: XgipConfig {
            sys_init_period_ms: 1,
        },
        ..Default::default()
    };
    let (bus, _events, _task) = start_bus(config);
    let client = Client::new(bus.clone());
    client.connect().await?;
    let target = Target::xbox_one();
    client.add_target(&target).await?;
    let device = device_at(&bus, target.index()?).await?;

    assert_eq!(target.state(), TargetState::Enumerating);
    assert!(!device.is_sys_init_ready());
    assert_eq!(
        target.update(XgipReport::new()),
        Err(error::Error::TargetNotPluggedIn)
    );

    let mut packets = Vec::new();
    for _ in 0..XGIP_SYS_INIT_PACKETS {
        packets.push(timeout(WAIT, device.submit_interrupt_in()).await??);
    }
    assert_eq!(packets[0][0], GipCommand::Announce as u8);
    assert_eq!(packets[1][0], GipCommand::Status as u8);
    for (i, packet) in packets.iter().enumerate() {
        assert_eq!(packet[2] as usize, i + 1, "wrong sequence number");
    }

    let mut state = device.subscribe_state();
    timeout(WAIT, state.wait_for(|state| *state == TargetState::Plugged)).await??;
    assert!(device.is_sys_init_ready());

    let mut report = XgipReport::new();
    report.set_button(XgipButton::A, true);
    target.update(report)?;
    let packet = timeout(WAIT, device.submit_interrupt_in()).await??;
    assert_eq!(packet.len(), XGIP_REPORT_SIZE);
    assert_eq!(packet[0], GipCommand::Input as u8);

    bus.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_descriptors() -> Result<(), Box<dyn Error>> {
    let (bus, _events, _task) = start_bus(BusConfig::default());
    let client = Client::new(bus.clone());
    client.connect().await?;
    let ds4 = Target::dualshock4();
    ds4.set_vendor_id(0x1234)?;
    client.add_target(&ds4).await?;
    let device = device_at(&bus, ds4.index()?).await?;
    assert_eq!(device.target_type(), TargetType::DualShock4);
    assert_eq!(device.vendor_id(), 0x1234);

    let descriptor = device.device_descriptor()?;
    assert_eq!(descriptor.len(), 18);
    assert_eq!(&descriptor[8..10], &[0x34, 0x12]);

    let mut small = [0u8; 4];
    assert!(device.read_configuration_descriptor(&mut small).is_err());
    let mut buf = [0u8; 0x100];
    let size = device.read_configuration_descriptor(&mut buf)?;
    assert_eq!(size, device.configuration_descriptor().len());
    assert!(device.select_configuration(0x100).is_err());
    assert!(device.interface_guids().is_empty());

    bus.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_stop_removes_all_devices() -> Result<(), Box<dyn Error>> {
    let (bus, _events, task) = start_bus(BusConfig::default());
    let client = Client::new(bus.clone());
    client.connect().await?;
    let target = Target::xbox360();
    client.add_target(&target).await?;
    let device = device_at(&bus, target.index()?).await?;
    let request = device.submit_interrupt_in();

    bus.stop().await?;
    timeout(WAIT, task).await??;

    assert!(timeout(WAIT, request).await?.is_err());
    assert_eq!(target.state(), TargetState::Unplugged);
    assert!(bus.is_closed());
    assert_eq!(
        bus.list_devices().await.map_err(error::Error::from).err(),
        Some(error::Error::BusNotFound)
    );
    Ok(())
}

/// Read inbound transfers until the last frame arrives. Every packet must be
/// one of the given ones and frames must never go backwards.
async fn read_frames(device: ChildDevice, packets: Vec<Vec<u8>>) -> Result<(), String> {
    let mut last = 0;
    loop {
        let packet = device
            .submit_interrupt_in()
            .await
            .map_err(|e| e.to_string())?;
        let frame = packets
            .iter()
            .position(|p| *p == packet)
            .ok_or("received a packet of another target")?
            + 1;
        if frame <= last {
            return Err(format!("frame {frame} arrived after {last}"));
        }
        last = frame;
        if frame == packets.len() {
            return Ok(());
        }
    }
}

/// Receive host events until the last frame arrives. Events are tagged with
/// the marker of the target they were delivered to.
async fn listen_events(
    mut rx: mpsc::UnboundedReceiver<(bool, Notification)>,
    marker: u8,
    frames: u8,
) -> Result<(), String> {
    let mut last = 0;
    while let Some((same_target, notification)) = rx.recv().await {
        if !same_target {
            return Err("callback handed the wrong target".to_string());
        }
        if notification.small_motor() != marker {
            return Err(format!("received event of another target: {notification:?}"));
        }
        let frame = notification.large_motor();
        if frame <= last {
            return Err(format!("event {frame} arrived after {last}"));
        }
        last = frame;
        if frame == frames {
            return Ok(());
        }
    }
    Err("notification channel closed".to_string())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_targets_isolated() -> Result<(), Box<dyn Error>> {
    const FRAMES: u8 = 200;

    let (bus, _events, _task) = start_bus(BusConfig::default());
    let client = Client::new(bus.clone());
    client.connect().await?;

    let driver = XusbDriver::new(0x045e, 0x028e);
    let mut tasks = Vec::new();
    for marker in 0..2u8 {
        let target = Target::xbox360();
        client.add_target(&target).await?;
        let device = device_at(&bus, target.index()?).await?;

        // Each target moves a different stick axis so packets tell them apart
        let reports: Vec<XusbReport> = (1..=FRAMES)
            .map(|frame| {
                let mut report = XusbReport::new();
                match marker {
                    0 => report.set_left_stick(frame as i16, 0),
                    _ => report.set_left_stick(0, frame as i16),
                }
                report
            })
            .collect();
        let packets = reports
            .iter()
            .map(|report| driver.encode(report))
            .collect::<Result<Vec<_>, _>>()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let expected = target.clone();
        client.register_notification(&target, move |target, notification| {
            let _ = tx.send((target.ptr_eq(&expected), notification));
        })?;

        let reader = tokio::spawn(read_frames(device.clone(), packets));
        let listener = tokio::spawn(listen_events(rx, marker, FRAMES));

        let updater = tokio::spawn(async move {
            for report in reports {
                if let Err(e) = target.update(report) {
                    return Err(e);
                }
                tokio::task::yield_now().await;
            }
            Ok(())
        });

        let events = tokio::spawn(async move {
            for frame in 1..=FRAMES {
                device.deliver_event(Notification::Xbox360 {
                    large_motor: frame,
                    small_motor: marker,
                    led_number: 0,
                });
                tokio::task::yield_now().await;
            }
        });

        tasks.push((reader, listener, updater, events));
    }

    for (reader, listener, updater, events) in tasks {
        timeout(WAIT, updater).await???;
        timeout(WAIT, events).await??;
        timeout(WAIT, reader).await???;
        timeout(WAIT, listener).await???;
    }

    bus.stop().await?;
    Ok(())
}
