//! The system initialization packets an XGIP child replays to the class
//! driver while it enumerates.
use super::descriptor::INTERFACE_GUIDS;
use super::hid_report::GipCommand;

/// Number of packets in the init sequence
pub const XGIP_SYS_INIT_PACKETS: usize = 0x0F;
/// Number of metadata chunks in the init sequence
pub const METADATA_CHUNKS: usize = 12;

/// Class name announced in the metadata
const DEVICE_CLASS_NAME: &str = "Windows.Xbox.Input.Gamepad";
/// Hardware address announced by the virtual controller
const DEVICE_ADDRESS: [u8; 6] = [0x7E, 0xED, 0x80, 0x9A, 0x56, 0x01];
const FIRMWARE_VERSION: [u8; 8] = [0x05, 0x00, 0x17, 0x00, 0xCE, 0x07, 0x00, 0x00];
const HARDWARE_VERSION: [u8; 8] = [0x01, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00];

// Option flags of metadata packets
const OPTION_FIRST_CHUNK: u8 = 0xF0;
const OPTION_CHUNK: u8 = 0xB0;
const OPTION_CHUNK_END: u8 = 0xA0;
const OPTION_SYSTEM: u8 = 0x20;

/// Build the announce packet
fn announce_packet(sequence: u8, vendor_id: u16, product_id: u16) -> Vec<u8> {
    let mut packet = vec![GipCommand::Announce as u8, OPTION_SYSTEM, sequence, 0x1C];
    packet.extend_from_slice(&DEVICE_ADDRESS);
    packet.extend_from_slice(&[0x00, 0x00]);
    packet.extend_from_slice(&vendor_id.to_le_bytes());
    packet.extend_from_slice(&product_id.to_le_bytes());
    packet.extend_from_slice(&FIRMWARE_VERSION);
    packet.extend_from_slice(&HARDWARE_VERSION);
    packet
}

/// Build the status packet
fn status_packet(sequence: u8) -> Vec<u8> {
    vec![
        GipCommand::Status as u8,
        OPTION_SYSTEM,
        sequence,
        0x04,
        0x83,
        0x05,
        0x00,
        0x00,
    ]
}

/// Returns the metadata blob describing the device interfaces
fn metadata(vendor_id: u16, product_id: u16) -> Vec<u8> {
    let mut blob = Vec::new();
    for guid in INTERFACE_GUIDS.iter() {
        blob.extend_from_slice(&guid.to_bytes());
    }
    blob.extend_from_slice(&vendor_id.to_le_bytes());
    blob.extend_from_slice(&product_id.to_le_bytes());
    blob.extend_from_slice(DEVICE_CLASS_NAME.as_bytes());
    blob
}

/// Build the complete init sequence for a device with the given hardware ids
pub fn sys_init_packets(vendor_id: u16, product_id: u16) -> Vec<Vec<u8>> {
    let mut packets = Vec::with_capacity(XGIP_SYS_INIT_PACKETS);
    let mut sequence: u8 = 1;

    packets.push(announce_packet(sequence, vendor_id, product_id));
    sequence += 1;
    packets.push(status_packet(sequence));
    sequence += 1;

    // Split the metadata into evenly sized chunks. The first chunks carry
    // the remainder.
    let blob = metadata(vendor_id, product_id);
    let base = blob.len() / METADATA_CHUNKS;
    let remainder = blob.len() % METADATA_CHUNKS;
    let mut offset = 0;
    for i in 0..METADATA_CHUNKS {
        let size = base + usize::from(i < remainder);
        let chunk = &blob[offset..offset + size];
        let option = if i == 0 {
            OPTION_FIRST_CHUNK
        } else {
            OPTION_CHUNK
        };
        let mut packet = vec![
            GipCommand::Metadata as u8,
            option,
            sequence,
            (chunk.len() + 2) as u8,
        ];
        packet.extend_from_slice(&(offset as u16).to_le_bytes());
        packet.extend_from_slice(chunk);
        packets.push(packet);

        offset += size;
        sequence += 1;
    }

    let mut terminator = vec![GipCommand::Metadata as u8, OPTION_CHUNK_END, sequence, 0x02];
    terminator.extend_from_slice(&(blob.len() as u16).to_le_bytes());
    packets.push(terminator);

    packets
}

/// Finite, non-restartable generator of init packets. Each packet is handed
/// out exactly once.
#[derive(Debug)]
pub struct InitSequence {
    packets: std::vec::IntoIter<Vec<u8>>,
    total: usize,
}

impl InitSequence {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        let packets = sys_init_packets(vendor_id, product_id);
        Self {
            total: packets.len(),
            packets: packets.into_iter(),
        }
    }

    /// Total number of packets in the sequence
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of packets not yet handed out
    pub fn remaining(&self) -> usize {
        self.packets.len()
    }

    /// Returns true once every packet has been handed out
    pub fn is_exhausted(&self) -> bool {
        self.packets.len() == 0
    }
}

impl Iterator for InitSequence {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        self.packets.next()
    }
}
