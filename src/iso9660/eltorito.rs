// El Torito boot catalog

use core::mem;

use super::BLOCK_SIZE;
use crate::endian::Little as LE;

pub const HEADER_ID: u8 = 0x01;
pub const PLATFORM_X86: u8 = 0x00;
pub const BOOTABLE: u8 = 0x88;
pub const NO_EMULATION: u8 = 0x00;
pub const ENTRY_SIZE: usize = 32;

#[derive(Copy, Clone, Debug)]
#[repr(C, packed(1))]
pub(crate) struct ValidationEntry {
    pub header_id: u8,
    pub platform_id: u8,
    _reserved: LE<u16>,
    pub id_string: [u8; 24],
    pub checksum: LE<u16>,
    pub key: [u8; 2],
}

/// Sum of the little-endian words of one catalog entry
pub(crate) fn word_sum(entry: &[u8; ENTRY_SIZE]) -> u16 {
    entry.chunks(2).fold(0u16, |sum, word| sum.wrapping_add(u16::from_le_bytes([word[0], word[1]])))
}

impl ValidationEntry {
    pub fn new(platform_id: u8, id: &str) -> Self {
        let mut id_string = [0u8; 24];
        id_string.iter_mut().zip(id.bytes()).for_each(|(slot, b)| *slot = b);
        let mut entry = Self {
            header_id: HEADER_ID,
            platform_id,
            _reserved: LE::default(),
            id_string,
            checksum: LE::default(),
            key: hex!("55 AA"),
        };
        let checksum = 0u16.wrapping_sub(word_sum(&entry.to_bytes()));
        entry.checksum = checksum.into();
        entry
    }

    pub fn to_bytes(self) -> [u8; ENTRY_SIZE] {
        unsafe { mem::transmute(self) }
    }
}

#[derive(Copy, Clone, Debug)]
#[repr(C, packed(1))]
pub(crate) struct DefaultEntry {
    pub boot_indicator: u8,
    pub boot_media_type: u8,
    /// Zero selects the traditional 0x7C0 segment
    pub load_segment: LE<u16>,
    pub system_type: u8,
    _unused1: u8,
    /// Virtual 512-byte sectors loaded
    pub sector_count: LE<u16>,
    pub load_rba: LE<u32>,
    _unused2: [u8; 20],
}

impl DefaultEntry {
    pub fn no_emulation(load_rba: u32, sector_count: u16) -> Self {
        Self {
            boot_indicator: BOOTABLE,
            boot_media_type: NO_EMULATION,
            load_segment: LE::default(),
            system_type: 0,
            _unused1: 0,
            sector_count: sector_count.into(),
            load_rba: load_rba.into(),
            _unused2: [0; 20],
        }
    }

    pub fn to_bytes(self) -> [u8; ENTRY_SIZE] {
        unsafe { mem::transmute(self) }
    }
}

/// Catalog sector holding the validation entry followed by the default entry
pub(crate) fn boot_catalog(id: &str, load_rba: u32, sector_count: u16) -> [u8; BLOCK_SIZE] {
    let mut sector = [0u8; BLOCK_SIZE];
    sector[..ENTRY_SIZE].copy_from_slice(&ValidationEntry::new(PLATFORM_X86, id).to_bytes());
    sector[ENTRY_SIZE..2 * ENTRY_SIZE].copy_from_slice(&DefaultEntry::no_emulation(load_rba, sector_count).to_bytes());
    sector
}
