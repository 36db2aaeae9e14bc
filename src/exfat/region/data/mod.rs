pub(crate) mod entry_type;
pub(crate) mod entryset;

use core::fmt::Debug;
use core::mem;

use crate::endian::Little as LE;
use entry_type::{EntryType, RawEntryType};
use entryset::RawEntry;

#[derive(Copy, Clone, Debug)]
#[repr(C)]
pub(crate) struct AllocationBitmap {
    pub entry_type: RawEntryType,
    pub bitmap_flags: u8,
    _reserved: [u8; 18],
    pub first_cluster: LE<u32>,
    pub data_length: LE<u64>,
}

impl AllocationBitmap {
    pub fn new(first_cluster: u32, data_length: u64) -> Self {
        Self {
            entry_type: RawEntryType::new(EntryType::AllocationBitmap, true),
            bitmap_flags: 0,
            _reserved: [0; 18],
            first_cluster: first_cluster.into(),
            data_length: data_length.into(),
        }
    }

    pub fn to_bytes(self) -> RawEntry {
        unsafe { mem::transmute(self) }
    }
}

#[derive(Copy, Clone, Debug)]
#[repr(C)]
pub(crate) struct UpcaseTable {
    pub entry_type: RawEntryType,
    _reserved1: [u8; 3],
    pub table_checksum: LE<u32>,
    _reserved2: [u8; 12],
    pub first_cluster: LE<u32>,
    pub data_length: LE<u64>,
}

impl UpcaseTable {
    pub fn new(table_checksum: u32, first_cluster: u32, data_length: u64) -> Self {
        Self {
            entry_type: RawEntryType::new(EntryType::UpcaseTable, true),
            _reserved1: [0; 3],
            table_checksum: table_checksum.into(),
            _reserved2: [0; 12],
            first_cluster: first_cluster.into(),
            data_length: data_length.into(),
        }
    }

    pub fn to_bytes(self) -> RawEntry {
        unsafe { mem::transmute(self) }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub(crate) struct VolumeLabel {
    pub entry_type: RawEntryType,
    pub character_count: u8,
    pub volume_label: [LE<u16>; 11],
    _reserved: [u8; 8],
}

impl VolumeLabel {
    pub fn new(label: &heapless::String<11>) -> Self {
        let mut volume_label = [LE::default(); 11];
        let mut character_count = 0;
        for (slot, unit) in volume_label.iter_mut().zip(label.encode_utf16()) {
            *slot = unit.into();
            character_count += 1;
        }
        Self {
            entry_type: RawEntryType::new(EntryType::VolumeLabel, true),
            character_count,
            volume_label,
            _reserved: [0; 8],
        }
    }

    pub fn to_bytes(self) -> RawEntry {
        unsafe { mem::transmute(self) }
    }
}
