use core::mem;

use bitfield::bitfield;

use crate::endian::Little as LE;
use crate::timestamp::Timestamp;
use crate::types::ClusterID;

pub const ENTRY_SIZE: usize = 32;
pub const FREE: u8 = 0x00;
pub const DELETED: u8 = 0xE5;
/// Attribute byte marking a long file name entry
pub const LONG_NAME: u8 = 0x0F;
pub const LAST_LONG_ENTRY: u8 = 0x40;
/// UTF-16 units carried by one long name entry
pub const CHARS_PER_LONG_ENTRY: usize = 13;

bitfield! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct Attributes(u8);
    pub read_only, set_read_only: 0, 0;
    pub hidden, set_hidden: 1, 1;
    pub system, set_system: 2, 2;
    pub volume_label, set_volume_label: 3, 3;
    pub directory, set_directory: 4, 4;
    pub archive, set_archive: 5, 5;
}

impl Attributes {
    pub fn new(directory: bool) -> Self {
        let mut attributes = Self::default();
        match directory {
            true => attributes.set_directory(1),
            false => attributes.set_archive(1),
        }
        attributes
    }

    pub fn label() -> Self {
        let mut attributes = Self::default();
        attributes.set_volume_label(1);
        attributes
    }
}

/// 8.3 short name entry
#[derive(Copy, Clone, Debug)]
#[repr(C, packed(1))]
pub struct DirectoryEntry {
    pub name: [u8; 11],
    pub attributes: u8,
    _nt_reserved: u8,
    pub create_time_tenth: u8,
    pub create_time: LE<u16>,
    pub create_date: LE<u16>,
    pub access_date: LE<u16>,
    pub first_cluster_high: LE<u16>,
    pub write_time: LE<u16>,
    pub write_date: LE<u16>,
    pub first_cluster_low: LE<u16>,
    pub file_size: LE<u32>,
}

impl DirectoryEntry {
    pub fn new(name: [u8; 11], attributes: Attributes, timestamp: Timestamp) -> Self {
        let (date, time) = (timestamp.date().into(), timestamp.time().into());
        Self {
            name,
            attributes: attributes.0,
            _nt_reserved: 0,
            create_time_tenth: 0,
            create_time: time,
            create_date: date,
            access_date: date,
            first_cluster_high: LE::default(),
            write_time: time,
            write_date: date,
            first_cluster_low: LE::default(),
            file_size: LE::default(),
        }
    }

    /// FAT16 only ever uses the low cluster word
    pub fn with_cluster(mut self, cluster: ClusterID) -> Self {
        self.first_cluster_low = (u32::from(cluster) as u16).into();
        self
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.file_size = size.into();
        self
    }

    pub fn cluster(&self) -> ClusterID {
        ClusterID::from(self.first_cluster_low.to_ne() as u32)
    }

    pub fn size(&self) -> u32 {
        self.file_size.to_ne()
    }

    pub fn to_bytes(self) -> [u8; ENTRY_SIZE] {
        unsafe { mem::transmute(self) }
    }

    pub fn from_bytes(bytes: &[u8; ENTRY_SIZE]) -> Self {
        unsafe { mem::transmute(*bytes) }
    }
}

#[derive(Copy, Clone, Debug)]
#[repr(C, packed(1))]
pub struct LongNameEntry {
    pub order: u8,
    pub name1: [LE<u16>; 5],
    pub attributes: u8,
    pub entry_type: u8,
    pub checksum: u8,
    pub name2: [LE<u16>; 6],
    _first_cluster: LE<u16>,
    pub name3: [LE<u16>; 2],
}

impl LongNameEntry {
    /// `chars` is this entry's slice of the name, terminator and padding included
    pub fn new(order: u8, chars: &[u16; CHARS_PER_LONG_ENTRY], checksum: u8) -> Self {
        let mut entry = Self {
            order,
            name1: [LE::default(); 5],
            attributes: LONG_NAME,
            entry_type: 0,
            checksum,
            name2: [LE::default(); 6],
            _first_cluster: LE::default(),
            name3: [LE::default(); 2],
        };
        let (first, rest) = chars.split_at(5);
        let (second, third) = rest.split_at(6);
        let mut name1 = entry.name1;
        let mut name2 = entry.name2;
        let mut name3 = entry.name3;
        first.iter().zip(name1.iter_mut()).for_each(|(c, unit)| *unit = (*c).into());
        second.iter().zip(name2.iter_mut()).for_each(|(c, unit)| *unit = (*c).into());
        third.iter().zip(name3.iter_mut()).for_each(|(c, unit)| *unit = (*c).into());
        entry.name1 = name1;
        entry.name2 = name2;
        entry.name3 = name3;
        entry
    }

    pub fn chars(&self) -> [u16; CHARS_PER_LONG_ENTRY] {
        let (name1, name2, name3) = (self.name1, self.name2, self.name3);
        let mut chars = [0u16; CHARS_PER_LONG_ENTRY];
        let units = name1.iter().chain(name2.iter()).chain(name3.iter());
        chars.iter_mut().zip(units).for_each(|(c, unit)| *c = unit.to_ne());
        chars
    }

    pub fn to_bytes(self) -> [u8; ENTRY_SIZE] {
        unsafe { mem::transmute(self) }
    }
}
