use core::fmt::Debug;

use super::super::entry_type::{EntryType, RawEntryType};
use super::generic::Flags;
use crate::endian::Little as LE;

#[derive(Copy, Clone, Debug)]
#[repr(C, packed(1))]
pub struct Secondary<T: Clone + Debug> {
    pub(crate) entry_type: RawEntryType,
    general_secondary_flags: u8,
    pub(crate) custom_defined: T,
    pub(crate) first_cluster: LE<u32>,
    pub(crate) data_length: LE<u64>,
}

impl<T: Clone + Debug> Secondary<T> {
    pub(crate) fn general_secondary_flags(&self) -> Flags {
        Flags(self.general_secondary_flags as u16)
    }

    pub fn first_cluster(&self) -> u32 {
        self.first_cluster.to_ne()
    }

    pub fn data_length(&self) -> u64 {
        self.data_length.to_ne()
    }
}

#[derive(Copy, Clone, Debug)]
#[repr(C, packed(1))]
pub struct StreamExtension {
    _reserved1: u8,
    pub name_length: u8,
    pub name_hash: LE<u16>,
    _reserved2: [u8; 2],
    pub valid_data_length: LE<u64>,
    _reserved3: [u8; 4],
}

impl Secondary<StreamExtension> {
    pub(crate) fn new(flags: Flags, name_length: u8, name_hash: u16, first_cluster: u32, length: u64) -> Self {
        let stream = StreamExtension {
            _reserved1: 0,
            name_length,
            name_hash: name_hash.into(),
            _reserved2: [0; 2],
            valid_data_length: length.into(),
            _reserved3: [0; 4],
        };
        Self {
            entry_type: RawEntryType::new(EntryType::StreamExtension, true),
            general_secondary_flags: flags.0 as u8,
            custom_defined: stream,
            first_cluster: first_cluster.into(),
            data_length: length.into(),
        }
    }

    /// Directories are fully initialized, so both lengths always move together
    pub(crate) fn set_length(&mut self, length: u64) {
        let mut stream = self.custom_defined;
        stream.valid_data_length = length.into();
        self.custom_defined = stream;
        self.data_length = length.into();
    }
}

pub(crate) const FILENAME_CHARS: usize = 15;

#[derive(Copy, Clone, Debug)]
#[repr(C, packed(1))]
pub(crate) struct Filename {
    pub entry_type: RawEntryType,
    general_secondary_flags: u8,
    pub filename: [LE<u16>; FILENAME_CHARS],
}

impl Filename {
    /// Units past the end of `chars` stay zero
    pub fn new(chars: &[u16]) -> Self {
        let mut filename = [LE::default(); FILENAME_CHARS];
        filename.iter_mut().zip(chars).for_each(|(slot, ch)| *slot = (*ch).into());
        Self { entry_type: RawEntryType::new(EntryType::Filename, true), general_secondary_flags: 0, filename }
    }
}
