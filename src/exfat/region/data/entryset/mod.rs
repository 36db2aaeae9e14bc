pub(crate) mod generic;
pub(crate) mod primary;
pub(crate) mod secondary;

pub(crate) const ENTRY_SIZE: usize = 32;
pub(crate) type RawEntry = [u8; ENTRY_SIZE];

use alloc::vec::Vec;
use core::mem::transmute;

use generic::Flags;
use primary::{FileDirectory, Permissions};
use secondary::{Filename, Secondary, StreamExtension, FILENAME_CHARS};

use crate::error::{Error, Result};
use crate::exfat::checksum::Checksum;
use crate::exfat::upcase_table::UpcaseTable;
use crate::timestamp::DateTime;

pub(crate) const MAX_NAME_LENGTH: usize = 255;

/// Set checksum over serialized entries, skipping the checksum field itself
pub(crate) fn checksum(entries: &[RawEntry]) -> u16 {
    let mut checksum = Checksum::<u16>::default();
    for (index, entry) in entries.iter().enumerate() {
        match index {
            0 => checksum.write_skipping(entry, &[2, 3]),
            _ => checksum.write(entry),
        }
    }
    checksum.sum()
}

pub(crate) fn name_hash(name: &[u16], upcase_table: &UpcaseTable) -> u16 {
    let mut checksum = Checksum::<u16>::default();
    for &ch in name.iter() {
        checksum.write(&upcase_table.lookup(ch).to_le_bytes());
    }
    checksum.sum()
}

/// What an entry set points at
#[derive(Copy, Clone, Debug)]
pub(crate) struct Allocation {
    pub first_cluster: u32,
    pub length: u64,
    pub contiguous: bool,
}

/// File, stream extension and file name entries describing one file or directory
#[derive(Clone, Debug)]
pub(crate) struct EntrySet {
    entries: Vec<RawEntry>,
}

impl EntrySet {
    pub fn new(
        name: &str,
        directory: bool,
        allocation: Allocation,
        permissions: Permissions,
        now: DateTime,
        upcase_table: &UpcaseTable,
    ) -> Result<Self> {
        let units: Vec<u16> = name.encode_utf16().collect();
        if units.is_empty() || units.len() > MAX_NAME_LENGTH {
            let message = format!("exFAT name {:?} must be 1 to {} UTF-16 units", name, MAX_NAME_LENGTH);
            return Err(Error::SizeConstraintViolation(message));
        }
        let name_entries = units.len().div_ceil(FILENAME_CHARS);
        let secondary_count = 1 + name_entries as u8;
        let file_directory = FileDirectory::new(secondary_count, directory, permissions, now);
        let stream = Secondary::<StreamExtension>::new(
            Flags::new(allocation.contiguous),
            units.len() as u8,
            name_hash(&units, upcase_table),
            allocation.first_cluster,
            allocation.length,
        );

        let mut entries: Vec<RawEntry> = Vec::with_capacity(1 + secondary_count as usize);
        entries.push(unsafe { transmute::<FileDirectory, RawEntry>(file_directory) });
        entries.push(unsafe { transmute::<Secondary<StreamExtension>, RawEntry>(stream) });
        for chars in units.chunks(FILENAME_CHARS) {
            entries.push(unsafe { transmute::<Filename, RawEntry>(Filename::new(chars)) });
        }
        let mut entry_set = Self { entries };
        entry_set.update_checksum();
        Ok(entry_set)
    }

    /// `entries` must start with a file entry followed by its secondaries
    pub fn from_entries(entries: Vec<RawEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[RawEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn file_directory(&self) -> FileDirectory {
        unsafe { transmute::<RawEntry, FileDirectory>(self.entries[0]) }
    }

    pub fn stream_extension(&self) -> Secondary<StreamExtension> {
        unsafe { transmute::<RawEntry, Secondary<StreamExtension>>(self.entries[1]) }
    }

    pub fn set_length(&mut self, length: u64) {
        let mut stream = self.stream_extension();
        stream.set_length(length);
        self.entries[1] = unsafe { transmute::<Secondary<StreamExtension>, RawEntry>(stream) };
        self.update_checksum();
    }

    fn update_checksum(&mut self) {
        let sum = checksum(&self.entries);
        self.entries[0][2..4].copy_from_slice(&sum.to_le_bytes());
    }

    /// Bytes as they go into the directory cluster
    pub fn to_bytes(&self) -> Vec<u8> {
        self.entries.iter().flatten().copied().collect()
    }
}
