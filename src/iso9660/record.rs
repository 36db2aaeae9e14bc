// Directory records, identifiers and path tables

use alloc::vec::Vec;
use core::mem;

use bitfield::bitfield;
use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::endian::Both;
use crate::error::{Error, Result};

pub const RECORD_HEADER_SIZE: usize = 33;
/// Identifier of the `.` record and of the root record in the volume descriptor
pub const CURRENT_DIRECTORY: &[u8] = &[0x00];
pub const PARENT_DIRECTORY: &[u8] = &[0x01];
/// The record length is a single byte
pub const MAX_IDENTIFIER_LENGTH: usize = 255 - RECORD_HEADER_SIZE - 1;

bitfield! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct FileFlags(u8);
    pub multi_extent, set_multi_extent: 7;
    pub protection, set_protection: 4;
    pub record, set_record: 3;
    pub associated, set_associated: 2;
    pub directory, set_directory: 1;
    pub hidden, set_hidden: 0;
}

impl FileFlags {
    pub fn for_directory(directory: bool) -> Self {
        let mut flags = Self::default();
        flags.set_directory(directory);
        flags
    }
}

/// Seven byte recording date, years counted from 1900, offset 0 (UTC)
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub struct RecordingDate {
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub gmt_offset: u8,
}

impl From<&NaiveDateTime> for RecordingDate {
    fn from(datetime: &NaiveDateTime) -> Self {
        Self {
            year: (datetime.year() - 1900).clamp(0, 255) as u8,
            month: datetime.month() as u8,
            day: datetime.day() as u8,
            hour: datetime.hour() as u8,
            minute: datetime.minute() as u8,
            second: datetime.second() as u8,
            gmt_offset: 0,
        }
    }
}

#[derive(Copy, Clone, Debug)]
#[repr(C, packed(1))]
pub(crate) struct DirectoryRecord {
    pub length: u8,
    pub extended_attribute_length: u8,
    pub extent: Both<u32>,
    pub data_length: Both<u32>,
    pub recording_date: RecordingDate,
    pub flags: u8,
    pub file_unit_size: u8,
    pub interleave_gap_size: u8,
    pub volume_sequence_number: Both<u16>,
    pub identifier_length: u8,
}

impl DirectoryRecord {
    pub fn new(extent: u32, data_length: u32, flags: FileFlags, identifier_length: u8, date: RecordingDate) -> Self {
        Self {
            length: record_length(identifier_length as usize) as u8,
            extended_attribute_length: 0,
            extent: extent.into(),
            data_length: data_length.into(),
            recording_date: date,
            flags: flags.0,
            file_unit_size: 0,
            interleave_gap_size: 0,
            volume_sequence_number: 1u16.into(),
            identifier_length,
        }
    }
}

/// Parses records back out of produced extents in tests
#[cfg(test)]
impl DirectoryRecord {
    pub fn extent(&self) -> u32 {
        self.extent.to_ne()
    }

    pub fn data_length(&self) -> u32 {
        self.data_length.to_ne()
    }

    pub fn flags(&self) -> FileFlags {
        FileFlags(self.flags)
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let header: [u8; RECORD_HEADER_SIZE] = bytes.get(..RECORD_HEADER_SIZE)?.try_into().ok()?;
        Some(unsafe { mem::transmute::<[u8; RECORD_HEADER_SIZE], Self>(header) })
    }
}

/// Header plus identifier, padded to an even length
pub fn record_length(identifier_length: usize) -> usize {
    (RECORD_HEADER_SIZE + identifier_length).next_multiple_of(2)
}

/// One serialized directory record
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Record {
    pub identifier: Vec<u8>,
    pub extent: u32,
    pub data_length: u32,
    pub directory: bool,
}

impl Record {
    pub fn to_bytes(&self, date: RecordingDate) -> Vec<u8> {
        let flags = FileFlags::for_directory(self.directory);
        let header = DirectoryRecord::new(self.extent, self.data_length, flags, self.identifier.len() as u8, date);
        let header: [u8; RECORD_HEADER_SIZE] = unsafe { mem::transmute(header) };
        let mut bytes = Vec::with_capacity(record_length(self.identifier.len()));
        bytes.extend_from_slice(&header);
        bytes.extend_from_slice(&self.identifier);
        bytes.resize(record_length(self.identifier.len()), 0);
        bytes
    }
}

fn check_identifier(name: &str, identifier: Vec<u8>) -> Result<Vec<u8>> {
    if identifier.len() > MAX_IDENTIFIER_LENGTH {
        let message = format!("ISO 9660 identifier for {} exceeds {} bytes", name, MAX_IDENTIFIER_LENGTH);
        return Err(Error::SizeConstraintViolation(message));
    }
    Ok(identifier)
}

pub fn directory_identifier(name: &str) -> Result<Vec<u8>> {
    check_identifier(name, name.to_ascii_uppercase().into_bytes())
}

/// Uppercase name with version `;1`, a trailing dot added when it has no extension
pub fn file_identifier(name: &str) -> Result<Vec<u8>> {
    let upper = name.to_ascii_uppercase();
    let identifier = match upper.contains('.') {
        true => format!("{};1", upper),
        false => format!("{}.;1", upper),
    };
    check_identifier(name, identifier.into_bytes())
}

/// Type L (little-endian) and type M (big-endian) path tables built side by side
#[derive(Clone, Debug, Default)]
pub(crate) struct PathTables {
    pub little: Vec<u8>,
    pub big: Vec<u8>,
}

impl PathTables {
    pub fn push(&mut self, identifier: &[u8], extent: u32, parent: u16) {
        let length = identifier.len() as u8;
        self.little.extend_from_slice(&[length, 0]);
        self.little.extend_from_slice(&extent.to_le_bytes());
        self.little.extend_from_slice(&parent.to_le_bytes());
        self.big.extend_from_slice(&[length, 0]);
        self.big.extend_from_slice(&extent.to_be_bytes());
        self.big.extend_from_slice(&parent.to_be_bytes());
        for table in [&mut self.little, &mut self.big] {
            table.extend_from_slice(identifier);
            if identifier.len() % 2 == 1 {
                table.push(0);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.little.len()
    }

    pub fn is_empty(&self) -> bool {
        self.little.is_empty()
    }
}
