use bitfield::bitfield;
use derive_more::Into;

use super::super::entry_type::{EntryType, RawEntryType};
use crate::endian::Little as LE;
use crate::timestamp::{DateTime, UTCOffset};

bitfield! {
    #[derive(Copy, Clone, Default, Debug, Into)]
    pub struct FileAttributes(u16);
    pub read_only, set_read_only: 0, 0;
    pub hidden, set_hidden: 1, 1;
    pub system, set_system: 2, 2;
    pub directory, set_directory: 4, 4;
    pub archive, set_archive: 5, 5;
}

impl FileAttributes {
    pub fn new(directory: bool) -> Self {
        let mut attributes = Self::default();
        if directory {
            attributes.set_directory(1);
        } else {
            attributes.set_archive(1);
        }
        attributes
    }
}

/// Ownership and access bits stored in the reserved words of a file entry
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Permissions {
    pub uid: u16,
    pub gid: u16,
    pub mode: u16,
}

impl Permissions {
    pub const ROOT_ONLY: Self = Self { uid: 0, gid: 0, mode: 0xF00 };
    pub const EVERYONE: Self = Self { uid: 0, gid: 0, mode: 0xFFF };

    /// `path` is slash separated and relative to the volume root
    pub fn for_path<S: AsRef<str>>(path: &str, root_only: &[S]) -> Self {
        let restricted = root_only.iter().any(|prefix| {
            let prefix = prefix.as_ref();
            path == prefix || path.strip_prefix(prefix).map(|rest| rest.starts_with('/')).unwrap_or(false)
        });
        match restricted {
            true => Self::ROOT_ONLY,
            false => Self::EVERYONE,
        }
    }
}

/// The create timestamp words are taken by gid and mode
#[derive(Copy, Clone, Debug)]
#[repr(C, packed(1))]
pub struct FileDirectory {
    pub(crate) entry_type: RawEntryType,
    pub(crate) secondary_count: u8,
    pub(crate) set_checksum: LE<u16>,
    pub(crate) file_attributes: LE<u16>,
    pub(crate) uid: LE<u16>,
    pub(crate) gid: LE<u16>,
    pub(crate) mode: LE<u16>,
    last_modified_timestamp: LE<u32>,
    last_accessed_timestamp: LE<u32>,
    create_10ms_increment: u8,
    last_modified_10ms_increment: u8,
    create_utc_offset: UTCOffset,
    last_modified_utc_offset: UTCOffset,
    last_accessed_utc_offset: UTCOffset,
    _reserved2: [u8; 7],
}

impl FileDirectory {
    pub(crate) fn new(secondary_count: u8, directory: bool, permissions: Permissions, now: DateTime) -> Self {
        let timestamp: LE<u32> = u32::from(now.timestamp).into();
        let increment = now.increment_10ms();
        FileDirectory {
            entry_type: RawEntryType::new(EntryType::FileDirectory, true),
            secondary_count,
            set_checksum: LE::default(),
            file_attributes: u16::from(FileAttributes::new(directory)).into(),
            uid: permissions.uid.into(),
            gid: permissions.gid.into(),
            mode: permissions.mode.into(),
            last_modified_timestamp: timestamp,
            last_accessed_timestamp: timestamp,
            create_10ms_increment: 0,
            last_modified_10ms_increment: increment,
            create_utc_offset: UTCOffset::default(),
            last_modified_utc_offset: now.utc_offset,
            last_accessed_utc_offset: now.utc_offset,
            _reserved2: [0; 7],
        }
    }

    pub fn file_attributes(&self) -> FileAttributes {
        FileAttributes(self.file_attributes.to_ne())
    }

    pub fn permissions(&self) -> Permissions {
        Permissions { uid: self.uid.to_ne(), gid: self.gid.to_ne(), mode: self.mode.to_ne() }
    }

    pub fn set_checksum(&self) -> u16 {
        self.set_checksum.to_ne()
    }
}
