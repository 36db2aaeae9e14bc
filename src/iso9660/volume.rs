// Volume descriptors: primary, El Torito boot record and set terminator

use core::mem;

use chrono::{Datelike, NaiveDateTime, Timelike};

use super::BLOCK_SIZE;
use crate::endian::{Big as BE, Both, Little as LE};

pub const STANDARD_IDENTIFIER: [u8; 5] = *b"CD001";
pub const EL_TORITO: &[u8] = b"EL TORITO SPECIFICATION";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum DescriptorType {
    BootRecord = 0,
    Primary = 1,
    Terminator = 255,
}

#[derive(Copy, Clone, Debug)]
#[repr(C, packed(1))]
pub(crate) struct Header {
    pub type_code: u8,
    pub identifier: [u8; 5],
    pub version: u8,
}

impl Header {
    fn new(descriptor_type: DescriptorType) -> Self {
        Self { type_code: descriptor_type as u8, identifier: STANDARD_IDENTIFIER, version: 1 }
    }
}

/// 17 byte `YYYYMMDDHHMMSSCC` digits plus a zero GMT offset
pub(crate) fn decimal_datetime(datetime: &NaiveDateTime) -> [u8; 17] {
    let mut bytes = [0u8; 17];
    let digits = format!(
        "{:04}{:02}{:02}{:02}{:02}{:02}{:02}",
        datetime.year().clamp(0, 9999),
        datetime.month(),
        datetime.day(),
        datetime.hour(),
        datetime.minute(),
        datetime.second(),
        datetime.and_utc().timestamp_subsec_millis() / 10,
    );
    bytes[..16].copy_from_slice(digits.as_bytes());
    bytes
}

/// All digits zero, "not specified"
const UNSPECIFIED_DATETIME: [u8; 17] = *b"0000000000000000\0";

fn padded<const N: usize>(text: &str) -> [u8; N] {
    let mut field = [b' '; N];
    field.iter_mut().zip(text.bytes()).for_each(|(slot, b)| *slot = b);
    field
}

#[derive(Copy, Clone, Debug)]
#[repr(C, packed(1))]
pub(crate) struct PrimaryVolumeDescriptor {
    pub header: Header,
    _unused1: u8,
    pub system_identifier: [u8; 32],
    pub volume_identifier: [u8; 32],
    _unused2: [u8; 8],
    pub volume_space_size: Both<u32>,
    _unused3: [u8; 32],
    pub volume_set_size: Both<u16>,
    pub volume_sequence_number: Both<u16>,
    pub logical_block_size: Both<u16>,
    pub path_table_size: Both<u32>,
    pub type_l_path_table: LE<u32>,
    pub optional_type_l_path_table: LE<u32>,
    pub type_m_path_table: BE<u32>,
    pub optional_type_m_path_table: BE<u32>,
    pub root_directory_record: [u8; 34],
    pub volume_set_identifier: [u8; 128],
    pub publisher_identifier: [u8; 128],
    pub data_preparer_identifier: [u8; 128],
    pub application_identifier: [u8; 128],
    pub copyright_file_identifier: [u8; 37],
    pub abstract_file_identifier: [u8; 37],
    pub bibliographic_file_identifier: [u8; 37],
    pub creation: [u8; 17],
    pub modification: [u8; 17],
    pub expiration: [u8; 17],
    pub effective: [u8; 17],
    pub file_structure_version: u8,
    _unused4: u8,
    pub application_use: [u8; 512],
    _reserved: [u8; 653],
}

/// What the primary volume descriptor records about the finished layout
#[derive(Clone, Debug)]
pub(crate) struct VolumeInfo<'a> {
    pub system_identifier: &'a str,
    pub volume_identifier: &'a str,
    pub application_identifier: &'a str,
    pub volume_space_size: u32,
    pub path_table_size: u32,
    pub type_l_path_table: u32,
    pub type_m_path_table: u32,
    pub root_directory_record: [u8; 34],
    pub timestamp: NaiveDateTime,
}

impl PrimaryVolumeDescriptor {
    pub fn new(info: &VolumeInfo) -> Self {
        let datetime = decimal_datetime(&info.timestamp);
        Self {
            header: Header::new(DescriptorType::Primary),
            _unused1: 0,
            system_identifier: padded(info.system_identifier),
            volume_identifier: padded(info.volume_identifier),
            _unused2: [0; 8],
            volume_space_size: info.volume_space_size.into(),
            _unused3: [0; 32],
            volume_set_size: 1u16.into(),
            volume_sequence_number: 1u16.into(),
            logical_block_size: (BLOCK_SIZE as u16).into(),
            path_table_size: info.path_table_size.into(),
            type_l_path_table: info.type_l_path_table.into(),
            optional_type_l_path_table: LE::default(),
            type_m_path_table: info.type_m_path_table.into(),
            optional_type_m_path_table: BE::default(),
            root_directory_record: info.root_directory_record,
            volume_set_identifier: padded(""),
            publisher_identifier: padded(""),
            data_preparer_identifier: padded(""),
            application_identifier: padded(info.application_identifier),
            copyright_file_identifier: padded(""),
            abstract_file_identifier: padded(""),
            bibliographic_file_identifier: padded(""),
            creation: datetime,
            modification: datetime,
            expiration: UNSPECIFIED_DATETIME,
            effective: UNSPECIFIED_DATETIME,
            file_structure_version: 1,
            _unused4: 0,
            application_use: [0; 512],
            _reserved: [0; 653],
        }
    }

    pub fn to_bytes(self) -> [u8; BLOCK_SIZE] {
        unsafe { mem::transmute(self) }
    }
}

#[derive(Copy, Clone, Debug)]
#[repr(C, packed(1))]
pub(crate) struct BootRecord {
    pub header: Header,
    pub boot_system_identifier: [u8; 32],
    pub boot_identifier: [u8; 32],
    pub boot_catalog: LE<u32>,
    _unused: [u8; 1973],
}

impl BootRecord {
    pub fn new(boot_catalog: u32) -> Self {
        let mut boot_system_identifier = [0u8; 32];
        boot_system_identifier[..EL_TORITO.len()].copy_from_slice(EL_TORITO);
        Self {
            header: Header::new(DescriptorType::BootRecord),
            boot_system_identifier,
            boot_identifier: [0; 32],
            boot_catalog: boot_catalog.into(),
            _unused: [0; 1973],
        }
    }

    pub fn to_bytes(self) -> [u8; BLOCK_SIZE] {
        unsafe { mem::transmute(self) }
    }
}

pub(crate) fn terminator() -> [u8; BLOCK_SIZE] {
    let mut sector = [0u8; BLOCK_SIZE];
    let header: [u8; 7] = unsafe { mem::transmute(Header::new(DescriptorType::Terminator)) };
    sector[..7].copy_from_slice(&header);
    sector
}

#[cfg(test)]
mod test {
    use chrono::NaiveDate;
    use memoffset::offset_of;

    use super::{decimal_datetime, terminator, BootRecord, PrimaryVolumeDescriptor, VolumeInfo};

    #[test]
    fn test_layout() {
        assert_eq!(core::mem::size_of::<PrimaryVolumeDescriptor>(), 2048);
        assert_eq!(core::mem::size_of::<BootRecord>(), 2048);
        assert_eq!(offset_of!(PrimaryVolumeDescriptor, volume_space_size), 80);
        assert_eq!(offset_of!(PrimaryVolumeDescriptor, path_table_size), 132);
        assert_eq!(offset_of!(PrimaryVolumeDescriptor, type_m_path_table), 148);
        assert_eq!(offset_of!(PrimaryVolumeDescriptor, root_directory_record), 156);
        assert_eq!(offset_of!(PrimaryVolumeDescriptor, application_identifier), 574);
        assert_eq!(offset_of!(PrimaryVolumeDescriptor, creation), 813);
        assert_eq!(offset_of!(PrimaryVolumeDescriptor, file_structure_version), 881);
        assert_eq!(offset_of!(BootRecord, boot_catalog), 71);
    }

    #[test]
    fn test_primary() {
        let timestamp = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap().and_hms_opt(3, 4, 5).unwrap();
        assert_eq!(&decimal_datetime(&timestamp), b"2025010203040500\0");
        let info = VolumeInfo {
            system_identifier: "MKIMAGE",
            volume_identifier: "MKIMAGE_LIVE",
            application_identifier: "MKIMAGE",
            volume_space_size: 100,
            path_table_size: 10,
            type_l_path_table: 20,
            type_m_path_table: 21,
            root_directory_record: [0x22; 34],
            timestamp,
        };
        let bytes = PrimaryVolumeDescriptor::new(&info).to_bytes();
        assert_eq!(&bytes[..7], b"\x01CD001\x01");
        assert_eq!(&bytes[8..16], b"MKIMAGE ");
        assert_eq!(&bytes[40..53], b"MKIMAGE_LIVE ");
        assert_eq!(&bytes[80..88], &[100, 0, 0, 0, 0, 0, 0, 100]);
        assert_eq!(&bytes[128..132], &[0x00, 0x08, 0x08, 0x00]);
        assert_eq!(&bytes[140..144], &[20, 0, 0, 0]);
        assert_eq!(&bytes[148..152], &[0, 0, 0, 21]);
        assert_eq!(bytes[156], 0x22);
        assert_eq!(&bytes[813..829], b"2025010203040500");
        assert_eq!(bytes[881], 1);
    }

    #[test]
    fn test_boot_record() {
        let bytes = BootRecord::new(19).to_bytes();
        assert_eq!(&bytes[..7], b"\x00CD001\x01");
        assert_eq!(&bytes[7..30], b"EL TORITO SPECIFICATION");
        assert_eq!(bytes[30], 0);
        assert_eq!(&bytes[71..75], &[19, 0, 0, 0]);
        assert_eq!(&terminator()[..7], b"\xFFCD001\x01");
    }
}
