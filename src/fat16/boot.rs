// FAT16 boot sector and volume geometry

use core::mem;

use crate::endian::Little as LE;
use crate::error::{Error, Result};
use crate::types::SECTOR_SIZE;

pub const RESERVED_SECTORS: u32 = 1;
pub const NUMBER_OF_FATS: u32 = 2;
pub const ROOT_ENTRY_COUNT: u32 = 512;
pub const ROOT_DIRECTORY_SECTORS: u32 = ROOT_ENTRY_COUNT * 32 / SECTOR_SIZE as u32;
pub const MEDIA: u8 = 0xF8;
pub const SERIAL_NUMBER: u32 = 0x12345678;
/// Largest cluster count a FAT16 volume may carry
pub const MAX_CLUSTERS: u32 = 65524;

#[derive(Copy, Clone, Debug)]
#[repr(C, packed(1))]
pub(crate) struct BootSector {
    pub jump_boot: [u8; 3],
    pub oem_name: [u8; 8],
    pub bytes_per_sector: LE<u16>,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: LE<u16>,
    pub number_of_fats: u8,
    pub root_entry_count: LE<u16>,
    pub total_sectors_16: LE<u16>,
    pub media: u8,
    pub fat_size: LE<u16>,
    pub sectors_per_track: LE<u16>,
    pub number_of_heads: LE<u16>,
    pub hidden_sectors: LE<u32>,
    pub total_sectors_32: LE<u32>,
    pub drive_number: u8,
    _reserved: u8,
    pub boot_signature: u8,
    pub volume_id: LE<u32>,
    pub volume_label: [u8; 11],
    pub filesystem_type: [u8; 8],
    pub bootcode: [u8; 448],
    pub signature: [u8; 2],
}

impl BootSector {
    pub fn new(geometry: &Geometry, hidden_sectors: u32, label: [u8; 11]) -> Self {
        let (total_sectors_16, total_sectors_32) = match geometry.total_sectors < 0x10000 {
            true => (geometry.total_sectors as u16, 0),
            false => (0, geometry.total_sectors),
        };
        Self {
            jump_boot: hex!("EB 3C 90"),
            oem_name: *b"MKIMAGE ",
            bytes_per_sector: (SECTOR_SIZE as u16).into(),
            sectors_per_cluster: geometry.sectors_per_cluster,
            reserved_sectors: (RESERVED_SECTORS as u16).into(),
            number_of_fats: NUMBER_OF_FATS as u8,
            root_entry_count: (ROOT_ENTRY_COUNT as u16).into(),
            total_sectors_16: total_sectors_16.into(),
            media: MEDIA,
            fat_size: (geometry.fat_size as u16).into(),
            sectors_per_track: 63u16.into(),
            number_of_heads: 16u16.into(),
            hidden_sectors: hidden_sectors.into(),
            total_sectors_32: total_sectors_32.into(),
            drive_number: 0x80,
            _reserved: 0,
            boot_signature: 0x29,
            volume_id: SERIAL_NUMBER.into(),
            volume_label: label,
            filesystem_type: *b"FAT16   ",
            bootcode: [0; 448],
            signature: hex!("55 AA"),
        }
    }

    pub fn to_bytes(self) -> [u8; SECTOR_SIZE] {
        unsafe { mem::transmute(self) }
    }
}

/// Sector counts are relative to the volume start
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Geometry {
    pub total_sectors: u32,
    pub sectors_per_cluster: u8,
    pub fat_size: u32,
    pub cluster_count: u32,
}

impl Geometry {
    pub fn solve(total_sectors: u64, sectors_per_cluster: u8) -> Result<Self> {
        if !sectors_per_cluster.is_power_of_two() {
            let message = format!("{} sectors per cluster is not a power of two", sectors_per_cluster);
            return Err(Error::SizeConstraintViolation(message));
        }
        let total = u32::try_from(total_sectors).map_err(|_| {
            Error::SizeConstraintViolation(format!("{} sectors is too large for FAT16", total_sectors))
        })?;
        let spc = sectors_per_cluster as u32;
        let fixed = RESERVED_SECTORS + ROOT_DIRECTORY_SECTORS;
        let clusters_for = |fat_size: u32| match total.checked_sub(fixed + NUMBER_OF_FATS * fat_size) {
            Some(data) => data / spc,
            None => 0,
        };

        // A larger FAT leaves fewer clusters, so this only ever grows
        let mut fat_size = 1;
        loop {
            let needed = ((clusters_for(fat_size) + 2) * 2).div_ceil(SECTOR_SIZE as u32);
            if needed <= fat_size {
                break;
            }
            fat_size = needed;
        }
        let cluster_count = clusters_for(fat_size);
        if cluster_count < 1 {
            let message = format!("{} sectors leave no room for FAT16 data clusters", total);
            return Err(Error::SizeConstraintViolation(message));
        }
        if cluster_count > MAX_CLUSTERS {
            let message = format!("{} clusters exceed the FAT16 limit of {}", cluster_count, MAX_CLUSTERS);
            return Err(Error::SizeConstraintViolation(message));
        }
        Ok(Self { total_sectors: total, sectors_per_cluster, fat_size, cluster_count })
    }

    pub fn first_fat_sector(&self) -> u32 {
        RESERVED_SECTORS
    }

    pub fn root_directory_sector(&self) -> u32 {
        RESERVED_SECTORS + NUMBER_OF_FATS * self.fat_size
    }

    pub fn first_data_sector(&self) -> u32 {
        self.root_directory_sector() + ROOT_DIRECTORY_SECTORS
    }

    pub fn cluster_size(&self) -> u32 {
        self.sectors_per_cluster as u32 * SECTOR_SIZE as u32
    }
}
