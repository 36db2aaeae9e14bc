// Main and backup boot regions

use core::mem;

use bitfield::bitfield;
use memoffset::offset_of;

use crate::endian::Little as LE;
use crate::error::{Error, Result};
use crate::exfat::checksum::Checksum;
use crate::types::{ClusterID, SECTOR_SIZE, SECTOR_SIZE_SHIFT};

/// Sectors in one boot region: VBR, 8 extended boot sectors, OEM, reserved, checksum
pub const BOOT_REGION_SECTORS: usize = 12;
pub const FAT_OFFSET: u32 = 32;
pub const SERIAL_NUMBER: u32 = 0x414E594F;
pub const FILESYSTEM_REVISION: u16 = 0x0100;

bitfield! {
    #[derive(Copy, Clone, Debug, Default)]
    pub struct VolumeFlags(u16);
    pub media_failure, set_media_failure: 2, 2;
    pub volume_dirty, set_volume_dirty: 1, 1;
    pub active_fat, set_active_fat: 0, 0;
}

#[derive(Copy, Clone, Debug)]
#[repr(C)]
pub(crate) struct BootSector {
    pub jump_boot: [u8; 3],
    pub filesystem_name: [u8; 8],
    _padding: [u8; 53],
    pub partition_offset: LE<u64>,
    pub volume_length: LE<u64>,
    pub fat_offset: LE<u32>,          // unit sector
    pub fat_length: LE<u32>,          // unit sector
    pub cluster_heap_offset: LE<u32>, // unit sector
    pub cluster_count: LE<u32>,
    pub first_cluster_of_root_directory: LE<u32>,
    pub volume_serial_number: LE<u32>,
    pub filesystem_revision: LE<u16>,
    pub volume_flags: LE<u16>,
    pub bytes_per_sector_shift: u8,
    pub sectors_per_cluster_shift: u8,
    pub number_of_fats: u8,
    pub drive_select: u8,
    pub percent_inuse: u8,
    _reserved: [u8; 7],
    pub bootcode: [u8; 390],
    pub boot_signature: [u8; 2],
}

impl BootSector {
    pub fn new(geometry: &Geometry, partition_offset: u64) -> Self {
        Self {
            jump_boot: hex!("EB 76 90"),
            filesystem_name: *b"EXFAT   ",
            _padding: [0; 53],
            partition_offset: partition_offset.into(),
            volume_length: geometry.volume_length.into(),
            fat_offset: geometry.fat_offset.into(),
            fat_length: geometry.fat_length.into(),
            cluster_heap_offset: geometry.cluster_heap_offset.into(),
            cluster_count: geometry.cluster_count.into(),
            first_cluster_of_root_directory: u32::from(geometry.root_cluster()).into(),
            volume_serial_number: SERIAL_NUMBER.into(),
            filesystem_revision: FILESYSTEM_REVISION.into(),
            volume_flags: u16::from(VolumeFlags::default().0).into(),
            bytes_per_sector_shift: SECTOR_SIZE_SHIFT,
            sectors_per_cluster_shift: geometry.sectors_per_cluster_shift,
            number_of_fats: 1,
            drive_select: 0x80,
            percent_inuse: 0xFF,
            _reserved: [0; 7],
            bootcode: [0; 390],
            boot_signature: hex!("55 AA"),
        }
    }

    pub fn to_bytes(self) -> [u8; SECTOR_SIZE] {
        unsafe { mem::transmute(self) }
    }
}

/// Checksum over the first eleven sectors, without the fields that change after formatting
pub(crate) fn boot_checksum(sectors: &[[u8; SECTOR_SIZE]]) -> u32 {
    let flags = offset_of!(BootSector, volume_flags);
    let excluded = [flags, flags + 1, offset_of!(BootSector, percent_inuse)];
    let mut checksum = Checksum::<u32>::default();
    for (index, sector) in sectors.iter().take(BOOT_REGION_SECTORS - 1).enumerate() {
        match index {
            0 => checksum.write_skipping(sector, &excluded),
            _ => checksum.write(sector),
        }
    }
    checksum.sum()
}

/// The twelve sectors written twice, at volume sector 0 and again at 12
pub(crate) fn boot_region(boot_sector: BootSector) -> [[u8; SECTOR_SIZE]; BOOT_REGION_SECTORS] {
    let mut sectors = [[0u8; SECTOR_SIZE]; BOOT_REGION_SECTORS];
    sectors[0] = boot_sector.to_bytes();
    for sector in sectors[1..9].iter_mut() {
        sector[510..].copy_from_slice(&hex!("55 AA"));
    }
    let sum = boot_checksum(&sectors).to_le_bytes();
    for word in sectors[11].chunks_mut(4) {
        word.copy_from_slice(&sum);
    }
    sectors
}

/// Sector offsets relative to the volume start
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Geometry {
    pub volume_length: u64,
    pub sectors_per_cluster_shift: u8,
    pub fat_offset: u32,
    pub fat_length: u32,
    pub cluster_heap_offset: u32,
    pub cluster_count: u32,
}

impl Geometry {
    pub fn solve(total_sectors: u64, sectors_per_cluster: u8) -> Result<Self> {
        if !sectors_per_cluster.is_power_of_two() {
            let message = format!("{} sectors per cluster is not a power of two", sectors_per_cluster);
            return Err(Error::SizeConstraintViolation(message));
        }
        let spc = sectors_per_cluster as u64;
        let too_small = || Error::SizeConstraintViolation(format!("{} sectors is too small for exFAT", total_sectors));
        let estimate = total_sectors.checked_sub(FAT_OFFSET as u64).ok_or_else(too_small)? / spc;
        let fat_length = ((estimate + 2) * 4).div_ceil(SECTOR_SIZE as u64);
        let heap = FAT_OFFSET as u64 + fat_length;
        let count = total_sectors.checked_sub(heap).ok_or_else(too_small)? / spc;
        let fat_length = ((count + 2) * 4).div_ceil(SECTOR_SIZE as u64);
        let heap = FAT_OFFSET as u64 + fat_length;
        let cluster_count = u32::try_from(count).map_err(|_| {
            Error::SizeConstraintViolation(format!("{} clusters exceed the exFAT limit", count))
        })?;
        let geometry = Self {
            volume_length: total_sectors,
            sectors_per_cluster_shift: sectors_per_cluster.trailing_zeros() as u8,
            fat_offset: FAT_OFFSET,
            fat_length: fat_length as u32,
            cluster_heap_offset: heap as u32,
            cluster_count,
        };
        // Bitmap, up-case table and root directory must all fit
        if cluster_count < geometry.bitmap_clusters() + 2 {
            return Err(too_small());
        }
        Ok(geometry)
    }

    pub fn sectors_per_cluster(&self) -> u32 {
        1 << self.sectors_per_cluster_shift
    }

    pub fn cluster_size(&self) -> u32 {
        (SECTOR_SIZE as u32) << self.sectors_per_cluster_shift
    }

    /// Byte offset of `cluster` from the volume start
    pub fn cluster_offset(&self, cluster: ClusterID) -> u64 {
        let sector = self.cluster_heap_offset as u64 + ((cluster.offset() as u64) << self.sectors_per_cluster_shift);
        sector * SECTOR_SIZE as u64
    }

    pub fn bitmap_length(&self) -> u32 {
        self.cluster_count.div_ceil(8)
    }

    pub fn bitmap_clusters(&self) -> u32 {
        self.bitmap_length().div_ceil(self.cluster_size())
    }

    pub fn upcase_cluster(&self) -> ClusterID {
        ClusterID::FIRST + self.bitmap_clusters()
    }

    pub fn root_cluster(&self) -> ClusterID {
        self.upcase_cluster() + 1u32
    }
}

#[cfg(test)]
mod test {
    use memoffset::offset_of;

    use super::{boot_checksum, boot_region, BootSector, Geometry};
    use crate::types::ClusterID;

    #[test]
    fn test_layout() {
        assert_eq!(core::mem::size_of::<BootSector>(), 512);
        assert_eq!(offset_of!(BootSector, partition_offset), 64);
        assert_eq!(offset_of!(BootSector, first_cluster_of_root_directory), 96);
        assert_eq!(offset_of!(BootSector, volume_flags), 106);
        assert_eq!(offset_of!(BootSector, percent_inuse), 112);
    }

    #[test]
    fn test_geometry() {
        let geometry = Geometry::solve(131072 - 8192, 8).unwrap();
        assert_eq!(geometry.fat_offset, 32);
        assert_eq!(geometry.cluster_size(), 4096);
        let count = geometry.cluster_count as u64;
        assert_eq!(geometry.fat_length as u64, ((count + 2) * 4).div_ceil(512));
        assert_eq!(geometry.cluster_heap_offset, 32 + geometry.fat_length);
        assert!(geometry.cluster_heap_offset as u64 + count * 8 <= 131072 - 8192);
        assert_eq!(geometry.bitmap_clusters(), 1);
        assert_eq!(geometry.upcase_cluster(), ClusterID::from(3));
        assert_eq!(geometry.root_cluster(), ClusterID::from(4));
        assert_eq!(geometry.cluster_offset(ClusterID::from(3)), (geometry.cluster_heap_offset as u64 + 8) * 512);

        assert!(Geometry::solve(40, 8).is_err());
        assert!(Geometry::solve(4096, 6).is_err());
    }

    #[test]
    fn test_boot_region() {
        let geometry = Geometry::solve(16384, 8).unwrap();
        let mut boot_sector = BootSector::new(&geometry, 8192);
        let sectors = boot_region(boot_sector);
        assert_eq!(&sectors[0][..3], &[0xEB, 0x76, 0x90]);
        assert_eq!(&sectors[0][106..108], &[0, 0]);
        assert_eq!(&sectors[0][3..11], b"EXFAT   ");
        assert_eq!(u64::from_le_bytes(sectors[0][64..72].try_into().unwrap()), 8192);
        assert_eq!(u32::from_le_bytes(sectors[0][100..104].try_into().unwrap()), 0x414E594F);
        assert_eq!(sectors[0][112], 0xFF);
        assert_eq!(&sectors[4][510..], &[0x55, 0xAA]);
        assert!(sectors[9].iter().all(|b| *b == 0));

        let mut sum = 0u32;
        for (index, sector) in sectors[..11].iter().enumerate() {
            for (i, &byte) in sector.iter().enumerate() {
                if index == 0 && matches!(i, 106 | 107 | 112) {
                    continue;
                }
                sum = sum.rotate_right(1).wrapping_add(byte as u32);
            }
        }
        assert_eq!(boot_checksum(&sectors), sum);
        for word in sectors[11].chunks(4) {
            assert_eq!(u32::from_le_bytes(word.try_into().unwrap()), sum);
        }

        // Flags and usage are excluded from the checksum
        boot_sector.percent_inuse = 50;
        boot_sector.volume_flags = 2u16.into();
        assert_eq!(boot_region(boot_sector)[11], sectors[11]);
    }
}
