use core::mem;

use crate::endian::Little as LE;
use crate::error::Result;
use crate::image::Image;
use crate::types::{SectorID, SECTOR_SIZE};

pub const PROTECTIVE: u8 = 0xEE;
pub const PARTITION_TABLE_OFFSET: usize = 446;

#[derive(Copy, Clone, Debug, Default)]
#[repr(C, packed(1))]
pub struct PartitionRecord {
    pub boot_indicator: u8,
    pub start_chs: [u8; 3],
    pub os_type: u8,
    pub end_chs: [u8; 3],
    pub starting_lba: LE<u32>,
    pub size_in_lba: LE<u32>,
}

impl PartitionRecord {
    /// Single record covering the whole disk, clamped to 32-bit LBAs
    pub fn protective(total_sectors: u64) -> Self {
        let size = total_sectors.saturating_sub(1).min(u32::MAX as u64) as u32;
        Self {
            boot_indicator: 0,
            start_chs: hex!("00 02 00"),
            os_type: PROTECTIVE,
            end_chs: hex!("FF FF FF"),
            starting_lba: 1u32.into(),
            size_in_lba: size.into(),
        }
    }

    pub fn starting_lba(&self) -> u32 {
        self.starting_lba.to_ne()
    }

    pub fn size_in_lba(&self) -> u32 {
        self.size_in_lba.to_ne()
    }
}

#[derive(Copy, Clone, Debug)]
#[repr(C, packed(1))]
pub struct MasterBootRecord {
    pub bootstrap: [u8; 440],
    pub disk_signature: LE<u32>,
    _reserved: [u8; 2],
    pub partitions: [PartitionRecord; 4],
    pub signature: [u8; 2],
}

impl MasterBootRecord {
    pub fn protective(total_sectors: u64) -> Self {
        let mut partitions = [PartitionRecord::default(); 4];
        partitions[0] = PartitionRecord::protective(total_sectors);
        Self {
            bootstrap: [0; 440],
            disk_signature: LE::default(),
            _reserved: [0; 2],
            partitions,
            signature: hex!("55 AA"),
        }
    }

    pub fn to_bytes(self) -> [u8; SECTOR_SIZE] {
        unsafe { mem::transmute(self) }
    }

    pub fn from_bytes(bytes: &[u8; SECTOR_SIZE]) -> Self {
        unsafe { mem::transmute(*bytes) }
    }
}

/// Reserves sector 0 and fills it with a GUID protective MBR
pub fn write_protective_mbr(image: &mut Image) -> Result<()> {
    let total_sectors = image.sectors();
    let reservation = image.reserve("protective MBR", SectorID::BOOT, 1)?;
    let mbr = MasterBootRecord::protective(total_sectors);
    debug!("Protective MBR covering sectors 1..{}", mbr.partitions[0].size_in_lba() as u64 + 1);
    image.write(&reservation, 0, &mbr.to_bytes())
}

#[cfg(test)]
mod test {
    use memoffset::offset_of;

    use super::{write_protective_mbr, MasterBootRecord, PARTITION_TABLE_OFFSET};
    use crate::image::Image;

    #[test]
    fn test_layout() {
        assert_eq!(core::mem::size_of::<MasterBootRecord>(), 512);
        assert_eq!(offset_of!(MasterBootRecord, partitions), PARTITION_TABLE_OFFSET);
    }

    #[test]
    fn test_protective_mbr() {
        let mut image = Image::new(131072 * 512).unwrap();
        write_protective_mbr(&mut image).unwrap();
        let sector = &image.as_bytes()[..512];
        assert_eq!(&sector[446..462], &[0, 0, 2, 0, 0xEE, 0xFF, 0xFF, 0xFF, 1, 0, 0, 0, 0xFF, 0xFF, 0x01, 0]);
        assert!(sector[462..510].iter().all(|b| *b == 0));
        assert_eq!(&sector[510..], &[0x55, 0xAA]);

        let mbr = MasterBootRecord::protective(1 << 33);
        assert_eq!(mbr.partitions[0].size_in_lba(), u32::MAX);
        assert_eq!(mbr.partitions[0].starting_lba(), 1);
        assert!(write_protective_mbr(&mut image).is_err());
    }
}
