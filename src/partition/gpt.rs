use alloc::vec;
use alloc::vec::Vec;
use core::mem;

use gpt_disk_types::{BlockSize, GptHeader, GptPartitionEntryArray, GptPartitionName, LbaLe, U32Le};

use super::Partition;
use crate::error::{Error, Result};
use crate::image::Image;
use crate::types::{SectorID, SECTOR_SIZE};

pub const HEADER_SIZE: usize = 92;
pub const ENTRY_COUNT: u32 = 128;
pub const ENTRY_SIZE: u32 = 128;
/// Sectors taken by one copy of the partition entry array
pub const ENTRY_SECTORS: u64 = (ENTRY_COUNT * ENTRY_SIZE) as u64 / SECTOR_SIZE as u64;
pub const FIRST_USABLE_LBA: u64 = 2 + ENTRY_SECTORS;
pub const NAME_LENGTH: usize = 36;

/// Last LBA a partition may use on a disk of `total_sectors`
pub fn last_usable_lba(total_sectors: u64) -> u64 {
    total_sectors - 2 - ENTRY_SECTORS
}

fn partition_name(name: &str) -> Result<GptPartitionName> {
    let too_long = || {
        let message = format!("GPT partition name {:?} is longer than {} UTF-16 units", name, NAME_LENGTH);
        Error::SizeConstraintViolation(message)
    };
    if name.encode_utf16().count() > NAME_LENGTH {
        return Err(too_long());
    }
    name.parse::<GptPartitionName>().map_err(|_| too_long())
}

fn header_bytes(header: GptHeader) -> [u8; HEADER_SIZE] {
    unsafe { mem::transmute(header) }
}

/// Writes primary header and entries at LBA 1 and 2, backup entries and header at the disk end
pub fn create_gpt(image: &mut Image, disk_guid: uguid::Guid, partitions: &[Partition]) -> Result<()> {
    let total_sectors = image.sectors();
    if total_sectors < 2 * (1 + ENTRY_SECTORS) + 2 {
        let message = format!("{} sectors cannot hold two GPT copies and a partition", total_sectors);
        return Err(Error::SizeConstraintViolation(message));
    }
    if partitions.len() > ENTRY_COUNT as usize {
        let message = format!("{} partitions exceed the {} GPT entries", partitions.len(), ENTRY_COUNT);
        return Err(Error::SizeConstraintViolation(message));
    }
    let backup_lba = total_sectors - 1;
    let backup_entries_lba = backup_lba - ENTRY_SECTORS;

    let mut header = GptHeader {
        my_lba: LbaLe::from_u64(1),
        alternate_lba: LbaLe::from_u64(backup_lba),
        first_usable_lba: LbaLe::from_u64(FIRST_USABLE_LBA),
        last_usable_lba: LbaLe::from_u64(last_usable_lba(total_sectors)),
        disk_guid,
        partition_entry_lba: LbaLe::from_u64(2),
        number_of_partition_entries: U32Le::from_u32(ENTRY_COUNT),
        ..Default::default()
    };
    let layout = header
        .get_partition_entry_array_layout()
        .map_err(|e| Error::MalformedInput(format!("GPT entry layout: {:?}", e)))?;

    let mut storage = vec![0u8; ENTRY_SECTORS as usize * SECTOR_SIZE];
    let mut entries = GptPartitionEntryArray::new(layout, BlockSize::BS_512, &mut storage)
        .map_err(|e| Error::MalformedInput(format!("GPT entry array: {:?}", e)))?;
    for (index, partition) in partitions.iter().enumerate() {
        let name = partition_name(&partition.name)?;
        let Some(entry) = entries.get_partition_entry_mut(index as u32) else {
            return Err(Error::OutOfBounds {
                target: "GPT entry array",
                offset: index as u64 * ENTRY_SIZE as u64,
                len: ENTRY_SIZE as u64,
                limit: (ENTRY_COUNT * ENTRY_SIZE) as u64,
            });
        };
        entry.partition_type_guid = partition.type_guid;
        entry.unique_partition_guid = partition.unique_guid;
        entry.starting_lba = LbaLe::from_u64(partition.first_lba);
        entry.ending_lba = LbaLe::from_u64(partition.last_lba);
        entry.name = name;
        info!(
            "GPT partition {} {:?}: sectors {}..={} ({} KiB)",
            index + 1,
            partition.name,
            partition.first_lba,
            partition.last_lba,
            (partition.last_lba + 1 - partition.first_lba) / 2
        );
    }
    header.partition_entry_array_crc32 = entries.calculate_crc32();
    header.update_header_crc32();
    let array: Vec<u8> = entries.storage().to_vec();

    let mut backup = header.clone();
    backup.my_lba = header.alternate_lba;
    backup.alternate_lba = header.my_lba;
    backup.partition_entry_lba = LbaLe::from_u64(backup_entries_lba);
    backup.update_header_crc32();

    let primary = image.reserve("primary GPT", SectorID::from(1), 1 + ENTRY_SECTORS)?;
    image.write(&primary, 0, &header_bytes(header))?;
    image.write(&primary, SECTOR_SIZE as u64, &array)?;
    let secondary = image.reserve("backup GPT", SectorID::from(backup_entries_lba), 1 + ENTRY_SECTORS)?;
    image.write(&secondary, 0, &array)?;
    image.write(&secondary, ENTRY_SECTORS * SECTOR_SIZE as u64, &header_bytes(backup))?;
    debug!("GPT headers at LBA 1 and {}, entries at LBA 2 and {}", backup_lba, backup_entries_lba);
    Ok(())
}
