//! Protective MBR and GUID partition table

pub mod gpt;
pub mod mbr;

use alloc::string::String;

use gpt_disk_types::GptPartitionType;
use sha2::{Digest, Sha256};
use uguid::Guid;

pub use gpt::{create_gpt, last_usable_lba};
pub use mbr::write_protective_mbr;

pub const EFI_SYSTEM: GptPartitionType = GptPartitionType::EFI_SYSTEM;
pub const BASIC_DATA: GptPartitionType = GptPartitionType::BASIC_DATA;

/// Prefix hashed in front of every derived GUID
const GUID_SEED: &str = "mkimage";

/// Version 4 GUID derived from `name`, identical on every run
pub fn derive_guid(name: &str) -> Guid {
    let digest = Sha256::new().chain_update(GUID_SEED).chain_update(name).finalize();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    bytes[6] = (bytes[6] & 0x0F) | 0x40;
    bytes[8] = (bytes[8] & 0x3F) | 0x80;
    Guid::from_bytes(bytes)
}

/// One GPT entry; ranges are inclusive and not checked against each other
#[derive(Clone, Debug)]
pub struct Partition {
    pub type_guid: GptPartitionType,
    pub unique_guid: Guid,
    pub first_lba: u64,
    pub last_lba: u64,
    pub name: String,
}

impl Partition {
    /// Unique GUID derived from the partition name
    pub fn new(type_guid: GptPartitionType, name: &str, first_lba: u64, last_lba: u64) -> Self {
        let unique_guid = derive_guid(name);
        Self { type_guid, unique_guid, first_lba, last_lba, name: String::from(name) }
    }

    pub fn sectors(&self) -> u64 {
        self.last_lba + 1 - self.first_lba
    }
}

#[cfg(test)]
mod test {
    use super::{derive_guid, Partition, EFI_SYSTEM};

    #[test]
    fn test_derive_guid() {
        assert_eq!(derive_guid("Data"), derive_guid("Data"));
        assert_ne!(derive_guid("Data"), derive_guid("EFI System"));
        let bytes = derive_guid("Data").to_bytes();
        assert_eq!(bytes[6] >> 4, 4);
        assert_eq!(bytes[8] >> 6, 0b10);
        assert_eq!(Partition::new(EFI_SYSTEM, "EFI System", 2048, 8191).sectors(), 6144);
    }
}
