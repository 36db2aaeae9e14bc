// On-disk structures the formatter serializes, in volume order

/// VBR, extended boot sectors and checksum sector, written once as main and once as backup
pub(crate) mod boot;

/// Values stored in the FAT; only the bitmap, the up-case table and directories are chained
pub(crate) mod fat;

/// Root directory entries and file entry sets placed in the cluster heap
pub(crate) mod data;
