//! exFAT formatter
//!
//! Files are laid out contiguously and flagged `NoFatChain`, so only the allocation bitmap,
//! the up-case table and directories own FAT chains. The FAT and the bitmap are cached in
//! memory and written once by [`ExFat::flush_fat_and_bitmap`].

pub(crate) mod allocation_bitmap;
pub(crate) mod checksum;
pub(crate) mod fat;
pub(crate) mod region;
pub(crate) mod upcase_table;

use alloc::string::String;
use alloc::vec::Vec;
use std::collections::HashMap;

use allocation_bitmap::AllocationBitmap;
use fat::Fat;
pub use region::boot::Geometry;
use region::boot::{boot_region, BootSector, BOOT_REGION_SECTORS};
use region::data::entry_type::RawEntryType;
pub use region::data::entryset::primary::Permissions;
use region::data::entryset::{Allocation, EntrySet, RawEntry, ENTRY_SIZE};
use region::data::{AllocationBitmap as BitmapEntry, UpcaseTable as UpcaseEntry, VolumeLabel};
use region::fat::Entry;
use upcase_table::{UpcaseTable, UPCASE_TABLE_SIZE};

use crate::error::{Error, Result};
use crate::fs::{self, FileSystem};
use crate::image::Volume;
use crate::sysroot::HostTree;
use crate::timestamp::DateTime;
use crate::types::{ClusterID, SectorID, SECTOR_SIZE};

pub const DEFAULT_LABEL: &str = "mkimage";
/// Paths whose entries, and everything below them, get [`Permissions::ROOT_ONLY`]
pub const DEFAULT_ROOT_ONLY: [&str; 2] = ["System/sbin", "System/users/perm"];

struct DirectoryInfo {
    /// Slash separated, relative to the volume root
    path: String,
    /// Volume offset and entry count of the set describing this directory, none for the root
    entry_set: Option<(u64, usize)>,
    clusters: u32,
}

pub struct ExFat<'a> {
    volume: Volume<'a>,
    geometry: Geometry,
    bitmap: AllocationBitmap,
    fat: Fat,
    upcase_table: UpcaseTable,
    label: heapless::String<11>,
    now: DateTime,
    root_only: Vec<String>,
    directories: HashMap<ClusterID, DirectoryInfo>,
}

impl<'a> ExFat<'a> {
    pub fn new(volume: Volume<'a>, sectors_per_cluster: u8) -> Result<Self> {
        let geometry = Geometry::solve(volume.sectors(), sectors_per_cluster)?;
        info!(
            "exFAT at sector {}: {} clusters of {} sectors, FAT at {} ({} sectors), heap at {}",
            volume.start(),
            geometry.cluster_count,
            sectors_per_cluster,
            geometry.fat_offset,
            geometry.fat_length,
            geometry.cluster_heap_offset
        );
        let mut label = heapless::String::new();
        label.push_str(DEFAULT_LABEL).map_err(|_| Error::SizeConstraintViolation(DEFAULT_LABEL.into()))?;
        Ok(Self {
            volume,
            geometry,
            bitmap: AllocationBitmap::new(geometry.cluster_count),
            fat: Fat::new(geometry.cluster_count),
            upcase_table: UpcaseTable::default(),
            label,
            now: DateTime::default(),
            root_only: DEFAULT_ROOT_ONLY.iter().map(|path| String::from(*path)).collect(),
            directories: HashMap::new(),
        })
    }

    pub fn label(mut self, label: &str) -> Result<Self> {
        let mut string = heapless::String::new();
        if label.encode_utf16().count() > 11 || string.push_str(label).is_err() {
            let message = format!("exFAT volume label {:?} is longer than 11 characters", label);
            return Err(Error::SizeConstraintViolation(message));
        }
        self.label = string;
        Ok(self)
    }

    pub fn timestamp(mut self, now: DateTime) -> Self {
        self.now = now;
        self
    }

    pub fn root_only<S: AsRef<str>>(mut self, paths: &[S]) -> Self {
        self.root_only = paths.iter().map(|path| String::from(path.as_ref())).collect();
        self
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn used_clusters(&self) -> u32 {
        self.bitmap.num_inuse()
    }

    fn cluster_size(&self) -> u64 {
        self.geometry.cluster_size() as u64
    }

    /// Main boot region at sector 0 and its backup at sector 12
    pub fn write_boot_sectors(&mut self) -> Result<()> {
        let boot_sector = BootSector::new(&self.geometry, u64::from(self.volume.start()));
        let sectors = boot_region(boot_sector);
        for base in [0, BOOT_REGION_SECTORS] {
            for (index, sector) in sectors.iter().enumerate() {
                self.volume.write_sector(SectorID::from((base + index) as u64), sector)?;
            }
        }
        Ok(())
    }

    /// Chain of `count` freshly allocated clusters, terminated in the FAT cache
    fn allocate_chain(&mut self, count: u32) -> Result<ClusterID> {
        let first = self.bitmap.allocate()?;
        let mut last = first;
        for _ in 1..count {
            let next = self.bitmap.allocate()?;
            self.fat.set(last, Entry::Next(next));
            last = next;
        }
        self.fat.set(last, Entry::Last);
        Ok(first)
    }

    /// Allocates bitmap, up-case table and root directory clusters and writes the root's
    /// bitmap, up-case table and volume label entries
    pub fn init_fs(&mut self) -> Result<()> {
        let bitmap = self.allocate_chain(self.geometry.bitmap_clusters())?;
        let upcase = self.allocate_chain(1)?;
        let root = self.allocate_chain(1)?;
        if root != self.geometry.root_cluster() {
            let message = format!("exFAT root at cluster {}, boot sector names {}", root, self.geometry.root_cluster());
            return Err(Error::MalformedInput(message));
        }

        let upcase_offset = self.geometry.cluster_offset(upcase);
        self.volume.zero(upcase_offset, self.cluster_size())?;
        self.volume.write(upcase_offset, &self.upcase_table.to_bytes())?;

        let root_offset = self.geometry.cluster_offset(root);
        self.volume.zero(root_offset, self.cluster_size())?;
        let entries: [RawEntry; 3] = [
            BitmapEntry::new(bitmap.into(), self.geometry.bitmap_length() as u64).to_bytes(),
            UpcaseEntry::new(self.upcase_table.checksum(), upcase.into(), UPCASE_TABLE_SIZE as u64).to_bytes(),
            VolumeLabel::new(&self.label).to_bytes(),
        ];
        for (index, entry) in entries.iter().enumerate() {
            self.volume.write(root_offset + (index * ENTRY_SIZE) as u64, entry)?;
        }
        self.directories.insert(root, DirectoryInfo { path: String::new(), entry_set: None, clusters: 1 });
        info!("exFAT bitmap at cluster {}, up-case table at cluster {}, root at cluster {}", bitmap, upcase, root);
        Ok(())
    }

    fn child_path(&self, parent: ClusterID, name: &str) -> String {
        match self.directories.get(&parent).map(|info| info.path.as_str()) {
            None | Some("") => String::from(name),
            Some(path) => format!("{}/{}", path, name),
        }
    }

    /// Start slot of the first run of `needed` free entries inside one cluster
    fn find_free_run(&self, cluster_id: ClusterID, needed: usize) -> Result<Option<usize>> {
        let bytes = self.volume.read(self.geometry.cluster_offset(cluster_id), self.cluster_size())?;
        let mut run = 0;
        for (index, entry) in bytes.chunks(ENTRY_SIZE).enumerate() {
            match RawEntryType::from_byte(entry[0]).is_free() {
                true => run += 1,
                false => run = 0,
            }
            if run == needed {
                return Ok(Some(index + 1 - needed));
            }
        }
        Ok(None)
    }

    fn rewrite_length(&mut self, offset: u64, count: usize, length: u64) -> Result<()> {
        let bytes = self.volume.read(offset, (count * ENTRY_SIZE) as u64)?;
        let entries: Vec<RawEntry> = bytes
            .chunks(ENTRY_SIZE)
            .map(|chunk| {
                let mut entry = [0u8; ENTRY_SIZE];
                entry.copy_from_slice(chunk);
                entry
            })
            .collect();
        let mut entry_set = EntrySet::from_entries(entries);
        entry_set.set_length(length);
        self.volume.write(offset, &entry_set.to_bytes())
    }

    /// Links a zeroed cluster after `last` and updates the lengths recorded in the parent
    fn extend_directory(&mut self, directory: ClusterID, last: ClusterID) -> Result<ClusterID> {
        let cluster_id = self.bitmap.allocate()?;
        self.volume.zero(self.geometry.cluster_offset(cluster_id), self.cluster_size())?;
        self.fat.set(last, Entry::Next(cluster_id));
        self.fat.set(cluster_id, Entry::Last);

        let cluster_size = self.cluster_size();
        let Some(info) = self.directories.get_mut(&directory) else {
            return Ok(cluster_id);
        };
        info.clusters += 1;
        let length = info.clusters as u64 * cluster_size;
        debug!("Directory {:?} at cluster {} extended with cluster {}", info.path, directory, cluster_id);
        if let Some((offset, count)) = info.entry_set {
            self.rewrite_length(offset, count, length)?;
        }
        Ok(cluster_id)
    }

    /// Writes `entry_set` into `directory` without splitting it across clusters,
    /// returning the volume offset of its first entry
    fn insert_entry_set(&mut self, directory: ClusterID, entry_set: &EntrySet) -> Result<u64> {
        let needed = entry_set.len();
        if needed * ENTRY_SIZE > self.cluster_size() as usize {
            let message = format!("{} directory entries do not fit one {} byte cluster", needed, self.cluster_size());
            return Err(Error::SizeConstraintViolation(message));
        }
        let chain = self.fat.chain(directory);
        let mut found = None;
        for &cluster_id in chain.iter() {
            if let Some(slot) = self.find_free_run(cluster_id, needed)? {
                found = Some(self.geometry.cluster_offset(cluster_id) + (slot * ENTRY_SIZE) as u64);
                break;
            }
        }
        let offset = match found {
            Some(offset) => offset,
            None => {
                let last = chain.last().copied().unwrap_or(directory);
                let cluster_id = self.extend_directory(directory, last)?;
                self.geometry.cluster_offset(cluster_id)
            }
        };
        self.volume.write(offset, &entry_set.to_bytes())?;
        Ok(offset)
    }

    pub fn create_directory(&mut self, parent: ClusterID, name: &str) -> Result<ClusterID> {
        let cluster_id = self.allocate_chain(1)?;
        self.volume.zero(self.geometry.cluster_offset(cluster_id), self.cluster_size())?;
        let path = self.child_path(parent, name);
        let permissions = Permissions::for_path(&path, &self.root_only);
        let allocation = Allocation { first_cluster: cluster_id.into(), length: self.cluster_size(), contiguous: false };
        let entry_set = EntrySet::new(name, true, allocation, permissions, self.now, &self.upcase_table)?;
        let offset = self.insert_entry_set(parent, &entry_set)?;
        debug!("Directory {} at cluster {}, mode {:#o}", path, cluster_id, permissions.mode);
        let info = DirectoryInfo { path, entry_set: Some((offset, entry_set.len())), clusters: 1 };
        self.directories.insert(cluster_id, info);
        Ok(cluster_id)
    }

    pub fn add_file(&mut self, parent: ClusterID, name: &str, data: &[u8]) -> Result<()> {
        let count = u32::try_from((data.len() as u64).div_ceil(self.cluster_size())).map_err(|_| {
            Error::SizeConstraintViolation(format!("{} is too large for exFAT ({} bytes)", name, data.len()))
        })?;
        let first_cluster = match count {
            0 => 0,
            _ => {
                let first = self.bitmap.allocate_contiguous(count)?;
                self.volume.write(self.geometry.cluster_offset(first), data)?;
                u32::from(first)
            }
        };
        let path = self.child_path(parent, name);
        let permissions = Permissions::for_path(&path, &self.root_only);
        let allocation = Allocation { first_cluster, length: data.len() as u64, contiguous: true };
        let entry_set = EntrySet::new(name, false, allocation, permissions, self.now, &self.upcase_table)?;
        self.insert_entry_set(parent, &entry_set)?;
        info!("exFAT file {} ({} bytes): {} cluster(s) from {}", path, data.len(), count, first_cluster);
        Ok(())
    }

    pub fn populate_from_tree(&mut self, tree: &HostTree) -> Result<()> {
        fs::populate(self, tree)
    }

    pub fn flush_fat_and_bitmap(&mut self) -> Result<()> {
        let fat_offset = self.geometry.fat_offset as u64 * SECTOR_SIZE as u64;
        self.volume.zero(fat_offset, self.geometry.fat_length as u64 * SECTOR_SIZE as u64)?;
        self.volume.write(fat_offset, &self.fat.to_bytes())?;
        // Bitmap clusters are consecutive from cluster 2
        let bitmap_offset = self.geometry.cluster_offset(ClusterID::FIRST);
        self.volume.write(bitmap_offset, self.bitmap.as_bytes())?;
        info!(
            "exFAT volume: {} of {} clusters used ({}%)",
            self.bitmap.num_inuse(),
            self.geometry.cluster_count,
            self.bitmap.percent_inuse()
        );
        Ok(())
    }
}

impl<'a> FileSystem for ExFat<'a> {
    type Directory = ClusterID;

    fn write_boot_region(&mut self) -> Result<()> {
        self.write_boot_sectors()?;
        self.init_fs()
    }

    fn root(&self) -> ClusterID {
        self.geometry.root_cluster()
    }

    fn create_directory(&mut self, parent: ClusterID, name: &str) -> Result<ClusterID> {
        ExFat::create_directory(self, parent, name)
    }

    fn allocate_and_write_file(&mut self, parent: ClusterID, name: &str, data: &[u8]) -> Result<()> {
        self.add_file(parent, name, data)
    }

    fn flush(&mut self) -> Result<()> {
        self.flush_fat_and_bitmap()
    }
}

#[cfg(test)]
mod test {
    use alloc::string::String;
    use alloc::vec::Vec;

    use super::region::boot::{boot_checksum, Geometry};
    use super::region::data::entryset::{checksum, name_hash, RawEntry};
    use super::upcase_table::UpcaseTable;
    use super::ExFat;
    use crate::error::Error;
    use crate::fs::FileSystem;
    use crate::image::Image;
    use crate::sysroot::{HostTree, Kind};
    use crate::types::SectorID;

    const START: u64 = 2048;

    struct Reader<'a> {
        bytes: &'a [u8],
        geometry: Geometry,
    }

    struct Found {
        entries: Vec<RawEntry>,
    }

    impl Found {
        fn first_cluster(&self) -> u32 {
            u32::from_le_bytes(self.entries[1][20..24].try_into().unwrap())
        }

        fn length(&self) -> u64 {
            u64::from_le_bytes(self.entries[1][24..32].try_into().unwrap())
        }

        fn valid_length(&self) -> u64 {
            u64::from_le_bytes(self.entries[1][8..16].try_into().unwrap())
        }

        fn mode(&self) -> u16 {
            u16::from_le_bytes([self.entries[0][10], self.entries[0][11]])
        }

        fn flags(&self) -> u8 {
            self.entries[1][1]
        }
    }

    impl<'a> Reader<'a> {
        fn volume(&self) -> &[u8] {
            &self.bytes[(START * 512) as usize..]
        }

        fn cluster(&self, cluster: u32) -> &[u8] {
            let offset = self.geometry.cluster_offset(cluster.into()) as usize;
            &self.volume()[offset..offset + self.geometry.cluster_size() as usize]
        }

        fn fat(&self, cluster: u32) -> u32 {
            let offset = self.geometry.fat_offset as usize * 512 + cluster as usize * 4;
            u32::from_le_bytes(self.volume()[offset..offset + 4].try_into().unwrap())
        }

        fn chain(&self, first: u32) -> Vec<u32> {
            let mut chain = vec![first];
            loop {
                let next = self.fat(*chain.last().unwrap());
                if next == 0 || next >= 0xFFFFFFF7 {
                    return chain;
                }
                chain.push(next);
            }
        }

        fn allocated(&self, cluster: u32) -> bool {
            let bitmap = self.cluster(2);
            let offset = cluster - 2;
            bitmap[(offset / 8) as usize] & (1 << (offset % 8)) != 0
        }

        fn find(&self, directory: u32, name: &str) -> Option<Found> {
            let entries: Vec<RawEntry> = self
                .chain(directory)
                .into_iter()
                .flat_map(|cluster| self.cluster(cluster).chunks(32).map(|c| RawEntry::try_from(c).unwrap()).collect::<Vec<_>>())
                .collect();
            let mut index = 0;
            while index < entries.len() {
                let entry = entries[index];
                if entry[0] != 0x85 {
                    index += 1;
                    continue;
                }
                let count = entry[1] as usize + 1;
                let set = entries[index..index + count].to_vec();
                let length = set[1][3] as usize;
                let units: Vec<u16> = set[2..]
                    .iter()
                    .flat_map(|e| e[2..].chunks(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect::<Vec<_>>())
                    .take(length)
                    .collect();
                if String::from_utf16(&units).unwrap() == name {
                    return Some(Found { entries: set });
                }
                index += count;
            }
            None
        }
    }

    fn pattern(len: usize, seed: u8) -> Vec<u8> {
        (0..len).map(|i| (i as u8).wrapping_mul(13).wrapping_add(seed)).collect()
    }

    #[test]
    fn test_format() {
        let mut tree = HostTree::default();
        tree.push(None, "README.TXT", Kind::File(b"hello".to_vec()));
        tree.push(None, "empty", Kind::File(Vec::new()));
        let system = tree.push(None, "System", Kind::Directory);
        let sbin = tree.push(Some(system), "sbin", Kind::Directory);
        tree.push(Some(sbin), "init", Kind::File(pattern(10000, 3)));
        tree.push(Some(system), "fonts.conf", Kind::File(pattern(100, 5)));

        let mut image = Image::new((START + 16384) * 512).unwrap();
        let reservation = image.reserve("filesystem", SectorID::from(START), 16384).unwrap();
        let mut fs = ExFat::new(image.volume(&reservation), 8).unwrap();
        fs.write_boot_region().unwrap();
        fs.populate_from_tree(&tree).unwrap();
        fs.flush().unwrap();
        let geometry = *fs.geometry();
        drop(fs);

        let reader = Reader { bytes: image.as_bytes(), geometry };
        let volume = reader.volume();
        assert_eq!(&volume[3..11], b"EXFAT   ");
        assert_eq!(u64::from_le_bytes(volume[64..72].try_into().unwrap()), START);
        assert_eq!(u32::from_le_bytes(volume[96..100].try_into().unwrap()), 4);
        assert_eq!(&volume[..12 * 512], &volume[12 * 512..24 * 512]);
        let sectors: Vec<[u8; 512]> = volume[..11 * 512].chunks(512).map(|s| s.try_into().unwrap()).collect();
        assert_eq!(u32::from_le_bytes(volume[11 * 512..11 * 512 + 4].try_into().unwrap()), boot_checksum(&sectors));

        let root = reader.cluster(4);
        assert_eq!(root[0], 0x81);
        assert_eq!(u32::from_le_bytes(root[20..24].try_into().unwrap()), 2);
        assert_eq!(u64::from_le_bytes(root[24..32].try_into().unwrap()), geometry.bitmap_length() as u64);
        assert_eq!(root[32], 0x82);
        assert_eq!(u32::from_le_bytes(root[36..40].try_into().unwrap()), UpcaseTable::default().checksum());
        assert_eq!(u32::from_le_bytes(root[52..56].try_into().unwrap()), 3);
        assert_eq!(root[64], 0x83);
        assert_eq!(root[65], 7);
        assert_eq!(&reader.cluster(3)[..256], &UpcaseTable::default().to_bytes());
        assert_eq!(reader.fat(0), 0xFFFFFFF8);
        for cluster in 2..=4 {
            assert_eq!(reader.fat(cluster), 0xFFFFFFFF);
            assert!(reader.allocated(cluster));
        }

        let readme = reader.find(4, "README.TXT").unwrap();
        assert_eq!(readme.flags(), 0x03);
        assert_eq!(readme.length(), 5);
        assert_eq!(readme.valid_length(), 5);
        assert_eq!(readme.mode(), 0xFFF);
        let stored = u16::from_le_bytes([readme.entries[0][2], readme.entries[0][3]]);
        assert_eq!(stored, checksum(&readme.entries));
        let units: Vec<u16> = "README.TXT".encode_utf16().collect();
        let hash = u16::from_le_bytes([readme.entries[1][4], readme.entries[1][5]]);
        assert_eq!(hash, name_hash(&units, &UpcaseTable::default()));
        assert_eq!(&reader.cluster(readme.first_cluster())[..5], b"hello");
        assert_eq!(reader.fat(readme.first_cluster()), 0);
        assert!(reader.allocated(readme.first_cluster()));

        let empty = reader.find(4, "empty").unwrap();
        assert_eq!(empty.first_cluster(), 0);
        assert_eq!(empty.length(), 0);

        let system = reader.find(4, "System").unwrap();
        assert_eq!(system.flags(), 0x01);
        assert_eq!(system.mode(), 0xFFF);
        assert_eq!(system.length(), 4096);
        assert_eq!(u16::from_le_bytes([system.entries[0][4], system.entries[0][5]]), 0x10);
        assert_eq!(reader.fat(system.first_cluster()), 0xFFFFFFFF);
        assert_eq!(reader.find(system.first_cluster(), "fonts.conf").unwrap().mode(), 0xFFF);

        let sbin = reader.find(system.first_cluster(), "sbin").unwrap();
        assert_eq!(sbin.mode(), 0xF00);
        let init = reader.find(sbin.first_cluster(), "init").unwrap();
        assert_eq!(init.mode(), 0xF00);
        assert_eq!(init.length(), 10000);
        let first = init.first_cluster();
        let mut data = Vec::new();
        for cluster in first..first + 3 {
            assert!(reader.allocated(cluster));
            data.extend_from_slice(reader.cluster(cluster));
        }
        data.truncate(10000);
        assert_eq!(data, pattern(10000, 3));
    }

    #[test]
    fn test_directory_extension() {
        let mut image = Image::new((START + 4096) * 512).unwrap();
        let reservation = image.reserve("filesystem", SectorID::from(START), 4096).unwrap();
        let mut fs = ExFat::new(image.volume(&reservation), 1).unwrap();
        fs.write_boot_region().unwrap();
        let root = fs.root();
        let many = fs.create_directory(root, "many").unwrap();
        // Three entries per set, five sets per 512 byte cluster
        for index in 0..11 {
            fs.add_file(many, &format!("file{:02}", index), &[index as u8]).unwrap();
        }
        fs.flush().unwrap();
        let geometry = *fs.geometry();
        drop(fs);

        let reader = Reader { bytes: image.as_bytes(), geometry };
        let set = reader.find(4, "many").unwrap();
        let chain = reader.chain(set.first_cluster());
        assert_eq!(chain.len(), 3);
        assert!(chain.windows(2).all(|pair| pair[1] > pair[0] + 1));
        assert_eq!(set.length(), 3 * 512);
        assert_eq!(set.valid_length(), 3 * 512);
        let stored = u16::from_le_bytes([set.entries[0][2], set.entries[0][3]]);
        assert_eq!(stored, checksum(&set.entries));

        for index in 0..11 {
            let file = reader.find(set.first_cluster(), &format!("file{:02}", index)).unwrap();
            assert_eq!(reader.cluster(file.first_cluster())[0], index as u8);
        }
        // Each new cluster starts with a whole entry set
        assert_eq!(reader.cluster(chain[1])[0], 0x85);
        assert_eq!(reader.cluster(chain[2])[0], 0x85);
        assert_eq!(reader.cluster(chain[2])[96], 0x00);
    }

    #[test]
    fn test_errors() {
        let mut image = Image::new(4096 * 512).unwrap();
        let reservation = image.reserve("filesystem", SectorID::from(0), 4096).unwrap();
        let mut fs = ExFat::new(image.volume(&reservation), 1).unwrap();
        fs.write_boot_region().unwrap();
        let root = fs.root();

        let long = "n".repeat(255);
        assert!(matches!(fs.add_file(root, &long, b"x"), Err(Error::SizeConstraintViolation(_))));
        let too_long = "n".repeat(256);
        assert!(matches!(fs.add_file(root, &too_long, b""), Err(Error::SizeConstraintViolation(_))));

        let huge = vec![0u8; 4096 * 512];
        let error = fs.add_file(root, "huge", &huge).unwrap_err();
        assert!(matches!(error, Error::CapacityExhausted { filesystem: "exFAT", .. }));
        drop(fs);

        let mut image = Image::new(4096 * 512).unwrap();
        let reservation = image.reserve("filesystem", SectorID::from(0), 4096).unwrap();
        assert!(ExFat::new(image.volume(&reservation), 8).unwrap().label("EFI SYSTEM").is_ok());
        let mut image = Image::new(4096 * 512).unwrap();
        let reservation = image.reserve("filesystem", SectorID::from(0), 4096).unwrap();
        assert!(ExFat::new(image.volume(&reservation), 8).unwrap().label("much too long").is_err());
    }
}
