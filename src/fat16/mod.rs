//! FAT16 formatter with VFAT long file names

pub mod boot;
pub mod entry;
pub mod name;

use alloc::vec::Vec;

pub use boot::Geometry;
use boot::{BootSector, NUMBER_OF_FATS, ROOT_ENTRY_COUNT};
use entry::{Attributes, DirectoryEntry, DELETED, ENTRY_SIZE, FREE};
use name::ShortNames;

use crate::error::{Error, Result};
use crate::fs::{self, FileSystem};
use crate::image::Volume;
use crate::sysroot::HostTree;
use crate::timestamp::Timestamp;
use crate::types::{ClusterID, SECTOR_SIZE};

pub const MEDIA_ENTRY: u16 = 0xFFF8;
pub const END_OF_CHAIN: u16 = 0xFFFF;
pub const DEFAULT_LABEL: &str = "NO NAME";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Directory {
    /// Fixed size root region between the FATs and the cluster heap
    Root,
    Cluster(ClusterID),
}

impl Directory {
    /// Cluster number recorded in a `..` entry, 0 standing for the root
    fn cluster(self) -> ClusterID {
        match self {
            Self::Root => ClusterID::default(),
            Self::Cluster(cluster) => cluster,
        }
    }
}

fn label_bytes(label: &str) -> [u8; 11] {
    let mut bytes = [b' '; 11];
    let upper = label.chars().map(|c| match c.is_ascii() {
        true => c.to_ascii_uppercase() as u8,
        false => b'_',
    });
    bytes.iter_mut().zip(upper).for_each(|(slot, b)| *slot = b);
    bytes
}

pub struct Fat16<'a> {
    volume: Volume<'a>,
    geometry: Geometry,
    label: [u8; 11],
    timestamp: Timestamp,
    next_cluster: ClusterID,
    short_names: ShortNames,
}

impl<'a> Fat16<'a> {
    pub fn new(volume: Volume<'a>, sectors_per_cluster: u8) -> Result<Self> {
        let geometry = Geometry::solve(volume.sectors(), sectors_per_cluster)?;
        info!(
            "FAT16 at sector {}: {} clusters of {} sectors, FAT size {} sectors, data from sector {}",
            volume.start(),
            geometry.cluster_count,
            sectors_per_cluster,
            geometry.fat_size,
            geometry.first_data_sector()
        );
        Ok(Self {
            volume,
            geometry,
            label: label_bytes(DEFAULT_LABEL),
            timestamp: Timestamp::default(),
            next_cluster: ClusterID::FIRST,
            short_names: ShortNames::default(),
        })
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = label_bytes(label);
        self
    }

    pub fn timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Clusters handed out so far
    pub fn used_clusters(&self) -> u32 {
        self.next_cluster.offset()
    }

    pub fn write_boot_sector(&mut self) -> Result<()> {
        let hidden_sectors = u32::try_from(u64::from(self.volume.start())).unwrap_or(u32::MAX);
        let boot_sector = BootSector::new(&self.geometry, hidden_sectors, self.label);
        self.volume.write(0, &boot_sector.to_bytes())
    }

    /// Clears both FATs and the root directory, then sets the two reserved entries
    pub fn init_fat(&mut self) -> Result<()> {
        let fat_bytes = self.geometry.fat_size as u64 * SECTOR_SIZE as u64;
        let first_fat = self.geometry.first_fat_sector() as u64 * SECTOR_SIZE as u64;
        self.volume.zero(first_fat, fat_bytes * NUMBER_OF_FATS as u64)?;
        self.volume.zero(self.root_offset(), ROOT_ENTRY_COUNT as u64 * ENTRY_SIZE as u64)?;
        self.set_fat_entry(ClusterID::from(0), MEDIA_ENTRY)?;
        self.set_fat_entry(ClusterID::from(1), END_OF_CHAIN)
    }

    fn root_offset(&self) -> u64 {
        self.geometry.root_directory_sector() as u64 * SECTOR_SIZE as u64
    }

    fn cluster_offset(&self, cluster: ClusterID) -> u64 {
        let sector = self.geometry.first_data_sector() as u64
            + cluster.offset() as u64 * self.geometry.sectors_per_cluster as u64;
        sector * SECTOR_SIZE as u64
    }

    fn cluster_size(&self) -> u64 {
        self.geometry.cluster_size() as u64
    }

    fn set_fat_entry(&mut self, cluster: ClusterID, value: u16) -> Result<()> {
        trace!("FAT[{}] = {:#06X}", cluster, value);
        for copy in 0..NUMBER_OF_FATS {
            let sector = self.geometry.first_fat_sector() + copy * self.geometry.fat_size;
            let offset = sector as u64 * SECTOR_SIZE as u64 + u32::from(cluster) as u64 * 2;
            self.volume.write(offset, &value.to_le_bytes())?;
        }
        Ok(())
    }

    pub fn fat_entry(&self, cluster: ClusterID) -> Result<u16> {
        let offset = self.geometry.first_fat_sector() as u64 * SECTOR_SIZE as u64 + u32::from(cluster) as u64 * 2;
        let bytes = self.volume.read(offset, 2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Sequential chain of `count` clusters, linked and terminated in both FATs
    fn allocate(&mut self, count: u32) -> Result<ClusterID> {
        let first = self.next_cluster;
        let available = self.geometry.cluster_count - first.offset();
        if count > available {
            return Err(Error::CapacityExhausted { filesystem: "FAT16", clusters: count });
        }
        for i in 0..count {
            let cluster = first + i;
            let next = match i + 1 < count {
                true => u32::from(cluster) as u16 + 1,
                false => END_OF_CHAIN,
            };
            self.set_fat_entry(cluster, next)?;
        }
        self.next_cluster = first + count;
        Ok(first)
    }

    fn chain(&self, first: ClusterID) -> Result<Vec<ClusterID>> {
        let mut clusters = Vec::new();
        let mut cluster = first;
        while cluster.valid() && clusters.len() <= self.geometry.cluster_count as usize {
            clusters.push(cluster);
            let next = self.fat_entry(cluster)?;
            if next >= MEDIA_ENTRY {
                break;
            }
            cluster = ClusterID::from(next as u32);
        }
        Ok(clusters)
    }

    /// Byte offsets of every entry slot of `directory`, in order
    fn slots(&self, directory: Directory) -> Result<Vec<u64>> {
        let step = ENTRY_SIZE as u64;
        match directory {
            Directory::Root => {
                let root = self.root_offset();
                Ok((0..ROOT_ENTRY_COUNT as u64).map(|i| root + i * step).collect())
            }
            Directory::Cluster(first) => {
                let per_cluster = self.cluster_size() / step;
                let chain = self.chain(first)?;
                let slots = chain.into_iter().flat_map(|cluster| {
                    let base = self.cluster_offset(cluster);
                    (0..per_cluster).map(move |i| base + i * step)
                });
                Ok(slots.collect())
            }
        }
    }

    fn find_free_run(&self, directory: Directory, needed: usize) -> Result<Option<Vec<u64>>> {
        let slots = self.slots(directory)?;
        let mut run = 0;
        for (index, &offset) in slots.iter().enumerate() {
            let first = self.volume.read(offset, 1)?[0];
            match first == FREE || first == DELETED {
                true => run += 1,
                false => run = 0,
            }
            if run == needed {
                return Ok(Some(slots[index + 1 - needed..=index].to_vec()));
            }
        }
        Ok(None)
    }

    /// Links one zeroed cluster to the end of a subdirectory chain
    fn extend_directory(&mut self, first: ClusterID) -> Result<()> {
        let last = self.chain(first)?.last().copied().unwrap_or(first);
        let cluster = self.allocate(1)?;
        self.volume.zero(self.cluster_offset(cluster), self.cluster_size())?;
        self.set_fat_entry(last, u32::from(cluster) as u16)?;
        debug!("Directory at cluster {} extended with cluster {}", first, cluster);
        Ok(())
    }

    fn insert_entries(&mut self, directory: Directory, entries: &[[u8; ENTRY_SIZE]]) -> Result<()> {
        let slots = loop {
            if let Some(slots) = self.find_free_run(directory, entries.len())? {
                break slots;
            }
            match directory {
                Directory::Root => {
                    let message = format!("FAT16 root directory is full ({} entries)", ROOT_ENTRY_COUNT);
                    return Err(Error::SizeConstraintViolation(message));
                }
                Directory::Cluster(first) => self.extend_directory(first)?,
            }
        };
        for (offset, entry) in slots.into_iter().zip(entries) {
            self.volume.write(offset, entry)?;
        }
        Ok(())
    }

    /// Long name group, if the name needs one, followed by the 8.3 entry
    fn entry_group(&mut self, name: &str, entry: DirectoryEntry) -> Result<Vec<[u8; ENTRY_SIZE]>> {
        if !name::needs_long_name(name) {
            let mut entry = entry;
            entry.name = name::short_name(name);
            return Ok(vec![entry.to_bytes()]);
        }
        let short = self.short_names.generate(name);
        let mut group: Vec<_> = name::long_name_entries(name, &short)?.into_iter().map(|e| e.to_bytes()).collect();
        debug!("{} stored with {} long name entries as {}", name, group.len(), String::from_utf8_lossy(&short));
        let mut entry = entry;
        entry.name = short;
        group.push(entry.to_bytes());
        Ok(group)
    }

    pub fn create_directory(&mut self, parent: Directory, name: &str) -> Result<Directory> {
        let cluster = self.allocate(1)?;
        self.volume.zero(self.cluster_offset(cluster), self.cluster_size())?;
        let attributes = Attributes::new(true);
        let dot = DirectoryEntry::new(name::short_name("."), attributes, self.timestamp).with_cluster(cluster);
        let dotdot = DirectoryEntry::new(name::short_name(".."), attributes, self.timestamp).with_cluster(parent.cluster());
        let offset = self.cluster_offset(cluster);
        self.volume.write(offset, &dot.to_bytes())?;
        self.volume.write(offset + ENTRY_SIZE as u64, &dotdot.to_bytes())?;

        let entry = DirectoryEntry::new([b' '; 11], attributes, self.timestamp).with_cluster(cluster);
        let group = self.entry_group(name, entry)?;
        self.insert_entries(parent, &group)?;
        debug!("Directory {} at cluster {}", name, cluster);
        Ok(Directory::Cluster(cluster))
    }

    pub fn add_file(&mut self, parent: Directory, name: &str, data: &[u8]) -> Result<()> {
        let size = u32::try_from(data.len()).map_err(|_| {
            Error::SizeConstraintViolation(format!("{} is too large for FAT16 ({} bytes)", name, data.len()))
        })?;
        let count = (size as u64).div_ceil(self.cluster_size()) as u32;
        let cluster = match count {
            0 => ClusterID::default(),
            _ => self.allocate(count)?,
        };
        // Sequential allocation keeps every chain contiguous
        if count > 0 {
            self.volume.write(self.cluster_offset(cluster), data)?;
        }
        let entry = DirectoryEntry::new([b' '; 11], Attributes::new(false), self.timestamp)
            .with_cluster(cluster)
            .with_size(size);
        let group = self.entry_group(name, entry)?;
        self.insert_entries(parent, &group)?;
        info!("FAT16 file {} ({} bytes): {} cluster(s) from {}", name, size, count, cluster);
        Ok(())
    }

    pub fn write_volume_label(&mut self) -> Result<()> {
        let entry = DirectoryEntry::new(self.label, Attributes::label(), self.timestamp);
        self.insert_entries(Directory::Root, &[entry.to_bytes()])
    }

    /// Fails when the root entries of `tree`, the volume label included, cannot fit
    pub fn check_root_capacity(tree: &HostTree) -> Result<()> {
        let needed: usize = 1 + tree.root_entries().map(|node| 1 + name::long_entry_count(&node.name)).sum::<usize>();
        if needed > ROOT_ENTRY_COUNT as usize {
            let message = format!("{} root entries needed, FAT16 root holds {}", needed, ROOT_ENTRY_COUNT);
            return Err(Error::SizeConstraintViolation(message));
        }
        Ok(())
    }

    pub fn populate_from_tree(&mut self, tree: &HostTree) -> Result<()> {
        Self::check_root_capacity(tree)?;
        self.write_volume_label()?;
        fs::populate(self, tree)
    }
}

impl<'a> FileSystem for Fat16<'a> {
    type Directory = Directory;

    fn write_boot_region(&mut self) -> Result<()> {
        self.write_boot_sector()?;
        self.init_fat()
    }

    fn root(&self) -> Directory {
        Directory::Root
    }

    fn create_directory(&mut self, parent: Directory, name: &str) -> Result<Directory> {
        Fat16::create_directory(self, parent, name)
    }

    fn allocate_and_write_file(&mut self, parent: Directory, name: &str, data: &[u8]) -> Result<()> {
        self.add_file(parent, name, data)
    }

    fn populate(&mut self, tree: &HostTree) -> Result<()> {
        self.populate_from_tree(tree)
    }

    fn flush(&mut self) -> Result<()> {
        let used = self.used_clusters();
        info!("FAT16 volume: {} of {} clusters used", used, self.geometry.cluster_count);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use alloc::vec::Vec;

    use super::entry::{DirectoryEntry, ENTRY_SIZE};
    use super::{Directory, Fat16, END_OF_CHAIN};
    use crate::error::Error;
    use crate::fs::FileSystem;
    use crate::image::Image;
    use crate::sysroot::{HostTree, Kind};
    use crate::types::{ClusterID, SectorID};

    fn pattern(len: usize, seed: u8) -> Vec<u8> {
        (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
    }

    struct Reader<'a> {
        bytes: &'a [u8],
        spc: u64,
        fat_size: u64,
    }

    impl<'a> Reader<'a> {
        fn fat(&self, copy: u64, cluster: u32) -> u16 {
            let offset = (1 + copy * self.fat_size) as usize * 512 + cluster as usize * 2;
            u16::from_le_bytes([self.bytes[offset], self.bytes[offset + 1]])
        }

        fn data_offset(&self, cluster: u32) -> usize {
            (1 + 2 * self.fat_size + 32 + (cluster as u64 - 2) * self.spc) as usize * 512
        }

        fn chain(&self, first: u32) -> Vec<u32> {
            let mut chain = vec![first];
            loop {
                let next = self.fat(0, *chain.last().unwrap());
                if next >= 0xFFF8 {
                    return chain;
                }
                chain.push(next as u32);
            }
        }

        fn read_file(&self, first: u32, size: usize) -> Vec<u8> {
            let cluster_size = self.spc as usize * 512;
            let mut data: Vec<u8> = Vec::new();
            for cluster in self.chain(first) {
                let offset = self.data_offset(cluster);
                data.extend_from_slice(&self.bytes[offset..offset + cluster_size]);
            }
            data.truncate(size);
            data
        }

        fn entries(&self, directory: Option<u32>) -> Vec<DirectoryEntry> {
            let raw: Vec<u8> = match directory {
                None => {
                    let offset = (1 + 2 * self.fat_size) as usize * 512;
                    self.bytes[offset..offset + 512 * 32].to_vec()
                }
                Some(first) => {
                    let size = self.chain(first).len() * self.spc as usize * 512;
                    self.read_file(first, size)
                }
            };
            raw.chunks(ENTRY_SIZE)
                .filter(|chunk| chunk[0] != 0 && chunk[11] != 0x0F)
                .map(|chunk| DirectoryEntry::from_bytes(chunk.try_into().unwrap()))
                .collect()
        }

        fn find(&self, directory: Option<u32>, name: &[u8; 11]) -> DirectoryEntry {
            let entries = self.entries(directory);
            *entries.iter().find(|entry| &{ entry.name } == name).unwrap()
        }
    }

    #[test]
    fn test_readme_and_bin() {
        let mut tree = HostTree::default();
        let bin = tree.push(None, "BIN", Kind::Directory);
        tree.push(Some(bin), "APP.BIN", Kind::File(pattern(20000, 7)));
        tree.push(None, "README.TXT", Kind::File(pattern(5000, 1)));

        let mut image = Image::new(8 * 1024 * 1024).unwrap();
        let reservation = image.reserve("fat16", SectorID::BOOT, image.sectors()).unwrap();
        let fat_size = {
            let mut fat16 = Fat16::new(image.volume(&reservation), 8).unwrap();
            fat16.write_boot_region().unwrap();
            fat16.populate_from_tree(&tree).unwrap();
            fat16.flush().unwrap();
            fat16.geometry().fat_size as u64
        };

        let bytes = image.as_bytes();
        let reader = Reader { bytes, spc: 8, fat_size };
        assert_eq!(reader.fat(0, 0), 0xFFF8);
        assert_eq!(reader.fat(0, 1), 0xFFFF);

        let root = reader.entries(None);
        assert_eq!(&{ root[0].name }, b"NO NAME    ");
        assert_eq!(root[0].attributes, 0x08);

        let readme = reader.find(None, b"README  TXT");
        assert_eq!(readme.size(), 5000);
        let chain = reader.chain(u32::from(readme.cluster()));
        assert_eq!(chain.len(), 2);
        assert_eq!(reader.fat(0, *chain.last().unwrap()), END_OF_CHAIN);
        assert_eq!(reader.read_file(u32::from(readme.cluster()), 5000), pattern(5000, 1));

        let bin = reader.find(None, b"BIN        ");
        assert_eq!(bin.attributes, 0x10);
        let bin_cluster = u32::from(bin.cluster());
        assert_eq!(reader.chain(bin_cluster).len(), 1);

        let dot = reader.find(Some(bin_cluster), b".          ");
        assert_eq!(u32::from(dot.cluster()), bin_cluster);
        let dotdot = reader.find(Some(bin_cluster), b"..         ");
        assert_eq!(u32::from(dotdot.cluster()), 0);

        let app = reader.find(Some(bin_cluster), b"APP     BIN");
        let chain = reader.chain(u32::from(app.cluster()));
        assert_eq!(chain.len(), 5);
        assert_eq!(reader.fat(0, *chain.last().unwrap()), END_OF_CHAIN);
        assert_eq!(reader.read_file(u32::from(app.cluster()), 20000), pattern(20000, 7));

        let fat = (1 + fat_size as usize) * 512;
        assert_eq!(bytes[512..fat], bytes[fat..fat + fat_size as usize * 512]);
    }

    #[test]
    fn test_long_names_and_growth() {
        let mut image = Image::new(4 * 1024 * 1024).unwrap();
        let reservation = image.reserve("fat16", SectorID::BOOT, image.sectors()).unwrap();
        let (fat_size, directory) = {
            let mut fat16 = Fat16::new(image.volume(&reservation), 1).unwrap();
            fat16.write_boot_region().unwrap();
            fat16.add_file(Directory::Root, "kernel.bin", b"kernel").unwrap();
            fat16.add_file(Directory::Root, "empty", &[]).unwrap();
            let directory = fat16.create_directory(Directory::Root, "DIR").unwrap();
            for i in 0..20 {
                fat16.add_file(directory, &format!("F{}", i), &[i as u8]).unwrap();
            }
            let Directory::Cluster(cluster) = directory else { panic!("root returned") };
            (fat16.geometry().fat_size as u64, u32::from(cluster))
        };

        let reader = Reader { bytes: image.as_bytes(), spc: 1, fat_size };
        let root_offset = (1 + 2 * fat_size) as usize * 512;
        let root = &image.as_bytes()[root_offset..];
        assert_eq!(root[0], 0x41);
        assert_eq!(root[11], 0x0F);
        assert_eq!(&root[32..43], b"KERNEL~1BIN");
        assert_eq!(root[13], super::name::checksum(b"KERNEL~1BIN"));

        let empty = reader.find(None, b"EMPTY~1    ");
        assert_eq!(empty.cluster(), ClusterID::default());
        assert_eq!(empty.size(), 0);

        assert_eq!(reader.chain(directory).len(), 2);
        let entries = reader.entries(Some(directory));
        assert_eq!(entries.len(), 22);
        let f19 = reader.find(Some(directory), b"F19        ");
        assert_eq!(reader.read_file(u32::from(f19.cluster()), 1), [19]);
    }

    #[test]
    fn test_root_overflow() {
        let mut tree = HostTree::default();
        for i in 0..600 {
            tree.push(None, &format!("F{}", i), Kind::File(Vec::new()));
        }
        assert!(matches!(Fat16::check_root_capacity(&tree), Err(Error::SizeConstraintViolation(_))));

        let mut image = Image::new(4 * 1024 * 1024).unwrap();
        let reservation = image.reserve("fat16", SectorID::BOOT, image.sectors()).unwrap();
        let mut fat16 = Fat16::new(image.volume(&reservation), 1).unwrap();
        fat16.write_boot_region().unwrap();
        assert!(fat16.populate_from_tree(&tree).is_err());
        let root_offset = (1 + 2 * fat16.geometry().fat_size as u64) * 512;
        drop(fat16);
        assert!(image.as_bytes()[root_offset as usize..root_offset as usize + 512].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_capacity_exhausted() {
        let mut image = Image::new(256 * 1024).unwrap();
        let reservation = image.reserve("fat16", SectorID::BOOT, image.sectors()).unwrap();
        let mut fat16 = Fat16::new(image.volume(&reservation), 4).unwrap();
        fat16.write_boot_region().unwrap();
        let error = fat16.add_file(Directory::Root, "BIG", &vec![0; 512 * 1024]).unwrap_err();
        assert!(matches!(error, Error::CapacityExhausted { filesystem: "FAT16", .. }));
    }
}
