//! Bootable ISO 9660 images with an El Torito no-emulation boot entry
//!
//! Building happens in two phases. [`IsoBuilder::compute_layout`] assigns every
//! directory, the kernel and every file a CD sector and encodes the directory
//! extents and path tables without touching an image. [`LayoutPlan::materialize`]
//! then allocates the image, patches stage 2 with the kernel location the plan
//! settled on and writes everything out.

pub(crate) mod eltorito;
pub(crate) mod record;
pub(crate) mod volume;

use alloc::string::String;
use alloc::vec::Vec;
use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::error::{Error, Result};
use crate::image::Image;
use crate::loader::Loader;
use crate::sysroot::{HostTree, Kind};
use crate::types::{SectorID, SECTOR_SIZE};
use record::{PathTables, Record, RecordingDate, CURRENT_DIRECTORY, PARENT_DIRECTORY};
use volume::{BootRecord, PrimaryVolumeDescriptor, VolumeInfo};

pub const BLOCK_SIZE: usize = 2048;
pub const SECTORS_PER_BLOCK: u32 = (BLOCK_SIZE / SECTOR_SIZE) as u32;

pub const SYSTEM_AREA_BLOCKS: u32 = 16;
pub const PRIMARY_LBA: u32 = 16;
pub const BOOT_RECORD_LBA: u32 = 17;
pub const TERMINATOR_LBA: u32 = 18;
pub const BOOT_CATALOG_LBA: u32 = 19;
pub const PATH_TABLE_L_LBA: u32 = 20;
pub const PATH_TABLE_M_LBA: u32 = 21;
pub const BOOT_IMAGE_LBA: u32 = 22;
pub const BOOT_IMAGE_BLOCKS: u32 = 16;
pub const DIRECTORY_LBA: u32 = BOOT_IMAGE_LBA + BOOT_IMAGE_BLOCKS;
/// Stage 2 locates the kernel no lower than this CD sector
pub const KERNEL_MIN_LBA: u32 = 32;
pub const BOOT_LOAD_SECTORS: u16 = (BOOT_IMAGE_BLOCKS * SECTORS_PER_BLOCK) as u16;

pub const SYSTEM_IDENTIFIER: &str = "MKIMAGE";
pub const APPLICATION_IDENTIFIER: &str = "MKIMAGE";
pub const CATALOG_IDENTIFIER: &str = "MKIMAGE";
pub const DEFAULT_VOLUME_IDENTIFIER: &str = "MKIMAGE_LIVE";

fn blocks(bytes: u64) -> u64 {
    bytes.div_ceil(BLOCK_SIZE as u64)
}

/// First 512-byte sector of CD sector `lba`
fn sector_of(lba: u32) -> SectorID {
    SectorID::from(lba as u64 * SECTORS_PER_BLOCK as u64)
}

fn too_large(what: String) -> Error {
    Error::SizeConstraintViolation(format!("{} does not fit a 32-bit ISO 9660 field", what))
}

pub struct IsoBuilder {
    tree: HostTree,
    volume_identifier: String,
    timestamp: NaiveDateTime,
}

#[derive(Clone, Debug)]
struct DirectoryPlan {
    /// Absolute path, `/` for the root
    path: String,
    /// Host tree node, `None` for the root
    node: Option<usize>,
    parent: usize,
    extent: u32,
    bytes: Vec<u8>,
}

#[derive(Copy, Clone, Debug)]
pub struct FileExtent<'a> {
    pub extent: u32,
    pub data: &'a [u8],
}

/// Every CD sector assignment of one image, computed without touching an image
#[derive(Debug)]
pub struct LayoutPlan<'a> {
    volume_identifier: &'a str,
    timestamp: NaiveDateTime,
    directories: Vec<DirectoryPlan>,
    path_tables: PathTables,
    files: Vec<(String, FileExtent<'a>)>,
    kernel_lba: u32,
    kernel_size: u64,
    total_blocks: u32,
}

impl IsoBuilder {
    pub fn new(tree: HostTree) -> Self {
        Self {
            tree,
            volume_identifier: String::from(DEFAULT_VOLUME_IDENTIFIER),
            timestamp: chrono::Utc::now().naive_utc(),
        }
    }

    /// Up to 32 d-characters: `A`-`Z`, `0`-`9` and `_`
    pub fn volume_identifier(mut self, identifier: &str) -> Result<Self> {
        if identifier.len() > 32 {
            let message = format!("volume identifier {} is longer than 32 characters", identifier);
            return Err(Error::SizeConstraintViolation(message));
        }
        if !identifier.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_') {
            let message = format!("volume identifier {} has characters outside A-Z, 0-9 and _", identifier);
            return Err(Error::MalformedInput(message));
        }
        self.volume_identifier = String::from(identifier);
        Ok(self)
    }

    pub fn timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    fn absolute(&self, node: Option<usize>) -> String {
        match node {
            Some(index) => format!("/{}", self.tree.nodes()[index].path),
            None => String::from("/"),
        }
    }

    pub fn compute_layout(&self, kernel_size: u64) -> Result<LayoutPlan<'_>> {
        let nodes = self.tree.nodes();

        let mut directories: Vec<DirectoryPlan> = core::iter::once(None)
            .chain(nodes.iter().enumerate().filter(|(_, node)| node.is_directory()).map(|(i, _)| Some(i)))
            .map(|node| DirectoryPlan { path: self.absolute(node), node, parent: 0, extent: 0, bytes: Vec::new() })
            .collect();
        directories.sort_by(|a, b| a.path.cmp(&b.path));
        let index_of: HashMap<Option<usize>, usize> =
            directories.iter().enumerate().map(|(index, directory)| (directory.node, index)).collect();

        for (index, directory) in directories.iter_mut().enumerate() {
            directory.extent = DIRECTORY_LBA + index as u32;
            directory.parent = match directory.node {
                Some(node) => index_of[&nodes[node].parent],
                None => 0,
            };
        }

        let kernel_lba = (DIRECTORY_LBA + directories.len() as u32).max(KERNEL_MIN_LBA);
        let mut cursor = kernel_lba as u64 + blocks(kernel_size);
        debug!("Kernel at CD sector {} ({} bytes)", kernel_lba, kernel_size);

        let mut files: Vec<(String, usize)> = nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| !node.is_directory())
            .map(|(index, _)| (self.absolute(Some(index)), index))
            .collect();
        files.sort();
        let mut extents: HashMap<usize, FileExtent<'_>> = HashMap::new();
        let mut planned = Vec::with_capacity(files.len());
        for (path, index) in files {
            let data = match &nodes[index].kind {
                Kind::File(data) => data.as_slice(),
                Kind::Directory => continue,
            };
            u32::try_from(data.len()).map_err(|_| too_large(format!("size of {}", path)))?;
            let extent = u32::try_from(cursor).map_err(|_| too_large(format!("location of {}", path)))?;
            trace!("{} at CD sector {} ({} bytes)", path, extent, data.len());
            cursor += blocks(data.len() as u64).max(1);
            let file = FileExtent { extent, data };
            extents.insert(index, file);
            planned.push((path, file));
        }
        let total_blocks = u32::try_from(cursor).map_err(|_| too_large(String::from("volume size")))?;

        let date = RecordingDate::from(&self.timestamp);
        for index in 0..directories.len() {
            let parent = directories[directories[index].parent].extent;
            let bytes = self.directory_extent(&directories, index, &index_of, &extents, parent, date)?;
            directories[index].bytes = bytes;
        }

        let path_tables = path_tables(&directories, |directory| match directory.node {
            Some(node) => record::directory_identifier(&nodes[node].name),
            None => Ok(PARENT_DIRECTORY.to_vec()),
        })?;

        info!(
            "ISO 9660 layout: {} directories, {} files, kernel at CD sector {}, {} CD sectors",
            directories.len(),
            planned.len(),
            kernel_lba,
            total_blocks
        );
        Ok(LayoutPlan {
            volume_identifier: &self.volume_identifier,
            timestamp: self.timestamp,
            directories,
            path_tables,
            files: planned,
            kernel_lba,
            kernel_size,
            total_blocks,
        })
    }

    fn directory_extent(
        &self,
        directories: &[DirectoryPlan],
        index: usize,
        index_of: &HashMap<Option<usize>, usize>,
        extents: &HashMap<usize, FileExtent<'_>>,
        parent_extent: u32,
        date: RecordingDate,
    ) -> Result<Vec<u8>> {
        let directory = &directories[index];
        let mut records: Vec<Record> = Vec::new();
        for (child, node) in self.tree.nodes().iter().enumerate().filter(|(_, node)| node.parent == directory.node) {
            let record = match &node.kind {
                Kind::Directory => Record {
                    identifier: record::directory_identifier(&node.name)?,
                    extent: directories[index_of[&Some(child)]].extent,
                    data_length: BLOCK_SIZE as u32,
                    directory: true,
                },
                Kind::File(data) => Record {
                    identifier: record::file_identifier(&node.name)?,
                    extent: extents.get(&child).map(|file| file.extent).unwrap_or_default(),
                    data_length: data.len() as u32,
                    directory: false,
                },
            };
            records.push(record);
        }
        records.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        if let Some(pair) = records.windows(2).find(|pair| pair[0].identifier == pair[1].identifier) {
            let identifier = String::from_utf8_lossy(&pair[0].identifier);
            let message = format!("{} holds more than one entry named {}", directory.path, identifier);
            return Err(Error::MalformedInput(message));
        }

        let dot = Record {
            identifier: CURRENT_DIRECTORY.to_vec(),
            extent: directory.extent,
            data_length: BLOCK_SIZE as u32,
            directory: true,
        };
        let dotdot = Record { identifier: PARENT_DIRECTORY.to_vec(), extent: parent_extent, ..dot.clone() };
        let mut bytes = Vec::with_capacity(BLOCK_SIZE);
        for record in core::iter::once(&dot).chain(core::iter::once(&dotdot)).chain(records.iter()) {
            bytes.extend_from_slice(&record.to_bytes(date));
        }
        if bytes.len() > BLOCK_SIZE {
            let message = format!(
                "directory {} needs {} bytes of records, one {} byte sector is available",
                directory.path,
                bytes.len(),
                BLOCK_SIZE
            );
            return Err(Error::SizeConstraintViolation(message));
        }
        trace!("Directory {} at CD sector {}, {} records", directory.path, directory.extent, records.len() + 2);
        bytes.resize(BLOCK_SIZE, 0);
        Ok(bytes)
    }
}

/// Directories numbered level by level, ordered by parent number then identifier
fn path_tables<F>(directories: &[DirectoryPlan], identifier: F) -> Result<PathTables>
where
    F: Fn(&DirectoryPlan) -> Result<Vec<u8>>,
{
    let mut order: Vec<(usize, Vec<u8>)> = vec![(0, identifier(&directories[0])?)];
    let mut number: HashMap<usize, u16> = HashMap::from([(0, 1)]);
    let mut position = 0;
    while position < order.len() {
        let parent = order[position].0;
        let mut children = Vec::new();
        for (index, directory) in directories.iter().enumerate().skip(1) {
            if directory.parent == parent {
                children.push((index, identifier(directory)?));
            }
        }
        children.sort_by(|a, b| a.1.cmp(&b.1));
        for (index, _) in children.iter() {
            let next = u16::try_from(number.len() + 1)
                .map_err(|_| Error::SizeConstraintViolation(String::from("too many directories for a path table")))?;
            number.insert(*index, next);
        }
        order.extend(children);
        position += 1;
    }

    let mut tables = PathTables::default();
    for (index, identifier) in order.iter() {
        let directory = &directories[*index];
        tables.push(identifier, directory.extent, number[&directory.parent]);
    }
    if tables.len() > BLOCK_SIZE {
        let message = format!("path table of {} bytes exceeds one {} byte sector", tables.len(), BLOCK_SIZE);
        return Err(Error::SizeConstraintViolation(message));
    }
    Ok(tables)
}

impl<'a> LayoutPlan<'a> {
    pub fn kernel_lba(&self) -> u32 {
        self.kernel_lba
    }

    /// Kernel location in 512-byte sectors, as stage 2 reads it
    pub fn kernel_sector(&self) -> u32 {
        self.kernel_lba * SECTORS_PER_BLOCK
    }

    pub fn total_blocks(&self) -> u32 {
        self.total_blocks
    }

    pub fn image_size(&self) -> u64 {
        self.total_blocks as u64 * BLOCK_SIZE as u64
    }

    pub fn directory_extent(&self, path: &str) -> Option<u32> {
        self.directories.iter().find(|directory| directory.path == path).map(|directory| directory.extent)
    }

    pub fn file_extent(&self, path: &str) -> Option<FileExtent<'a>> {
        self.files.iter().find(|(file, _)| file == path).map(|(_, extent)| *extent)
    }

    fn root_record(&self) -> [u8; 34] {
        let record = Record {
            identifier: CURRENT_DIRECTORY.to_vec(),
            extent: self.directories[0].extent,
            data_length: BLOCK_SIZE as u32,
            directory: true,
        };
        let mut bytes = [0u8; 34];
        bytes.copy_from_slice(&record.to_bytes(RecordingDate::from(&self.timestamp)));
        bytes
    }

    pub fn materialize(&self, loader: &Loader, kernel: &[u8]) -> Result<Image> {
        if kernel.len() as u64 != self.kernel_size {
            let message = format!("kernel is {} bytes, layout was planned for {}", kernel.len(), self.kernel_size);
            return Err(Error::MalformedInput(message));
        }
        let kernel_sectors = SectorID::count(self.kernel_size);
        let stage2 = loader.patched_stage2(self.kernel_sector(), kernel_sectors)?;

        let mut image = Image::new(self.image_size())?;
        let per_block = SECTORS_PER_BLOCK as u64;
        let system_area = image.reserve("system area", sector_of(0), SYSTEM_AREA_BLOCKS as u64 * per_block)?;
        let descriptors = image.reserve("volume descriptors", sector_of(PRIMARY_LBA), 3 * per_block)?;
        let catalog = image.reserve("boot catalog", sector_of(BOOT_CATALOG_LBA), per_block)?;
        let tables = image.reserve("path tables", sector_of(PATH_TABLE_L_LBA), 2 * per_block)?;
        let boot_image = image.reserve("boot image", sector_of(BOOT_IMAGE_LBA), BOOT_IMAGE_BLOCKS as u64 * per_block)?;
        let count = self.directories.len() as u64;
        let directories = image.reserve("directories", sector_of(DIRECTORY_LBA), count * per_block)?;
        let kernel_region = image.reserve("kernel", sector_of(self.kernel_lba), blocks(self.kernel_size) * per_block)?;
        let files_start = self.kernel_lba + blocks(self.kernel_size) as u32;
        let files_blocks = (self.total_blocks - files_start) as u64;
        let files = image.reserve("files", sector_of(files_start), files_blocks * per_block)?;

        for area in [&system_area, &boot_image] {
            image.write(area, 0, loader.stage1())?;
            image.write(area, SECTOR_SIZE as u64, &stage2)?;
        }

        let info = VolumeInfo {
            system_identifier: SYSTEM_IDENTIFIER,
            volume_identifier: self.volume_identifier,
            application_identifier: APPLICATION_IDENTIFIER,
            volume_space_size: self.total_blocks,
            path_table_size: self.path_tables.len() as u32,
            type_l_path_table: PATH_TABLE_L_LBA,
            type_m_path_table: PATH_TABLE_M_LBA,
            root_directory_record: self.root_record(),
            timestamp: self.timestamp,
        };
        image.write(&descriptors, 0, &PrimaryVolumeDescriptor::new(&info).to_bytes())?;
        let offset = |lba: u32| (lba - PRIMARY_LBA) as u64 * BLOCK_SIZE as u64;
        image.write(&descriptors, offset(BOOT_RECORD_LBA), &BootRecord::new(BOOT_CATALOG_LBA).to_bytes())?;
        image.write(&descriptors, offset(TERMINATOR_LBA), &volume::terminator())?;
        let sector = eltorito::boot_catalog(CATALOG_IDENTIFIER, BOOT_IMAGE_LBA, BOOT_LOAD_SECTORS);
        image.write(&catalog, 0, &sector)?;
        image.write(&tables, 0, &self.path_tables.little)?;
        image.write(&tables, BLOCK_SIZE as u64, &self.path_tables.big)?;

        for directory in self.directories.iter() {
            let offset = (directory.extent - DIRECTORY_LBA) as u64 * BLOCK_SIZE as u64;
            image.write(&directories, offset, &directory.bytes)?;
        }
        image.write(&kernel_region, 0, kernel)?;
        for (path, file) in self.files.iter() {
            let offset = (file.extent - files_start) as u64 * BLOCK_SIZE as u64;
            image.write(&files, offset, file.data)?;
            debug!("{} at CD sector {}, {} bytes", path, file.extent, file.data.len());
        }
        info!(
            "ISO image of {} CD sectors, kernel at CD sector {} (LBA {})",
            self.total_blocks,
            self.kernel_lba,
            self.kernel_sector()
        );
        Ok(image)
    }
}

#[cfg(test)]
mod test {
    use chrono::NaiveDate;

    use super::eltorito::word_sum;
    use super::record::DirectoryRecord;
    use super::{IsoBuilder, BLOCK_SIZE};
    use crate::error::Error;
    use crate::loader::Loader;
    use crate::sysroot::{HostTree, Kind};

    fn tree() -> HostTree {
        let mut tree = HostTree::default();
        tree.push(None, "README.TXT", Kind::File(vec![b'r'; 5000]));
        let system = tree.push(None, "System", Kind::Directory);
        let sbin = tree.push(Some(system), "sbin", Kind::Directory);
        tree.push(Some(sbin), "init", Kind::File(Vec::new()));
        let bin = tree.push(None, "bin", Kind::Directory);
        tree.push(Some(bin), "app.bin", Kind::File(vec![b'a'; 20000]));
        tree
    }

    fn builder(tree: HostTree) -> IsoBuilder {
        let timestamp = NaiveDate::from_ymd_opt(2025, 5, 6).unwrap().and_hms_opt(7, 8, 9).unwrap();
        IsoBuilder::new(tree).timestamp(timestamp)
    }

    /// Identifier, extent, size and directory flag of every record in one extent
    fn records(extent: &[u8]) -> Vec<(Vec<u8>, u32, u32, bool)> {
        let mut records = Vec::new();
        let mut offset = 0;
        while offset < extent.len() && extent[offset] != 0 {
            let length = extent[offset] as usize;
            let header = DirectoryRecord::from_bytes(&extent[offset..]).unwrap();
            let name_length = extent[offset + 32] as usize;
            let identifier = extent[offset + 33..offset + 33 + name_length].to_vec();
            records.push((identifier, header.extent(), header.data_length(), header.flags().directory()));
            offset += length;
        }
        records
    }

    #[test]
    fn test_compute_layout() {
        let builder = builder(tree());
        let plan = builder.compute_layout(10000).unwrap();
        assert_eq!(plan.directory_extent("/"), Some(38));
        assert_eq!(plan.directory_extent("/System"), Some(39));
        assert_eq!(plan.directory_extent("/System/sbin"), Some(40));
        assert_eq!(plan.directory_extent("/bin"), Some(41));
        assert_eq!(plan.kernel_lba(), 42);
        assert_eq!(plan.kernel_sector(), 168);
        assert_eq!(plan.file_extent("/README.TXT").unwrap().extent, 47);
        assert_eq!(plan.file_extent("/System/sbin/init").unwrap().extent, 50);
        assert_eq!(plan.file_extent("/bin/app.bin").unwrap().extent, 51);
        assert_eq!(plan.total_blocks(), 61);
        assert_eq!(plan.image_size(), 61 * 2048);

        let empty = super::IsoBuilder::new(HostTree::default());
        let plan = empty.compute_layout(100).unwrap();
        assert_eq!(plan.kernel_lba(), 39);
        assert_eq!(plan.total_blocks(), 40);
    }

    #[test]
    fn test_materialize() {
        let builder = builder(tree());
        let plan = builder.compute_layout(10000).unwrap();
        let loader = Loader::new(vec![0xB1; 512], vec![0xB2; 4 * 512]).unwrap();
        let kernel = vec![0x4B; 10000];
        let image = plan.materialize(&loader, &kernel).unwrap();
        let disk = image.as_bytes();
        assert_eq!(disk.len(), 61 * BLOCK_SIZE);
        let block = |lba: usize| &disk[lba * BLOCK_SIZE..(lba + 1) * BLOCK_SIZE];

        // System area and El Torito boot image carry the same patched loader
        for base in [0, 22 * BLOCK_SIZE] {
            assert_eq!(disk[base], 0xB1);
            assert_eq!(&disk[base + 512..base + 520], &[0xB2, 0xB2, 20, 0, 168, 0, 0, 0]);
            assert_eq!(disk[base + 520], 0xB2);
        }

        let pvd = block(16);
        assert_eq!(&pvd[1..6], b"CD001");
        assert_eq!(u32::from_le_bytes(pvd[80..84].try_into().unwrap()), 61);
        assert_eq!(u32::from_be_bytes(pvd[84..88].try_into().unwrap()), 61);
        assert_eq!(&pvd[40..52], b"MKIMAGE_LIVE");
        assert_eq!(&pvd[813..829], b"2025050607080900");
        let root = DirectoryRecord::from_bytes(&pvd[156..190]).unwrap();
        assert_eq!(root.extent(), 38);
        assert_eq!(root.data_length(), 2048);

        let boot_record = block(17);
        assert_eq!(&boot_record[7..30], b"EL TORITO SPECIFICATION");
        assert_eq!(u32::from_le_bytes(boot_record[71..75].try_into().unwrap()), 19);
        assert_eq!(block(18)[0], 255);

        let catalog = block(19);
        assert_eq!(word_sum(catalog[..32].try_into().unwrap()), 0);
        assert_eq!(catalog[32], 0x88);
        assert_eq!(u16::from_le_bytes([catalog[38], catalog[39]]), 64);
        assert_eq!(u32::from_le_bytes(catalog[40..44].try_into().unwrap()), 22);

        // Level order: root, BIN, SYSTEM, then SBIN under SYSTEM (number 3)
        let table_size = u32::from_le_bytes(pvd[132..136].try_into().unwrap()) as usize;
        let little = &block(20)[..table_size];
        assert_eq!(&little[..10], &[1, 0, 38, 0, 0, 0, 1, 0, 1, 0]);
        assert_eq!(&little[10..21], &[3, 0, 41, 0, 0, 0, 1, 0, b'B', b'I', b'N']);
        assert_eq!(&little[22..34], &[6, 0, 39, 0, 0, 0, 1, 0, b'S', b'Y', b'S', b'T']);
        assert_eq!(&little[36..48], &[4, 0, 40, 0, 0, 0, 3, 0, b'S', b'B', b'I', b'N']);
        let big = &block(21)[..table_size];
        assert_eq!(&big[36..44], &[4, 0, 0, 0, 0, 40, 0, 3]);

        let entries = records(block(38));
        let names: Vec<&[u8]> = entries.iter().map(|entry| entry.0.as_slice()).collect();
        let expected: [&[u8]; 5] = [&[0], &[1], b"BIN", b"README.TXT;1", b"SYSTEM"];
        assert_eq!(names, expected);
        assert_eq!(entries[1].1, 38);
        assert_eq!(entries[2].1, 41);
        assert!(entries[2].3);
        assert_eq!((entries[3].1, entries[3].2, entries[3].3), (47, 5000, false));

        let entries = records(block(40));
        assert_eq!(entries[1].1, 39);
        assert_eq!(entries[2], (b"INIT.;1".to_vec(), 50, 0, false));

        assert!(block(42)[..2048].iter().all(|b| *b == 0x4B));
        assert_eq!(&disk[42 * BLOCK_SIZE + 9999..42 * BLOCK_SIZE + 10001], &[0x4B, 0]);
        assert!(block(47).iter().all(|b| *b == b'r'));
        assert!(block(51).iter().all(|b| *b == b'a'));

        assert!(matches!(plan.materialize(&loader, &kernel[1..]), Err(Error::MalformedInput(_))));
    }

    #[test]
    fn test_limits() {
        let mut tree = HostTree::default();
        let crowded = tree.push(None, "crowded", Kind::Directory);
        for i in 0..60 {
            tree.push(Some(crowded), &format!("file-with-a-long-name-{:02}.txt", i), Kind::File(vec![1]));
        }
        let error = builder(tree).compute_layout(512).unwrap_err();
        assert!(matches!(error, Error::SizeConstraintViolation(_)));

        let mut tree = HostTree::default();
        tree.push(None, "a.txt", Kind::File(vec![1]));
        tree.push(None, "A.TXT", Kind::File(vec![2]));
        assert!(matches!(builder(tree).compute_layout(512), Err(Error::MalformedInput(_))));

        // Few records per directory but a deep chain overflows the path table
        let mut tree = HostTree::default();
        let mut parent = None;
        for i in 0..100 {
            parent = Some(tree.push(parent, &format!("directory-{:03}", i), Kind::Directory));
        }
        assert!(matches!(builder(tree).compute_layout(512), Err(Error::SizeConstraintViolation(_))));

        assert!(builder(HostTree::default()).volume_identifier("LIVE_2025").is_ok());
        assert!(builder(HostTree::default()).volume_identifier("live").is_err());
        assert!(builder(HostTree::default()).volume_identifier(&"A".repeat(33)).is_err());
    }
}
