//! Mode selection and disk layout for BIOS, UEFI and El Torito images
//!
//! [`build`] checks the configuration, loads every input, lays the image out
//! in memory and writes the output file once at the very end, so a failure
//! never leaves a partial image behind.

pub mod config;

use alloc::vec::Vec;
use core::fmt;
use std::path::Path;

pub use config::{Config, Mode};

use crate::elf::{self, FlatImage};
use crate::error::{Error, Result};
use crate::exfat::ExFat;
use crate::fat16::Fat16;
use crate::fs;
use crate::image::{Image, Volume};
use crate::iso9660::IsoBuilder;
use crate::loader::Loader;
use crate::partition::{self, Partition, BASIC_DATA, EFI_SYSTEM};
use crate::sysroot::{HostTree, Kind};
use crate::timestamp::{DateTime, Timestamp};
use crate::types::{SectorID, SECTOR_SIZE};

/// BIOS stage 2 loads the kernel from this sector
pub const KERNEL_SECTOR: u64 = 64;
pub const ESP_START: u64 = 2048;
/// 3 MiB
pub const ESP_SECTORS: u64 = 6144;
pub const DATA_START: u64 = ESP_START + ESP_SECTORS;
pub const ESP_SECTORS_PER_CLUSTER: u8 = 1;
pub const DATA_SECTORS_PER_CLUSTER: u8 = 8;
pub const ESP_NAME: &str = "EFI System";
pub const DATA_NAME: &str = "Data";
/// Hashed into the disk GUID
const DISK_GUID_SEED: &str = "disk";

/// Every input of one run, read from the host
#[derive(Clone, Debug, Default)]
pub struct Inputs {
    pub loader: Option<Loader>,
    pub kernel: Option<FlatImage>,
    pub bootloader: Option<Vec<u8>>,
    pub tree: HostTree,
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| Error::io(path, e))
}

impl Inputs {
    /// Reads what `config.mode` uses; the sysroot is optional in every mode
    pub fn load(config: &Config) -> Result<Self> {
        let mut inputs = Self::default();
        match config.mode {
            Mode::Bios | Mode::Iso => {
                if let (Some(stage1), Some(stage2)) = (&config.stage1, &config.stage2) {
                    inputs.loader = Some(Loader::new(read(stage1)?, read(stage2)?)?);
                }
            }
            Mode::Uefi => {
                let bootloader = config.bootloader.as_deref().map(read).transpose()?;
                if let Some(bytes) = &bootloader {
                    info!("EFI boot loader: {} bytes", bytes.len());
                }
                inputs.bootloader = bootloader;
            }
        }
        if let Some(path) = &config.kernel {
            let bytes = read(path)?;
            info!("Kernel ELF {}: {} bytes", path.display(), bytes.len());
            let kernel = elf::flatten(&bytes, config.load_base)?;
            info!("Kernel flat image: {} bytes ({} sectors) at {:#x}", kernel.bytes.len(), kernel.sectors(), kernel.base);
            inputs.kernel = Some(kernel);
        }
        if let Some(root) = &config.sysroot {
            info!("Populating from sysroot {}", root.display());
            inputs.tree = HostTree::collect(root)?;
        }
        Ok(inputs)
    }
}

/// One named sector range of the finished image
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Region {
    pub label: &'static str,
    pub first_sector: u64,
    pub sectors: u64,
}

#[derive(Clone, Debug)]
pub struct Summary {
    pub mode: Mode,
    pub image_size: u64,
    pub regions: Vec<Region>,
}

impl Summary {
    fn new(mode: Mode, image: &Image) -> Self {
        let mut regions: Vec<Region> = image
            .reservations()
            .iter()
            .filter(|reservation| !reservation.is_empty())
            .map(|reservation| Region {
                label: reservation.label,
                first_sector: u64::from(reservation.start()),
                sectors: reservation.sectors(),
            })
            .collect();
        regions.sort_by_key(|region| region.first_sector);
        Self { mode, image_size: image.len(), regions }
    }

    pub fn region(&self, label: &str) -> Option<&Region> {
        self.regions.iter().find(|region| region.label == label)
    }

    /// Where stage 2 finds the kernel, absent when it lives in a filesystem
    pub fn kernel(&self) -> Option<&Region> {
        self.region("kernel")
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} image: {} bytes ({} sectors)", self.mode, self.image_size, self.image_size / SECTOR_SIZE as u64)?;
        for region in self.regions.iter() {
            let end = region.first_sector + region.sectors;
            write!(f, "\n  {}: sectors {}..{}", region.label, region.first_sector, end)?;
        }
        Ok(())
    }
}

fn required<'a, T>(value: &'a Option<T>, name: &'static str) -> Result<&'a T> {
    value.as_ref().ok_or(Error::MissingRequiredInput(name))
}

/// Runs the whole build and writes `config.output`
pub fn build(config: &Config) -> Result<Summary> {
    config.check()?;
    let inputs = Inputs::load(config)?;
    let (image, summary) = assemble(config, inputs)?;
    image.persist(&config.output)?;
    info!("{}", summary);
    Ok(summary)
}

/// Lays out the complete image in memory
pub fn assemble(config: &Config, inputs: Inputs) -> Result<(Image, Summary)> {
    let image = match config.mode {
        Mode::Bios => bios(config, &inputs)?,
        Mode::Uefi => uefi(config, &inputs)?,
        Mode::Iso => iso(config, inputs)?,
    };
    let summary = Summary::new(config.mode, &image);
    Ok((image, summary))
}

fn data_filesystem<'a>(config: &Config, volume: Volume<'a>) -> Result<ExFat<'a>> {
    Ok(ExFat::new(volume, DATA_SECTORS_PER_CLUSTER)?
        .label(&config.exfat_label)?
        .timestamp(DateTime::from(config.timestamp))
        .root_only(&config.root_only))
}

fn bios(config: &Config, inputs: &Inputs) -> Result<Image> {
    let loader = required(&inputs.loader, "stage 1 loader")?;
    let kernel = required(&inputs.kernel, "kernel")?;
    let kernel_sectors = kernel.sectors();
    let kernel_end = KERNEL_SECTOR + kernel_sectors;
    if kernel_end > config.fs_start {
        return Err(Error::LayoutOverlap {
            first: format!("kernel (sectors {}..{})", KERNEL_SECTOR, kernel_end),
            second: format!("filesystem at sector {}", config.fs_start),
        });
    }

    let mut image = Image::new(config.image_size())?;
    let total = image.sectors();
    if config.fs_start >= total {
        let message = format!("filesystem start {} is beyond the {} sector image", config.fs_start, total);
        return Err(Error::SizeConstraintViolation(message));
    }
    let boot = image.reserve("boot", SectorID::BOOT, KERNEL_SECTOR)?;
    let kernel_area = image.reserve("kernel", KERNEL_SECTOR.into(), kernel_sectors)?;
    let filesystem = image.reserve("filesystem", config.fs_start.into(), total - config.fs_start)?;

    let stage2 = loader.patched_stage2(KERNEL_SECTOR as u32, kernel_sectors)?;
    image.write(&boot, 0, loader.stage1())?;
    image.write(&boot, SECTOR_SIZE as u64, &stage2)?;
    image.write(&kernel_area, 0, &kernel.bytes)?;
    info!("Kernel at sector {}, {} sectors", KERNEL_SECTOR, kernel_sectors);

    let mut exfat = data_filesystem(config, image.volume(&filesystem))?;
    fs::format(&mut exfat, &inputs.tree)?;
    drop(exfat);
    Ok(image)
}

/// `EFI/BOOT/BOOTX64.EFI`, plus `System/kernel.bin` when there is a kernel
fn esp_tree(bootloader: &[u8], kernel: Option<&FlatImage>) -> HostTree {
    let mut tree = HostTree::default();
    let efi = tree.push(None, "EFI", Kind::Directory);
    let boot = tree.push(Some(efi), "BOOT", Kind::Directory);
    tree.push(Some(boot), "BOOTX64.EFI", Kind::File(bootloader.to_vec()));
    if let Some(kernel) = kernel {
        let system = tree.push(None, "System", Kind::Directory);
        tree.push(Some(system), "kernel.bin", Kind::File(kernel.bytes.clone()));
    }
    tree
}

fn uefi(config: &Config, inputs: &Inputs) -> Result<Image> {
    let bootloader = required(&inputs.bootloader, "UEFI boot loader")?;
    let mut image = Image::new(config.image_size())?;
    let total = image.sectors();
    // Backup entries and header follow at least one data sector
    if total < DATA_START + partition::gpt::ENTRY_SECTORS + 2 {
        let message = format!("{} sectors leave no room for a data partition after the ESP", total);
        return Err(Error::SizeConstraintViolation(message));
    }
    let data_last = partition::last_usable_lba(total);

    partition::write_protective_mbr(&mut image)?;
    let partitions = [
        Partition::new(EFI_SYSTEM, ESP_NAME, ESP_START, DATA_START - 1),
        Partition::new(BASIC_DATA, DATA_NAME, DATA_START, data_last),
    ];
    partition::create_gpt(&mut image, partition::derive_guid(DISK_GUID_SEED), &partitions)?;
    for partition in partitions.iter() {
        info!("Partition {}: sectors {}..={}", partition.name, partition.first_lba, partition.last_lba);
    }
    let esp = image.reserve("EFI system partition", ESP_START.into(), ESP_SECTORS)?;
    let data = image.reserve("data partition", DATA_START.into(), data_last + 1 - DATA_START)?;

    let tree = esp_tree(bootloader, inputs.kernel.as_ref());
    let mut fat16 = Fat16::new(image.volume(&esp), ESP_SECTORS_PER_CLUSTER)?
        .label(&config.esp_label)
        .timestamp(Timestamp::from(config.timestamp));
    fs::format(&mut fat16, &tree)?;
    drop(fat16);

    let mut exfat = data_filesystem(config, image.volume(&data))?;
    fs::format(&mut exfat, &inputs.tree)?;
    drop(exfat);
    Ok(image)
}

fn iso(config: &Config, inputs: Inputs) -> Result<Image> {
    let Inputs { loader, kernel, tree, .. } = inputs;
    let loader = required(&loader, "stage 1 loader")?;
    let kernel = required(&kernel, "kernel")?;
    let builder = IsoBuilder::new(tree).timestamp(config.timestamp).volume_identifier(&config.volume_identifier)?;
    let plan = builder.compute_layout(kernel.bytes.len() as u64)?;
    plan.materialize(loader, &kernel.bytes)
}
