use alloc::string::String;
use alloc::vec::Vec;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use derive_more::Display;

use crate::elf::DEFAULT_LOAD_BASE;
use crate::error::{Error, Result};

pub const DEFAULT_IMAGE_SIZE_MIB: u64 = 64;
pub const DEFAULT_FS_START: u64 = 8192;
pub const DEFAULT_ESP_LABEL: &str = "EFI SYSTEM";

#[derive(Copy, Clone, Debug, Default, Display, PartialEq, Eq)]
pub enum Mode {
    #[default]
    #[display("BIOS")]
    Bios,
    #[display("UEFI")]
    Uefi,
    #[display("ISO")]
    Iso,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub mode: Mode,
    pub stage1: Option<PathBuf>,
    pub stage2: Option<PathBuf>,
    pub kernel: Option<PathBuf>,
    /// UEFI application copied to `EFI/BOOT/BOOTX64.EFI`
    pub bootloader: Option<PathBuf>,
    pub sysroot: Option<PathBuf>,
    pub output: PathBuf,
    /// Ignored in ISO mode, where the layout decides the size
    pub image_size_mib: u64,
    /// First sector of the BIOS mode filesystem
    pub fs_start: u64,
    /// Lowest kernel load address kept when flattening the ELF
    pub load_base: u64,
    /// Stamped into every directory entry and volume descriptor
    pub timestamp: NaiveDateTime,
    pub exfat_label: String,
    pub esp_label: String,
    pub volume_identifier: String,
    /// exFAT paths restricted to root, along with everything below them
    pub root_only: Vec<String>,
}

impl Config {
    pub fn new(mode: Mode, output: impl Into<PathBuf>) -> Self {
        Self {
            mode,
            stage1: None,
            stage2: None,
            kernel: None,
            bootloader: None,
            sysroot: None,
            output: output.into(),
            image_size_mib: DEFAULT_IMAGE_SIZE_MIB,
            fs_start: DEFAULT_FS_START,
            load_base: DEFAULT_LOAD_BASE,
            timestamp: chrono::Utc::now().naive_utc(),
            exfat_label: String::from(crate::exfat::DEFAULT_LABEL),
            esp_label: String::from(DEFAULT_ESP_LABEL),
            volume_identifier: String::from(crate::iso9660::DEFAULT_VOLUME_IDENTIFIER),
            root_only: crate::exfat::DEFAULT_ROOT_ONLY.iter().map(|path| String::from(*path)).collect(),
        }
    }

    pub fn image_size(&self) -> u64 {
        self.image_size_mib * 1024 * 1024
    }

    /// Fails on the first input the selected mode cannot do without
    pub fn check(&self) -> Result<()> {
        let required: Vec<(&Option<PathBuf>, &'static str)> = match self.mode {
            Mode::Bios | Mode::Iso => {
                vec![(&self.stage1, "stage 1 loader"), (&self.stage2, "stage 2 loader"), (&self.kernel, "kernel")]
            }
            Mode::Uefi => vec![(&self.bootloader, "UEFI boot loader")],
        };
        match required.iter().find(|(path, _)| path.is_none()) {
            Some(&(_, name)) => Err(Error::MissingRequiredInput(name)),
            None => Ok(()),
        }
    }
}
