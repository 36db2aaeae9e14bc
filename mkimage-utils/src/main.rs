use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime};
use clap::Parser;
use mkimage::{Config, Mode};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(short, long)]
    quiet: bool,
    #[clap(short, action = clap::ArgAction::Count)]
    verbosity: u8,
    /// Build a GPT disk with an EFI system partition
    #[clap(long, conflicts_with = "iso")]
    uefi: bool,
    /// Build a hybrid El Torito ISO 9660 image
    #[clap(long)]
    iso: bool,
    /// 512-byte first stage boot loader
    #[clap(long)]
    stage1: Option<PathBuf>,
    /// Second stage boot loader, patched with the kernel location
    #[clap(long)]
    stage2: Option<PathBuf>,
    /// Kernel ELF executable
    #[clap(long)]
    kernel: Option<PathBuf>,
    /// UEFI application installed as EFI/BOOT/BOOTX64.EFI
    #[clap(long)]
    bootloader: Option<PathBuf>,
    /// Host directory mirrored into the image
    #[clap(long)]
    sysroot: Option<PathBuf>,
    #[clap(short, long)]
    output: PathBuf,
    /// Image size in MiB, ignored for ISO images
    #[clap(long, default_value_t = mkimage::layout::config::DEFAULT_IMAGE_SIZE_MIB)]
    image_size: u64,
    /// First sector of the exFAT volume on BIOS images
    #[clap(long, default_value_t = mkimage::layout::config::DEFAULT_FS_START)]
    fs_start: u64,
    /// RFC 3339 timestamp stamped into the image, default to now
    #[clap(long, value_parser = parse_timestamp)]
    timestamp: Option<NaiveDateTime>,
    /// exFAT volume label
    #[clap(long)]
    label: Option<String>,
    /// ISO 9660 volume identifier
    #[clap(long)]
    volume_id: Option<String>,
}

fn parse_timestamp(value: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    Ok(DateTime::parse_from_rfc3339(value)?.naive_utc())
}

impl Args {
    fn mode(&self) -> Mode {
        match (self.uefi, self.iso) {
            (true, _) => Mode::Uefi,
            (_, true) => Mode::Iso,
            _ => Mode::Bios,
        }
    }

    fn into_config(self) -> Config {
        let mut config = Config::new(self.mode(), self.output);
        config.stage1 = self.stage1;
        config.stage2 = self.stage2;
        config.kernel = self.kernel;
        config.bootloader = self.bootloader;
        config.sysroot = self.sysroot;
        config.image_size_mib = self.image_size;
        config.fs_start = self.fs_start;
        if let Some(timestamp) = self.timestamp {
            config.timestamp = timestamp;
        }
        if let Some(label) = self.label {
            config.exfat_label = label;
        }
        if let Some(volume_id) = self.volume_id {
            config.volume_identifier = volume_id;
        }
        config
    }
}

fn run(config: &Config) -> Result<()> {
    let summary = mkimage::build(config)
        .with_context(|| format!("building {} image {}", config.mode, config.output.display()))?;
    if let Some(kernel) = summary.kernel() {
        log::debug!("Kernel occupies {} sectors from {}", kernel.sectors, kernel.first_sector);
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    let level = match (args.quiet, args.verbosity) {
        (true, _) => log::LevelFilter::Off,
        (_, 0) => log::LevelFilter::Info,
        (_, 1) => log::LevelFilter::Debug,
        (_, _) => log::LevelFilter::Trace,
    };
    log::set_max_level(level);
    env_logger::builder().filter(None, level).target(env_logger::Target::Stdout).init();

    let config = args.into_config();
    if let Err(error) = run(&config) {
        eprintln!("{:?}", error);
        std::process::exit(1);
    }
}
