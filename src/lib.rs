//! Offline builder for bootable disk images
//!
//! Produces a raw BIOS disk with the kernel in front of an exFAT volume, a
//! GPT disk with a FAT16 EFI system partition and an exFAT data partition,
//! or a hybrid El Torito ISO 9660 image. Everything is laid out in memory
//! and written to the output file once.

extern crate alloc;

#[macro_use]
extern crate hex_literal;
extern crate heapless;
#[macro_use]
extern crate log;

pub mod elf;
mod endian;
pub mod error;
pub mod exfat;
pub mod fat16;
pub(crate) mod fs;
pub mod image;
pub mod iso9660;
pub mod layout;
pub mod loader;
pub mod partition;
pub mod sysroot;
pub mod timestamp;
pub mod types;

pub use error::{Error, Result};
pub use layout::{build, Config, Mode, Summary};
