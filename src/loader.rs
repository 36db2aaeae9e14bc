//! Two-stage BIOS boot loader blobs

use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::types::SECTOR_SIZE;

pub const STAGE1_SIZE: usize = SECTOR_SIZE;
pub const STAGE2_MAX_SECTORS: usize = 63;
/// Stage 2 carries the kernel sector count at byte 2 and its LBA at byte 4
const KERNEL_SECTORS_OFFSET: usize = 2;
const KERNEL_LBA_OFFSET: usize = 4;
const PATCH_END: usize = 8;

#[derive(Clone, Debug)]
pub struct Loader {
    stage1: Vec<u8>,
    stage2: Vec<u8>,
}

impl Loader {
    pub fn new(stage1: Vec<u8>, stage2: Vec<u8>) -> Result<Self> {
        if stage1.len() != STAGE1_SIZE {
            let message = format!("stage 1 must be exactly {} bytes, got {}", STAGE1_SIZE, stage1.len());
            return Err(Error::SizeConstraintViolation(message));
        }
        let max = STAGE2_MAX_SECTORS * SECTOR_SIZE;
        if stage2.len() > max {
            let message = format!("stage 2 is {} bytes, at most {} allowed", stage2.len(), max);
            return Err(Error::SizeConstraintViolation(message));
        }
        if stage2.len() < PATCH_END {
            let message = format!("stage 2 is {} bytes, too short to carry the kernel location", stage2.len());
            return Err(Error::SizeConstraintViolation(message));
        }
        debug!("Stage 1 {} bytes, stage 2 {} bytes", stage1.len(), stage2.len());
        Ok(Self { stage1, stage2 })
    }

    pub fn stage1(&self) -> &[u8] {
        &self.stage1
    }

    pub fn stage2(&self) -> &[u8] {
        &self.stage2
    }

    /// 512-byte sectors stage 2 occupies
    pub fn stage2_sectors(&self) -> u64 {
        self.stage2.len().div_ceil(SECTOR_SIZE) as u64
    }

    /// Stage 2 with the kernel's 512-byte sector count and LBA filled in
    pub fn patched_stage2(&self, kernel_lba: u32, kernel_sectors: u64) -> Result<Vec<u8>> {
        let sectors = u16::try_from(kernel_sectors).map_err(|_| {
            let message = format!("kernel of {} sectors does not fit the stage 2 sector count", kernel_sectors);
            Error::SizeConstraintViolation(message)
        })?;
        let mut stage2 = self.stage2.clone();
        stage2[KERNEL_SECTORS_OFFSET..KERNEL_LBA_OFFSET].copy_from_slice(&sectors.to_le_bytes());
        stage2[KERNEL_LBA_OFFSET..PATCH_END].copy_from_slice(&kernel_lba.to_le_bytes());
        info!("Stage 2 patched: kernel at LBA {}, {} sectors", kernel_lba, sectors);
        Ok(stage2)
    }
}

#[cfg(test)]
mod test {
    use super::Loader;
    use crate::error::Error;

    #[test]
    fn test_sizes() {
        assert!(Loader::new(vec![0; 512], vec![0; 63 * 512]).is_ok());
        let error = Loader::new(vec![0; 511], vec![0; 1024]).unwrap_err();
        assert!(matches!(error, Error::SizeConstraintViolation(_)));
        assert!(Loader::new(vec![0; 513], vec![0; 1024]).is_err());
        assert!(Loader::new(vec![0; 512], vec![0; 63 * 512 + 1]).is_err());
        assert!(Loader::new(vec![0; 512], vec![0; 7]).is_err());
    }

    #[test]
    fn test_patch() {
        let loader = Loader::new(vec![0; 512], vec![0xAB; 10 * 512]).unwrap();
        assert_eq!(loader.stage2_sectors(), 10);
        let stage2 = loader.patched_stage2(0x0001_0040, 300).unwrap();
        assert_eq!(&stage2[..8], &[0xAB, 0xAB, 0x2C, 0x01, 0x40, 0x00, 0x01, 0x00]);
        assert!(stage2[8..].iter().all(|b| *b == 0xAB));
        assert_eq!(loader.stage2()[2], 0xAB);
        assert!(loader.patched_stage2(64, 70000).is_err());
    }
}
