use alloc::vec;
use alloc::vec::Vec;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{SectorID, SECTOR_SIZE};

/// A named byte range of the image, handed out once by [`Image::reserve`]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Reservation {
    pub label: &'static str,
    start: u64,
    end: u64,
}

impl Reservation {
    pub fn start(&self) -> SectorID {
        SectorID::from(self.start / SECTOR_SIZE as u64)
    }

    pub fn sectors(&self) -> u64 {
        (self.end - self.start) / SECTOR_SIZE as u64
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    fn overlaps(&self, other: &Self) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end && other.start < self.end
    }
}

/// Whole-disk byte arena, populated in place and persisted once
#[derive(Debug)]
pub struct Image {
    bytes: Vec<u8>,
    reservations: Vec<Reservation>,
}

impl Image {
    pub fn new(size: u64) -> Result<Self> {
        if size == 0 || size % SECTOR_SIZE as u64 != 0 {
            let message = format!("image size {} is not a positive multiple of 512", size);
            return Err(Error::SizeConstraintViolation(message));
        }
        debug!("Image of {} bytes ({} sectors)", size, size / SECTOR_SIZE as u64);
        Ok(Self { bytes: vec![0u8; size as usize], reservations: Vec::new() })
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn sectors(&self) -> u64 {
        self.len() / SECTOR_SIZE as u64
    }

    pub fn reservations(&self) -> &[Reservation] {
        &self.reservations
    }

    pub fn reserve(&mut self, label: &'static str, start: SectorID, sectors: u64) -> Result<Reservation> {
        let begin = start.offset();
        let end = begin + sectors * SECTOR_SIZE as u64;
        if end > self.len() {
            return Err(Error::OutOfBounds { target: "image", offset: begin, len: end - begin, limit: self.len() });
        }
        let reservation = Reservation { label, start: begin, end };
        if let Some(other) = self.reservations.iter().find(|r| r.overlaps(&reservation)) {
            return Err(Error::LayoutOverlap {
                first: describe(&reservation),
                second: describe(other),
            });
        }
        trace!("Reserve {}", describe(&reservation));
        self.reservations.push(reservation);
        Ok(reservation)
    }

    /// Writes `bytes` at `offset` relative to the reservation start
    pub fn write(&mut self, reservation: &Reservation, offset: u64, bytes: &[u8]) -> Result<()> {
        self.volume(reservation).write(offset, bytes)
    }

    pub fn volume(&mut self, reservation: &Reservation) -> Volume<'_> {
        let range = reservation.start as usize..reservation.end as usize;
        Volume { label: reservation.label, start: reservation.start(), bytes: &mut self.bytes[range] }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn persist(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.bytes).map_err(|e| Error::io(path, e))?;
        info!("Wrote {} ({} bytes)", path.display(), self.len());
        Ok(())
    }
}

fn describe(reservation: &Reservation) -> String {
    let first = reservation.start / SECTOR_SIZE as u64;
    let end = reservation.end / SECTOR_SIZE as u64;
    format!("{} (sectors {}..{})", reservation.label, first, end)
}

/// Exclusive, range-checked view of one reservation
pub struct Volume<'a> {
    label: &'static str,
    start: SectorID,
    bytes: &'a mut [u8],
}

impl<'a> Volume<'a> {
    /// Absolute sector the volume starts at
    pub fn start(&self) -> SectorID {
        self.start
    }

    pub fn sectors(&self) -> u64 {
        self.len() / SECTOR_SIZE as u64
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn check(&self, offset: u64, len: u64) -> Result<core::ops::Range<usize>> {
        match offset.checked_add(len) {
            Some(end) if end <= self.len() => Ok(offset as usize..end as usize),
            _ => Err(Error::OutOfBounds { target: self.label, offset, len, limit: self.len() }),
        }
    }

    pub fn write(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        let range = self.check(offset, bytes.len() as u64)?;
        self.bytes[range].copy_from_slice(bytes);
        Ok(())
    }

    pub fn write_sector(&mut self, sector: SectorID, bytes: &[u8]) -> Result<()> {
        self.write(sector.offset(), bytes)
    }

    pub fn zero(&mut self, offset: u64, len: u64) -> Result<()> {
        let range = self.check(offset, len)?;
        self.bytes[range].fill(0);
        Ok(())
    }

    pub fn read(&self, offset: u64, len: u64) -> Result<&[u8]> {
        let range = self.check(offset, len)?;
        Ok(&self.bytes[range])
    }

    pub fn sector(&self, sector: SectorID) -> Result<&[u8]> {
        self.read(sector.offset(), SECTOR_SIZE as u64)
    }
}

#[cfg(test)]
mod test {
    use super::Image;
    use crate::error::Error;
    use crate::types::SectorID;

    #[test]
    fn test_reject_size() {
        assert!(matches!(Image::new(0), Err(Error::SizeConstraintViolation(_))));
        assert!(matches!(Image::new(1000), Err(Error::SizeConstraintViolation(_))));
    }

    #[test]
    fn test_reservations() {
        let mut image = Image::new(64 * 512).unwrap();
        let boot = image.reserve("boot", SectorID::BOOT, 1).unwrap();
        let kernel = image.reserve("kernel", 8.into(), 16).unwrap();
        assert_eq!(kernel.start(), SectorID::from(8));
        assert_eq!(kernel.sectors(), 16);
        let error = image.reserve("filesystem", 20.into(), 10).unwrap_err();
        assert!(matches!(error, Error::LayoutOverlap { .. }));
        assert!(error.to_string().contains("kernel (sectors 8..24)"));
        assert!(matches!(image.reserve("tail", 60.into(), 8), Err(Error::OutOfBounds { .. })));
        image.reserve("empty", 10.into(), 0).unwrap();

        image.write(&boot, 510, &[0x55, 0xAA]).unwrap();
        assert!(image.write(&boot, 511, &[0x55, 0xAA]).is_err());
        let mut volume = image.volume(&kernel);
        volume.write_sector(1.into(), b"kernel").unwrap();
        assert_eq!(volume.read(512, 6).unwrap(), b"kernel");
        assert!(volume.write(16 * 512, &[1]).is_err());
        assert_eq!(&image.as_bytes()[510..512], &[0x55, 0xAA]);
        assert_eq!(&image.as_bytes()[9 * 512..9 * 512 + 6], b"kernel");
    }
}
