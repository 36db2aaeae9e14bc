use derive_more::{Display, From, Into};

pub const SECTOR_SIZE: usize = 512;
pub const SECTOR_SIZE_SHIFT: u8 = 9;

/// Sector number, either absolute on the disk or relative to a volume
#[derive(Copy, Clone, Debug, Default, Display, From, Into, Eq, Hash, Ord, PartialOrd, PartialEq)]
pub struct SectorID(u64);

impl SectorID {
    pub(crate) const BOOT: Self = Self(0);

    pub fn offset(self) -> u64 {
        self.0 * SECTOR_SIZE as u64
    }

    /// Number of 512-byte sectors needed to hold `bytes`
    pub fn count(bytes: u64) -> u64 {
        bytes.div_ceil(SECTOR_SIZE as u64)
    }
}

impl<I: Into<u64>> core::ops::Add<I> for SectorID {
    type Output = Self;

    fn add(self, rhs: I) -> Self {
        Self(self.0 + rhs.into())
    }
}

impl<I: Into<u64>> core::ops::AddAssign<I> for SectorID {
    fn add_assign(&mut self, rhs: I) {
        self.0 += rhs.into()
    }
}

#[derive(Copy, Clone, Debug, Default, Display, From, Into, Eq, Hash, Ord, PartialOrd, PartialEq)]
pub struct ClusterID(u32);

impl ClusterID {
    pub(crate) const FIRST: Self = Self(2);

    pub fn valid(&self) -> bool {
        self.0 >= Self::FIRST.0
    }

    /// Index into the cluster heap, cluster 2 being index 0
    pub(crate) fn offset(self) -> u32 {
        self.0 - Self::FIRST.0
    }
}

impl<I: Into<u32>> core::ops::Add<I> for ClusterID {
    type Output = Self;

    fn add(self, rhs: I) -> Self {
        Self(self.0 + rhs.into())
    }
}

impl<I: Into<u32>> core::ops::AddAssign<I> for ClusterID {
    fn add_assign(&mut self, rhs: I) {
        self.0 += rhs.into()
    }
}

#[cfg(test)]
mod test {
    use super::{ClusterID, SectorID};

    #[test]
    fn test_sector_count() {
        assert_eq!(SectorID::count(0), 0);
        assert_eq!(SectorID::count(1), 1);
        assert_eq!(SectorID::count(512), 1);
        assert_eq!(SectorID::count(513), 2);
        assert_eq!(SectorID::from(3).offset(), 1536);
    }

    #[test]
    fn test_cluster_offset() {
        assert!(!ClusterID::from(1).valid());
        assert_eq!(ClusterID::FIRST.offset(), 0);
        assert_eq!((ClusterID::FIRST + 5u32).offset(), 5);
    }
}
