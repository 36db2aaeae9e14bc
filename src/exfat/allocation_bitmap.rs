use alloc::vec;
use alloc::vec::Vec;
use core::ops::{BitXor, Sub};

use crate::error::{Error, Result};
use crate::types::ClusterID;

#[inline]
fn lsb<T: Copy + From<u8> + Sub<T, Output = T> + BitXor<T, Output = T>>(bits: T) -> T {
    (bits - T::from(1)) ^ bits
}

/// Index of the lowest clear bit of a byte that is not full
#[inline]
fn first_clear_bit(bits: u8) -> u32 {
    lsb(!bits).trailing_zeros()
}

/// In-memory allocation bitmap, committed to disk once by the formatter
pub(crate) struct AllocationBitmap {
    bits: Vec<u8>,
    num_clusters: u32,
    cursor: ClusterID,
    num_inuse: u32,
}

impl AllocationBitmap {
    pub fn new(num_clusters: u32) -> Self {
        let bits = vec![0u8; num_clusters.div_ceil(8) as usize];
        Self { bits, num_clusters, cursor: ClusterID::FIRST, num_inuse: 0 }
    }

    fn exhausted(count: u32) -> Error {
        Error::CapacityExhausted { filesystem: "exFAT", clusters: count }
    }

    pub fn is_allocated(&self, cluster_id: ClusterID) -> bool {
        let offset = cluster_id.offset();
        self.bits[(offset / 8) as usize] & (1 << (offset % 8)) > 0
    }

    fn mark(&mut self, cluster_id: ClusterID) {
        let offset = cluster_id.offset();
        self.bits[(offset / 8) as usize] |= 1 << (offset % 8);
        self.num_inuse += 1;
    }

    /// First free cluster at or after the cursor
    pub fn allocate(&mut self) -> Result<ClusterID> {
        let mut offset = self.cursor.offset();
        while offset < self.num_clusters {
            let byte_offset = offset / 8;
            // Bits below the cursor count as taken
            let bits = self.bits[byte_offset as usize] | ((1u16 << (offset % 8)) - 1) as u8;
            if bits == u8::MAX {
                offset = (byte_offset + 1) * 8;
                continue;
            }
            let found = byte_offset * 8 + first_clear_bit(bits);
            if found >= self.num_clusters {
                break;
            }
            let cluster_id = ClusterID::FIRST + found;
            self.mark(cluster_id);
            self.cursor = cluster_id + 1u32;
            trace!("Allocated cluster {}", cluster_id);
            return Ok(cluster_id);
        }
        Err(Self::exhausted(1))
    }

    /// First run of `count` free clusters at or after the cursor
    pub fn allocate_contiguous(&mut self, count: u32) -> Result<ClusterID> {
        let mut start = self.cursor;
        while start.offset() + count <= self.num_clusters {
            let taken = (0..count).rev().find(|&i| self.is_allocated(start + i));
            match taken {
                Some(i) => start = start + i + 1u32,
                None => {
                    (0..count).for_each(|i| self.mark(start + i));
                    self.cursor = start + count;
                    trace!("Allocated clusters {}..{}", start, start + count);
                    return Ok(start);
                }
            }
        }
        Err(Self::exhausted(count))
    }

    pub fn num_inuse(&self) -> u32 {
        self.num_inuse
    }

    pub fn percent_inuse(&self) -> u8 {
        core::cmp::min((self.num_inuse as u64 * 100 / self.num_clusters.max(1) as u64) as u8, 100)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }
}
