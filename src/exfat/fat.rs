use alloc::vec;
use alloc::vec::Vec;

use super::region::fat::{Entry, END_OF_CHAIN, MEDIA};
use crate::types::ClusterID;

/// Whole FAT held in memory, committed once on flush
pub(crate) struct Fat {
    entries: Vec<u32>,
}

impl Fat {
    pub fn new(cluster_count: u32) -> Self {
        let mut entries = vec![0u32; cluster_count as usize + 2];
        entries[0] = MEDIA;
        entries[1] = END_OF_CHAIN;
        Self { entries }
    }

    pub fn get(&self, cluster_id: ClusterID) -> Option<Entry> {
        let value = *self.entries.get(u32::from(cluster_id) as usize)?;
        Entry::try_from(value).ok()
    }

    pub fn set(&mut self, cluster_id: ClusterID, entry: Entry) {
        trace!("FAT[{}] = {:?}", cluster_id, entry);
        self.entries[u32::from(cluster_id) as usize] = entry.into();
    }

    /// Clusters of the chain starting at `first`, a contiguous file yields just `first`
    pub fn chain(&self, first: ClusterID) -> Vec<ClusterID> {
        let mut clusters = vec![first];
        let mut cluster_id = first;
        while let Some(Entry::Next(next)) = self.get(cluster_id) {
            if clusters.len() >= self.entries.len() {
                break;
            }
            clusters.push(next);
            cluster_id = next;
        }
        clusters
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.entries.iter().flat_map(|entry| entry.to_le_bytes()).collect()
    }
}
