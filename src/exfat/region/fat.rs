use crate::types::ClusterID;

pub const MEDIA: u32 = 0xFFFFFFF8;
pub const END_OF_CHAIN: u32 = 0xFFFFFFFF;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Entry {
    /// Not part of any chain, also what contiguous files leave behind
    Free,
    Next(ClusterID),
    Last,
}

impl TryFrom<u32> for Entry {
    type Error = u32;
    fn try_from(value: u32) -> Result<Self, u32> {
        match value {
            0 => Ok(Self::Free),
            2..=0xFFFFFFF6 => Ok(Self::Next(value.into())),
            END_OF_CHAIN => Ok(Self::Last),
            _ => Err(value),
        }
    }
}

impl From<Entry> for u32 {
    fn from(entry: Entry) -> u32 {
        match entry {
            Entry::Free => 0,
            Entry::Next(cluster) => cluster.into(),
            Entry::Last => END_OF_CHAIN,
        }
    }
}

#[cfg(test)]
mod test {
    use super::Entry;
    use crate::types::ClusterID;

    #[test]
    fn test_entry() {
        assert_eq!(Entry::try_from(0xFFFFFFFFu32), Ok(Entry::Last));
        assert_eq!(Entry::try_from(5u32), Ok(Entry::Next(ClusterID::from(5))));
        assert_eq!(Entry::try_from(1u32), Err(1));
        assert_eq!(Entry::try_from(0xFFFFFFF7u32), Err(0xFFFFFFF7));
        assert_eq!(u32::from(Entry::Next(ClusterID::from(9))), 9);
        assert_eq!(u32::from(Entry::Last), 0xFFFFFFFF);
    }
}
