use bitfield::bitfield;

bitfield! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd)]
    pub struct Flags(u16);
    pub allocation_possible, set_allocation_possible: 0, 0;
    pub no_fat_chain, set_no_fat_chain: 1, 1;
}

impl Flags {
    /// Allocation possible, with a FAT chain only when the clusters are not contiguous
    pub fn new(contiguous: bool) -> Self {
        let mut flags = Self::default();
        flags.set_allocation_possible(1);
        flags.set_no_fat_chain(contiguous as u16);
        flags
    }
}
