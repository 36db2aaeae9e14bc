#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum EntryType {
    AllocationBitmap,
    UpcaseTable,
    VolumeLabel,
    FileDirectory,
    StreamExtension,
    Filename,
}

impl From<EntryType> for u8 {
    fn from(entry_type: EntryType) -> u8 {
        match entry_type {
            EntryType::AllocationBitmap => 0x1,
            EntryType::UpcaseTable => 0x2,
            EntryType::VolumeLabel => 0x3,
            EntryType::FileDirectory => 0x5,
            EntryType::StreamExtension => 0x40,
            EntryType::Filename => 0x41,
        }
    }
}

#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub(crate) struct RawEntryType(u8);

impl RawEntryType {
    pub(crate) fn new(entry_type: EntryType, in_use: bool) -> Self {
        Self(u8::from(entry_type) | if in_use { 0x80 } else { 0 })
    }

    pub(crate) fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    pub(crate) fn in_use(&self) -> bool {
        self.0 & 0x80 > 0
    }

    pub(crate) fn is_end_of_directory(&self) -> bool {
        self.0 == 0
    }

    /// End of directory marker or an entry no longer in use
    pub(crate) fn is_free(&self) -> bool {
        self.is_end_of_directory() || !self.in_use()
    }
}

impl From<RawEntryType> for u8 {
    fn from(raw: RawEntryType) -> u8 {
        raw.0
    }
}
