use super::checksum::Checksum;

pub(crate) const UPCASE_TABLE_ENTRIES: usize = 128;
pub(crate) const UPCASE_TABLE_SIZE: usize = UPCASE_TABLE_ENTRIES * 2;

/// Minimal table covering ASCII, characters above it map to themselves
pub(crate) struct UpcaseTable(pub [u16; UPCASE_TABLE_ENTRIES]);

impl UpcaseTable {
    pub fn lookup(&self, ch: u16) -> u16 {
        match ch as usize >= self.0.len() {
            true => ch,
            false => self.0[ch as usize],
        }
    }

    pub fn to_bytes(&self) -> [u8; UPCASE_TABLE_SIZE] {
        let mut bytes = [0u8; UPCASE_TABLE_SIZE];
        for (chunk, ch) in bytes.chunks_mut(2).zip(self.0.iter()) {
            chunk.copy_from_slice(&ch.to_le_bytes());
        }
        bytes
    }

    pub fn checksum(&self) -> u32 {
        let mut checksum = Checksum::<u32>::default();
        checksum.write(&self.to_bytes());
        checksum.sum()
    }
}

impl Default for UpcaseTable {
    fn default() -> Self {
        let mut table = [0u16; UPCASE_TABLE_ENTRIES];
        for (i, ch) in table.iter_mut().enumerate() {
            *ch = match i as u8 {
                b'a'..=b'z' => i as u16 - 0x20,
                _ => i as u16,
            };
        }
        Self(table)
    }
}

#[cfg(test)]
mod test {
    use super::UpcaseTable;

    #[test]
    fn test_upcase_table() {
        let table = UpcaseTable::default();
        assert_eq!(table.lookup('a' as u16), 'A' as u16);
        assert_eq!(table.lookup('z' as u16), 'Z' as u16);
        assert_eq!(table.lookup('{' as u16), '{' as u16);
        assert_eq!(table.lookup('0' as u16), '0' as u16);
        assert_eq!(table.lookup(0x00E9), 0x00E9);
        let bytes = table.to_bytes();
        assert_eq!(&bytes[0x61 * 2..0x61 * 2 + 2], &[0x41, 0x00]);

        let mut sum = 0u32;
        for b in bytes {
            sum = sum.rotate_right(1).wrapping_add(b as u32);
        }
        assert_eq!(table.checksum(), sum);
    }
}
