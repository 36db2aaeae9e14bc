/// Word that can absorb one byte by rotating right and adding
pub(crate) trait Rotating: Copy + Default {
    fn rotate_add(self, byte: u8) -> Self;
}

impl Rotating for u16 {
    fn rotate_add(self, byte: u8) -> Self {
        self.rotate_right(1).wrapping_add(byte as u16)
    }
}

impl Rotating for u32 {
    fn rotate_add(self, byte: u8) -> Self {
        self.rotate_right(1).wrapping_add(byte as u32)
    }
}

/// Rotate-right-add checksum, 16 bits for entry sets and name hashes,
/// 32 bits for the boot region and the up-case table
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct Checksum<T>(T);

impl<T: Rotating> Checksum<T> {
    pub fn write(&mut self, bytes: &[u8]) {
        self.0 = bytes.iter().fold(self.0, |sum, &byte| sum.rotate_add(byte));
    }

    /// Feeds `bytes` except the positions in `skip`
    pub fn write_skipping(&mut self, bytes: &[u8], skip: &[usize]) {
        for (index, &byte) in bytes.iter().enumerate() {
            if !skip.contains(&index) {
                self.0 = self.0.rotate_add(byte);
            }
        }
    }

    pub fn sum(&self) -> T {
        self.0
    }
}
