use alloc::vec;

use crate::error::Result;
use crate::sysroot::{HostTree, Kind};

/// Capabilities shared by the FAT16 and exFAT formatters
pub trait FileSystem {
    /// Handle of a directory the formatter can add entries to
    type Directory: Copy;

    fn write_boot_region(&mut self) -> Result<()>;

    fn root(&self) -> Self::Directory;

    fn create_directory(&mut self, parent: Self::Directory, name: &str) -> Result<Self::Directory>;

    fn allocate_and_write_file(&mut self, parent: Self::Directory, name: &str, data: &[u8]) -> Result<()>;

    /// Mirrors `tree` below the root directory
    fn populate(&mut self, tree: &HostTree) -> Result<()>
    where
        Self: Sized,
    {
        populate(self, tree)
    }

    /// Commits any cached metadata, called once after the last insertion
    fn flush(&mut self) -> Result<()>;
}

/// Boot region, tree contents and a final flush, in that order
pub fn format<F: FileSystem>(fs: &mut F, tree: &HostTree) -> Result<()> {
    fs.write_boot_region()?;
    fs.populate(tree)?;
    fs.flush()
}

/// Depth-first walk creating every directory before its contents
pub fn populate<F: FileSystem>(fs: &mut F, tree: &HostTree) -> Result<()> {
    let mut directories = vec![None; tree.len()];
    for (index, node) in tree.nodes().iter().enumerate() {
        let parent = node.parent.and_then(|parent| directories[parent]).unwrap_or_else(|| fs.root());
        match &node.kind {
            Kind::Directory => directories[index] = Some(fs.create_directory(parent, &node.name)?),
            Kind::File(data) => fs.allocate_and_write_file(parent, &node.name, data)?,
        }
    }
    Ok(())
}
