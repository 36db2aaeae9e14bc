//! Host directory tree mirrored into the produced filesystems

use alloc::string::String;
use alloc::vec::Vec;
use std::io;
use std::path::Path;

use walkdir::{DirEntry, WalkDir};

use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Kind {
    Directory,
    File(Vec<u8>),
}

#[derive(Clone, Debug)]
pub struct Node {
    /// Index of the parent directory node, `None` for children of the root
    pub parent: Option<usize>,
    pub name: String,
    /// Slash separated path relative to the tree root
    pub path: String,
    pub kind: Kind,
}

impl Node {
    pub fn is_directory(&self) -> bool {
        self.kind == Kind::Directory
    }

    pub fn size(&self) -> u64 {
        match &self.kind {
            Kind::Directory => 0,
            Kind::File(data) => data.len() as u64,
        }
    }
}

/// Depth-first, name sorted snapshot of a host directory; a directory always
/// precedes its contents
#[derive(Clone, Debug, Default)]
pub struct HostTree {
    nodes: Vec<Node>,
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_str().map(|name| name.starts_with('.')).unwrap_or(false)
}

impl HostTree {
    pub fn collect(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            let error = io::Error::new(io::ErrorKind::NotFound, "not a directory");
            return Err(Error::io(root, error));
        }
        let mut tree = Self::default();
        let mut stack: Vec<usize> = Vec::new();
        let walker = WalkDir::new(root).min_depth(1).follow_links(true).sort_by_file_name();
        for entry in walker.into_iter().filter_entry(|entry| !is_hidden(entry)) {
            let entry = entry.map_err(|error| {
                let path = error.path().unwrap_or(root).to_path_buf();
                Error::io(&path, io::Error::from(error))
            })?;
            let name = match entry.file_name().to_str() {
                Some(name) => String::from(name),
                None => {
                    warn!("Skipping {}: name is not valid UTF-8", entry.path().display());
                    continue;
                }
            };
            let file_type = entry.file_type();
            if !file_type.is_dir() && !file_type.is_file() {
                warn!("Skipping {}: not a regular file or directory", entry.path().display());
                continue;
            }
            stack.truncate(entry.depth() - 1);
            let parent = stack.last().copied();
            let path = match parent {
                Some(index) => format!("{}/{}", tree.nodes[index].path, name),
                None => name.clone(),
            };
            let kind = match file_type.is_dir() {
                true => {
                    stack.push(tree.nodes.len());
                    Kind::Directory
                }
                false => Kind::File(std::fs::read(entry.path()).map_err(|e| Error::io(entry.path(), e))?),
            };
            trace!("Host {} ({:?})", path, parent);
            tree.nodes.push(Node { parent, name, path, kind });
        }
        debug!("Collected {} entries from {}", tree.nodes.len(), root.display());
        Ok(tree)
    }

    pub fn push(&mut self, parent: Option<usize>, name: &str, kind: Kind) -> usize {
        let path = match parent {
            Some(index) => format!("{}/{}", self.nodes[index].path, name),
            None => String::from(name),
        };
        self.nodes.push(Node { parent, name: String::from(name), path, kind });
        self.nodes.len() - 1
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Entries placed directly in the root directory
    pub fn root_entries(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|node| node.parent.is_none())
    }
}
