use alloc::string::String;

use displaydoc::Display;
use thiserror::Error;

#[derive(Debug, Display, Error)]
pub enum Error {
    /// Malformed input: {0}
    MalformedInput(String),
    /// Size constraint violated: {0}
    SizeConstraintViolation(String),
    /// Layout overlap: {first} overlaps {second}
    LayoutOverlap { first: String, second: String },
    /// {filesystem} volume has no room for {clusters} more cluster(s)
    CapacityExhausted { filesystem: &'static str, clusters: u32 },
    /// Missing required input: {0}
    MissingRequiredInput(&'static str),
    /// Write of {len} bytes at offset {offset} exceeds {target} of {limit} bytes
    OutOfBounds { target: &'static str, offset: u64, len: u64, limit: u64 },
    /// I/O error on {path}: {source}
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io { path: path.display().to_string(), source }
    }
}
