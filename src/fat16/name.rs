//! 8.3 short names and VFAT long name entry groups

use alloc::string::String;
use alloc::vec::Vec;
use std::collections::HashMap;

use super::entry::{LongNameEntry, CHARS_PER_LONG_ENTRY, LAST_LONG_ENTRY};
use crate::error::{Error, Result};

pub const MAX_NAME_LENGTH: usize = 255;

const SPECIAL: &str = " +,;=[]";

pub fn needs_long_name(name: &str) -> bool {
    let len = name.len();
    if len == 0 || len > 12 || !name.is_ascii() {
        return true;
    }
    if name.starts_with('.') && name != "." && name != ".." {
        return true;
    }
    if name.matches('.').count() > 1 {
        return true;
    }
    let (base, extension) = name.rsplit_once('.').unwrap_or((name, ""));
    if base.len() > 8 || extension.len() > 3 {
        return true;
    }
    name.chars().any(|c| SPECIAL.contains(c) || c.is_ascii_lowercase())
}

/// Number of long name entries preceding the short entry of `name`
pub fn long_entry_count(name: &str) -> usize {
    match needs_long_name(name) {
        true => name.encode_utf16().count().div_ceil(CHARS_PER_LONG_ENTRY),
        false => 0,
    }
}

fn pad(base: &str, extension: &str) -> [u8; 11] {
    let mut name = [b' '; 11];
    let base = base.bytes().map(|b| if b.is_ascii() { b } else { b'_' });
    let extension = extension.bytes().map(|b| if b.is_ascii() { b } else { b'_' });
    name[..8].iter_mut().zip(base).for_each(|(slot, b)| *slot = b);
    name[8..].iter_mut().zip(extension).for_each(|(slot, b)| *slot = b);
    name
}

/// Uppercase 8.3 form of a name that fits it as is
pub fn short_name(name: &str) -> [u8; 11] {
    match name {
        "." | ".." => pad(name, ""),
        _ => {
            let upper = name.to_ascii_uppercase();
            let (base, extension) = upper.rsplit_once('.').unwrap_or((upper.as_str(), ""));
            pad(base, extension)
        }
    }
}

/// Numeric tail counters, one per `(base, extension)` pair
#[derive(Debug, Default)]
pub struct ShortNames {
    counters: HashMap<(String, String), u32>,
}

impl ShortNames {
    /// Unique `BASE~N.EXT` alias for a name that needs a long name group
    pub fn generate(&mut self, name: &str) -> [u8; 11] {
        let upper = name.to_uppercase();
        let (base, extension) = upper.rsplit_once('.').unwrap_or((upper.as_str(), ""));
        let base: String = base.chars().filter(|c| !" .+,;=[]".contains(*c)).take(6).collect();
        let extension: String = extension.chars().filter(|c| !" .".contains(*c)).take(3).collect();

        let counter = self.counters.entry((base.clone(), extension.clone())).or_insert(0);
        *counter += 1;
        let tail = format!("~{}", counter);
        let base: String = base.chars().map(|c| if c.is_ascii() { c } else { '_' }).collect();
        let keep = 8usize.saturating_sub(tail.len()).min(base.len());
        let short = pad(&format!("{}{}", &base[..keep], tail), &extension);
        trace!("Short name {:?} for {}", String::from_utf8_lossy(&short), name);
        short
    }
}

pub fn checksum(short_name: &[u8; 11]) -> u8 {
    short_name.iter().fold(0u8, |sum, &byte| ((sum & 1) << 7).wrapping_add(sum >> 1).wrapping_add(byte))
}

/// Long name entries of `name` in on-disk order, last sequence number first
pub fn long_name_entries(name: &str, short_name: &[u8; 11]) -> Result<Vec<LongNameEntry>> {
    let units: Vec<u16> = name.encode_utf16().collect();
    if units.len() > MAX_NAME_LENGTH {
        let message = format!("name {} is longer than {} UTF-16 units", name, MAX_NAME_LENGTH);
        return Err(Error::SizeConstraintViolation(message));
    }
    let sum = checksum(short_name);
    let count = units.len().div_ceil(CHARS_PER_LONG_ENTRY);
    let mut entries: Vec<LongNameEntry> = (0..count)
        .map(|index| {
            let chars: [u16; CHARS_PER_LONG_ENTRY] = core::array::from_fn(|i| {
                let position = index * CHARS_PER_LONG_ENTRY + i;
                match position.cmp(&units.len()) {
                    core::cmp::Ordering::Less => units[position],
                    core::cmp::Ordering::Equal => 0x0000,
                    core::cmp::Ordering::Greater => 0xFFFF,
                }
            });
            let mut order = index as u8 + 1;
            if index + 1 == count {
                order |= LAST_LONG_ENTRY;
            }
            LongNameEntry::new(order, &chars, sum)
        })
        .collect();
    entries.reverse();
    Ok(entries)
}
