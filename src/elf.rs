//! Kernel ELF to flat load image conversion
//!
//! Only `PT_LOAD` program headers are looked at; sections and symbols are ignored.

use alloc::vec;
use alloc::vec::Vec;
use core::mem::size_of;

use crate::endian::Little as LE;
use crate::error::{Error, Result};
use crate::types::SectorID;

/// Physical address the kernel is linked to load at
pub const DEFAULT_LOAD_BASE: u64 = 0x0010_0000;

const MAGIC: [u8; 4] = hex!("7F 45 4C 46");
const CLASS_32: u8 = 1;
const CLASS_64: u8 = 2;
const DATA_LITTLE_ENDIAN: u8 = 1;
const PT_LOAD: u32 = 1;
const MAX_FLAT_SIZE: u64 = 1 << 30;

#[derive(Copy, Clone, Debug)]
#[repr(C)]
struct Header32 {
    ident: [u8; 16],
    object_type: LE<u16>,
    machine: LE<u16>,
    version: LE<u32>,
    entry: LE<u32>,
    program_header_offset: LE<u32>,
    section_header_offset: LE<u32>,
    flags: LE<u32>,
    header_size: LE<u16>,
    program_header_size: LE<u16>,
    program_header_count: LE<u16>,
    section_header_size: LE<u16>,
    section_header_count: LE<u16>,
    section_name_index: LE<u16>,
}

#[derive(Copy, Clone, Debug)]
#[repr(C)]
struct ProgramHeader32 {
    segment_type: LE<u32>,
    offset: LE<u32>,
    virtual_address: LE<u32>,
    physical_address: LE<u32>,
    file_size: LE<u32>,
    memory_size: LE<u32>,
    flags: LE<u32>,
    align: LE<u32>,
}

#[derive(Copy, Clone, Debug)]
#[repr(C)]
struct Header64 {
    ident: [u8; 16],
    object_type: LE<u16>,
    machine: LE<u16>,
    version: LE<u32>,
    entry: LE<u64>,
    program_header_offset: LE<u64>,
    section_header_offset: LE<u64>,
    flags: LE<u32>,
    header_size: LE<u16>,
    program_header_size: LE<u16>,
    program_header_count: LE<u16>,
    section_header_size: LE<u16>,
    section_header_count: LE<u16>,
    section_name_index: LE<u16>,
}

#[derive(Copy, Clone, Debug)]
#[repr(C)]
struct ProgramHeader64 {
    segment_type: LE<u32>,
    flags: LE<u32>,
    offset: LE<u64>,
    virtual_address: LE<u64>,
    physical_address: LE<u64>,
    file_size: LE<u64>,
    memory_size: LE<u64>,
    align: LE<u64>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Class {
    Elf32,
    Elf64,
}

/// One `PT_LOAD` program header
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub virtual_address: u64,
    pub load_address: u64,
    pub file_offset: u64,
    pub file_size: u64,
    pub memory_size: u64,
    pub flags: u32,
}

impl From<ProgramHeader32> for Segment {
    fn from(header: ProgramHeader32) -> Self {
        Self {
            virtual_address: header.virtual_address.to_ne() as u64,
            load_address: header.physical_address.to_ne() as u64,
            file_offset: header.offset.to_ne() as u64,
            file_size: header.file_size.to_ne() as u64,
            memory_size: header.memory_size.to_ne() as u64,
            flags: header.flags.to_ne(),
        }
    }
}

impl From<ProgramHeader64> for Segment {
    fn from(header: ProgramHeader64) -> Self {
        Self {
            virtual_address: header.virtual_address.to_ne(),
            load_address: header.physical_address.to_ne(),
            file_offset: header.offset.to_ne(),
            file_size: header.file_size.to_ne(),
            memory_size: header.memory_size.to_ne(),
            flags: header.flags.to_ne(),
        }
    }
}

/// Contiguous load image, `bytes[0]` is loaded at `base`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlatImage {
    pub base: u64,
    pub bytes: Vec<u8>,
}

impl FlatImage {
    pub fn sectors(&self) -> u64 {
        SectorID::count(self.bytes.len() as u64)
    }
}

fn malformed(message: &str) -> Error {
    Error::MalformedInput(format!("ELF: {}", message))
}

fn read<T: Copy>(bytes: &[u8], offset: u64) -> Result<T> {
    let end = offset.checked_add(size_of::<T>() as u64);
    match end {
        Some(end) if end <= bytes.len() as u64 => {
            let ptr = bytes[offset as usize..].as_ptr() as *const T;
            Ok(unsafe { ptr.read_unaligned() })
        }
        _ => Err(malformed("header out of bounds")),
    }
}

pub fn class(bytes: &[u8]) -> Result<Class> {
    if bytes.len() < 16 {
        return Err(malformed("file shorter than identification"));
    }
    if bytes[..4] != MAGIC {
        return Err(malformed("bad magic"));
    }
    if bytes[5] != DATA_LITTLE_ENDIAN {
        return Err(malformed("only little-endian objects are supported"));
    }
    match bytes[4] {
        CLASS_32 => Ok(Class::Elf32),
        CLASS_64 => Ok(Class::Elf64),
        other => Err(malformed(&format!("unknown class {}", other))),
    }
}

/// All `PT_LOAD` segments, in program header order
pub fn load_segments(bytes: &[u8]) -> Result<Vec<Segment>> {
    let class = class(bytes)?;
    let (offset, size, count, expected) = match class {
        Class::Elf32 => {
            let header: Header32 = read(bytes, 0)?;
            let offset = header.program_header_offset.to_ne() as u64;
            (offset, header.program_header_size.to_ne(), header.program_header_count.to_ne(), size_of::<ProgramHeader32>())
        }
        Class::Elf64 => {
            let header: Header64 = read(bytes, 0)?;
            let offset = header.program_header_offset.to_ne();
            (offset, header.program_header_size.to_ne(), header.program_header_count.to_ne(), size_of::<ProgramHeader64>())
        }
    };
    if count == 0 {
        return Err(malformed("no program headers"));
    }
    if (size as usize) < expected {
        return Err(malformed("program header entry too small"));
    }
    let table_end = (size as u64).checked_mul(count as u64).and_then(|length| offset.checked_add(length));
    match table_end {
        Some(end) if end <= bytes.len() as u64 => (),
        _ => return Err(malformed("program header table out of bounds")),
    }

    let mut segments = Vec::new();
    for index in 0..count as u64 {
        let position = offset + index * size as u64;
        let (segment_type, segment) = match class {
            Class::Elf32 => {
                let header: ProgramHeader32 = read(bytes, position)?;
                (header.segment_type.to_ne(), Segment::from(header))
            }
            Class::Elf64 => {
                let header: ProgramHeader64 = read(bytes, position)?;
                (header.segment_type.to_ne(), Segment::from(header))
            }
        };
        if segment_type != PT_LOAD {
            continue;
        }
        trace!("PT_LOAD {:x?}", segment);
        segments.push(segment);
    }
    Ok(segments)
}

/// Flattens the `PT_LOAD` segments at or above `min_base` into one zero-filled blob
pub fn flatten(bytes: &[u8], min_base: u64) -> Result<FlatImage> {
    let mut segments = Vec::new();
    for segment in load_segments(bytes)? {
        if segment.load_address < min_base {
            warn!(
                "Skipping segment at {:#x} below load base {:#x}",
                segment.load_address, min_base
            );
            continue;
        }
        if segment.file_size > segment.memory_size {
            return Err(malformed("segment file size exceeds memory size"));
        }
        match segment.file_offset.checked_add(segment.file_size) {
            Some(end) if end <= bytes.len() as u64 => (),
            _ => return Err(malformed("segment data out of bounds")),
        }
        segments.push(segment);
    }
    segments.sort_by_key(|segment| segment.load_address);

    let base = match segments.first() {
        Some(segment) => segment.load_address,
        None => return Err(malformed("no loadable segment")),
    };
    let mut end = base;
    for segment in segments.iter() {
        let top = segment.load_address.checked_add(segment.memory_size);
        end = end.max(top.ok_or_else(|| malformed("segment memory range out of bounds"))?);
    }
    if end - base > MAX_FLAT_SIZE {
        let message = format!("flat image spans {:#x} bytes", end - base);
        return Err(Error::SizeConstraintViolation(message));
    }

    let mut flat = vec![0u8; (end - base) as usize];
    for segment in segments.iter() {
        let dest = (segment.load_address - base) as usize;
        let source = segment.file_offset as usize..(segment.file_offset + segment.file_size) as usize;
        flat[dest..dest + segment.file_size as usize].copy_from_slice(&bytes[source]);
    }
    debug!("Flat image {:#x}..{:#x} from {} segment(s)", base, end, segments.len());
    Ok(FlatImage { base, bytes: flat })
}

#[cfg(test)]
pub(crate) mod test {
    use super::{flatten, load_segments, DEFAULT_LOAD_BASE};
    use crate::error::Error;

    /// (physical address, file bytes, memory size)
    pub(crate) fn elf64(segments: &[(u64, &[u8], u64)]) -> Vec<u8> {
        let mut bytes = vec![0u8; 64];
        bytes[..4].copy_from_slice(b"\x7FELF");
        bytes[4] = 2;
        bytes[5] = 1;
        bytes[6] = 1;
        bytes[32..40].copy_from_slice(&64u64.to_le_bytes());
        bytes[54..56].copy_from_slice(&56u16.to_le_bytes());
        bytes[56..58].copy_from_slice(&(segments.len() as u16).to_le_bytes());
        let mut data_offset = 64 + 56 * segments.len() as u64;
        let mut data = Vec::new();
        for &(address, contents, memory_size) in segments {
            let mut header = [0u8; 56];
            header[0..4].copy_from_slice(&1u32.to_le_bytes());
            header[8..16].copy_from_slice(&data_offset.to_le_bytes());
            header[16..24].copy_from_slice(&(address | 0xFFFF_FFFF_8000_0000).to_le_bytes());
            header[24..32].copy_from_slice(&address.to_le_bytes());
            header[32..40].copy_from_slice(&(contents.len() as u64).to_le_bytes());
            header[40..48].copy_from_slice(&memory_size.to_le_bytes());
            bytes.extend_from_slice(&header);
            data.extend_from_slice(contents);
            data_offset += contents.len() as u64;
        }
        bytes.extend_from_slice(&data);
        bytes
    }

    fn elf32(address: u32, contents: &[u8], memory_size: u32) -> Vec<u8> {
        let mut bytes = vec![0u8; 52 + 32];
        bytes[..4].copy_from_slice(b"\x7FELF");
        bytes[4] = 1;
        bytes[5] = 1;
        bytes[28..32].copy_from_slice(&52u32.to_le_bytes());
        bytes[42..44].copy_from_slice(&32u16.to_le_bytes());
        bytes[44..46].copy_from_slice(&1u16.to_le_bytes());
        let header = &mut bytes[52..84];
        header[0..4].copy_from_slice(&1u32.to_le_bytes());
        header[4..8].copy_from_slice(&84u32.to_le_bytes());
        header[8..12].copy_from_slice(&address.to_le_bytes());
        header[12..16].copy_from_slice(&address.to_le_bytes());
        header[16..20].copy_from_slice(&(contents.len() as u32).to_le_bytes());
        header[20..24].copy_from_slice(&memory_size.to_le_bytes());
        bytes.extend_from_slice(contents);
        bytes
    }

    #[test]
    fn test_flatten_elf64() {
        let text = [0x90u8; 16];
        let data = [1u8, 2, 3, 4];
        let elf = elf64(&[
            (0x0010_1000, &data, 0x100),
            (0x0010_0000, &text, 16),
            (0x0000_8000, b"low", 3),
        ]);
        assert_eq!(load_segments(&elf).unwrap().len(), 3);
        let flat = flatten(&elf, DEFAULT_LOAD_BASE).unwrap();
        assert_eq!(flat.base, 0x0010_0000);
        assert_eq!(flat.bytes.len(), 0x1100);
        assert_eq!(&flat.bytes[..16], &text);
        assert!(flat.bytes[16..0x1000].iter().all(|&b| b == 0));
        assert_eq!(&flat.bytes[0x1000..0x1004], &data);
        assert!(flat.bytes[0x1004..].iter().all(|&b| b == 0));
        assert_eq!(flat.sectors(), 9);
    }

    #[test]
    fn test_flatten_elf32() {
        let flat = flatten(&elf32(0x0010_0000, b"kernel", 0x20), DEFAULT_LOAD_BASE).unwrap();
        assert_eq!(flat.bytes.len(), 0x20);
        assert_eq!(&flat.bytes[..6], b"kernel");
    }

    #[test]
    fn test_malformed() {
        let mut elf = elf64(&[(0x0010_0000, b"x", 1)]);
        assert!(matches!(flatten(&elf[..10], 0), Err(Error::MalformedInput(_))));
        elf[4] = 3;
        assert!(matches!(flatten(&elf, 0), Err(Error::MalformedInput(_))));
        elf[4] = 2;
        elf[0] = 0;
        assert!(matches!(flatten(&elf, 0), Err(Error::MalformedInput(_))));

        let low = elf64(&[(0x1000, b"x", 1)]);
        assert!(matches!(flatten(&low, DEFAULT_LOAD_BASE), Err(Error::MalformedInput(_))));
        let mut truncated = elf64(&[(0x0010_0000, &[0u8; 64], 64)]);
        truncated.truncate(130);
        assert!(matches!(flatten(&truncated, 0), Err(Error::MalformedInput(_))));
    }

    #[test]
    fn test_overflowing_fields() {
        let elf = elf64(&[(0x0010_0000, b"abcd", 4)]);

        let mut table = elf.clone();
        table[32..40].copy_from_slice(&u64::MAX.to_le_bytes());
        assert!(matches!(load_segments(&table), Err(Error::MalformedInput(_))));

        let mut offset = elf.clone();
        offset[72..80].copy_from_slice(&(u64::MAX - 1).to_le_bytes());
        assert!(matches!(flatten(&offset, 0), Err(Error::MalformedInput(_))));

        let mut memory = elf;
        memory[104..112].copy_from_slice(&u64::MAX.to_le_bytes());
        assert!(matches!(flatten(&memory, 0), Err(Error::MalformedInput(_))));
    }
}
