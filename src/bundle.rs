//! In-memory bundle model and its wire format
//!
//! A bundle is a 0x30-byte header, an optional NUL-terminated debug blob,
//! a table of 0x40-byte resource entries sorted by id, and three
//! concatenated data planes (main memory, secondary, tertiary). Each
//! resource contributes a payload to plane 0 and optionally to one of the
//! other two; a resource's imports live as a fixed-format sub-table at the
//! tail of its plane-0 payload.
//!
//! All model values are immutable once a bundle has been fully read or
//! constructed.

use crate::error::Result;
use crate::stream::{DataStream, Platform};
use std::io::{Cursor, Read, Seek, Write};

/// The four magic bytes at offset 0, identical on every platform.
pub const MAGIC: [u8; 4] = *b"bnd2";

/// The only supported bundle version.
pub const VERSION: u32 = 2;

/// Header length in bytes.
pub const HEADER_SIZE: u32 = 0x30;

/// Resource entry length in bytes.
pub const ENTRY_SIZE: u32 = 0x40;

/// Length of one row of the imports sub-table.
pub const IMPORT_ENTRY_SIZE: u32 = 0x10;

/// Mask for the size portion of a packed `uncompressed_info` word.
pub const SIZE_MASK: u32 = 0x0FFF_FFFF;

pub const FLAG_IS_COMPRESSED: u32 = 0x1;
pub const FLAG_IS_MAIN_MEM_OPTIMISED: u32 = 0x2;
pub const FLAG_IS_GRAPHICS_MEM_OPTIMISED: u32 = 0x4;
pub const FLAG_CONTAINS_DEBUG_DATA: u32 = 0x8;

/// A reference from one resource to another, to be patched into the
/// importing resource's primary payload at `offset` by the game loader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportEntry {
    pub id: u64,
    pub offset: u32,
}

/// One resource's entry-table record.
///
/// `uncompressed_info` words are kept packed as stored on disk: the low 28
/// bits hold the payload size, the top 4 bits the alignment exponent. Use
/// [`ResourceEntry::uncompressed_size`] and [`ResourceEntry::alignment`]
/// instead of unpacking by hand.
#[derive(Debug, Clone, Default)]
pub struct ResourceEntry {
    pub id: u64,
    pub imports_hash: u64,
    pub uncompressed_info: [u32; 3],
    pub compressed_size: [u32; 3],
    /// Byte offset within each plane at which this resource's payload begins.
    pub local_offset: [u32; 3],
    /// Offset of the imports sub-table within this resource's primary
    /// payload; zero when there are no imports.
    pub imports_offset: u32,
    pub type_tag: u32,
    pub import_count: u16,
    /// Opaque to this codec; round-tripped.
    pub flags: u8,
    /// Opaque to this codec; round-tripped.
    pub stream_index: u8,
    pub imports: Vec<ImportEntry>,
}

impl ResourceEntry {
    /// Uncompressed payload size on `plane`, in bytes.
    pub fn uncompressed_size(&self, plane: usize) -> u32 {
        self.uncompressed_info[plane] & SIZE_MASK
    }

    /// Alignment exponent for `plane` (alignment is `1 << exponent`).
    pub fn alignment_exp(&self, plane: usize) -> u32 {
        self.uncompressed_info[plane] >> 28
    }

    pub fn alignment(&self, plane: usize) -> u32 {
        1 << self.alignment_exp(plane)
    }

    /// Which of the two non-primary planes carries this resource's
    /// secondary payload, if any.
    pub fn secondary_plane(&self) -> Option<usize> {
        if self.compressed_size[1] != 0 {
            Some(1)
        } else if self.compressed_size[2] != 0 {
            Some(2)
        } else {
            None
        }
    }

    pub fn read<S: Read>(stream: &mut DataStream<S>) -> Result<Self> {
        let mut entry = ResourceEntry {
            id: stream.read_u64()?,
            imports_hash: stream.read_u64()?,
            ..Default::default()
        };
        for i in 0..3 {
            entry.uncompressed_info[i] = stream.read_u32()?;
        }
        for i in 0..3 {
            entry.compressed_size[i] = stream.read_u32()?;
        }
        for i in 0..3 {
            entry.local_offset[i] = stream.read_u32()?;
        }
        entry.imports_offset = stream.read_u32()?;
        entry.type_tag = stream.read_u32()?;
        entry.import_count = stream.read_u16()?;
        entry.flags = stream.read_u8()?;
        entry.stream_index = stream.read_u8()?;
        Ok(entry)
    }

    pub fn write<S: Write>(&self, stream: &mut DataStream<S>) -> Result<()> {
        stream.write_u64(self.id)?;
        stream.write_u64(self.imports_hash)?;
        for i in 0..3 {
            stream.write_u32(self.uncompressed_info[i])?;
        }
        for i in 0..3 {
            stream.write_u32(self.compressed_size[i])?;
        }
        for i in 0..3 {
            stream.write_u32(self.local_offset[i])?;
        }
        stream.write_u32(self.imports_offset)?;
        stream.write_u32(self.type_tag)?;
        stream.write_u16(self.import_count)?;
        stream.write_u8(self.flags)?;
        stream.write_u8(self.stream_index)?;
        Ok(())
    }
}

/// The top-level container.
#[derive(Debug, Clone, Default)]
pub struct Bundle {
    /// Logical platform value as stored in the header (1, 2 or 3).
    pub platform_word: u32,
    pub debug_data_offset: u32,
    pub resource_count: u32,
    pub entries_offset: u32,
    /// Absolute byte offsets of the three data planes. Each is 0x80-aligned
    /// on disk.
    pub plane_offsets: [u32; 3],
    pub flags: u32,
    pub entries: Vec<ResourceEntry>,
}

impl Bundle {
    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_IS_COMPRESSED != 0
    }

    pub fn contains_debug_data(&self) -> bool {
        self.flags & FLAG_CONTAINS_DEBUG_DATA != 0
    }

    /// Read the header and the full entry table.
    ///
    /// The stream's platform must already be resolved (see the extractor's
    /// probe) and positioned at offset 0. Magic, version and platform are
    /// assumed validated.
    pub fn read<S: Read + Seek>(stream: &mut DataStream<S>) -> Result<Self> {
        let mut bundle = Bundle::default();
        stream.read_bytes(4)?; // magic
        stream.read_u32()?; // version
        bundle.platform_word = stream.read_u32()?;
        bundle.debug_data_offset = stream.read_u32()?;
        bundle.resource_count = stream.read_u32()?;
        bundle.entries_offset = stream.read_u32()?;
        for i in 0..3 {
            bundle.plane_offsets[i] = stream.read_u32()?;
        }
        bundle.flags = stream.read_u32()?;

        bundle.entries = Vec::with_capacity(bundle.resource_count.min(0x10000) as usize);
        for i in 0..bundle.resource_count {
            stream.seek(bundle.entries_offset as u64 + i as u64 * ENTRY_SIZE as u64)?;
            bundle.entries.push(ResourceEntry::read(stream)?);
        }
        Ok(bundle)
    }

    /// Write the 0x30-byte header at the current position.
    /// The 8 reserved bytes at 0x28 are written as zero.
    pub fn write_header<S: Write>(&self, stream: &mut DataStream<S>) -> Result<()> {
        stream.write_bytes(&MAGIC)?;
        stream.write_u32(VERSION)?;
        stream.write_u32(self.platform_word)?;
        stream.write_u32(self.debug_data_offset)?;
        stream.write_u32(self.resource_count)?;
        stream.write_u32(self.entries_offset)?;
        for i in 0..3 {
            stream.write_u32(self.plane_offsets[i])?;
        }
        stream.write_u32(self.flags)?;
        stream.write_u64(0)?;
        Ok(())
    }
}

/// Parse an imports sub-table from the tail bytes of a primary payload.
/// Each row is `u64 id, u32 offset, u32 reserved`.
pub fn read_imports(data: &[u8], count: u16, platform: Platform) -> Result<Vec<ImportEntry>> {
    let mut stream = DataStream::new(Cursor::new(data), platform);
    let mut imports = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let id = stream.read_u64()?;
        let offset = stream.read_u32()?;
        stream.read_u32()?; // reserved
        imports.push(ImportEntry { id, offset });
    }
    Ok(imports)
}

/// Serialize an imports sub-table in the given platform's byte order.
pub fn write_imports(imports: &[ImportEntry], platform: Platform) -> Result<Vec<u8>> {
    let mut stream = DataStream::new(
        Cursor::new(Vec::with_capacity(
            imports.len() * IMPORT_ENTRY_SIZE as usize,
        )),
        platform,
    );
    for import in imports {
        stream.write_u64(import.id)?;
        stream.write_u32(import.offset)?;
        stream.write_u32(0)?;
    }
    Ok(stream.into_inner().into_inner())
}
