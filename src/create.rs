//! Bundle creation
//!
//! Assembles a bundle from an extracted directory: parse and validate the
//! sidecar description, build one entry per resource, sort by id, then lay
//! the three data planes out with their alignment and padding rules before
//! writing the header, entry table and planes.
//!
//! Layout rules: within plane 0 each payload starts on a 0x10 boundary,
//! within planes 1 and 2 on a 0x80 boundary. Every plane starts on a 0x80
//! boundary in the file; planes 0 and 1 are zero-padded up to it.

use crate::bundle::{
    self, Bundle, ResourceEntry, FLAG_CONTAINS_DEBUG_DATA, FLAG_IS_COMPRESSED,
    FLAG_IS_GRAPHICS_MEM_OPTIMISED, FLAG_IS_MAIN_MEM_OPTIMISED,
};
use crate::compression;
use crate::error::{BundleError, Result};
use crate::sidecar::{self, AlignmentDefaults, BundleDescription, ResourceDescription, ResourceFiles};
use crate::stream::{DataStream, Platform};
use std::fs::{self, File};
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct CreateOptions {
    pub alignments: AlignmentDefaults,
}

impl Default for CreateOptions {
    fn default() -> Self {
        CreateOptions {
            alignments: AlignmentDefaults::default(),
        }
    }
}

/// Create a bundle at `output` from the extracted directory `in_dir`.
pub fn create(in_dir: &Path, output: &Path, options: &CreateOptions) -> Result<()> {
    let desc = sidecar::load_description(in_dir, &options.alignments)?;
    let platform = desc.platform;
    let debug_data = load_debug_data(in_dir)?;
    let mut bundle = build_header(&desc, debug_data.as_deref())?;
    info!("Created bundle header");

    let mut items = desc
        .resources
        .iter()
        .map(|resource| Ok((build_entry(resource)?, resource.files.clone())))
        .collect::<Result<Vec<(ResourceEntry, ResourceFiles)>>>()?;
    // Entries are stored sorted ascending by id; the payload files follow
    // the same ordering because they are keyed by the same id.
    items.sort_by_key(|(entry, _)| entry.id);

    let compressed = bundle.is_compressed();
    let mut planes: [Vec<u8>; 3] = [Vec::new(), Vec::new(), Vec::new()];
    for plane in 0..3 {
        for (entry, files) in items.iter_mut() {
            append_resource(&mut planes[plane], entry, files, plane, compressed, platform)?;
        }
        if plane == 0 {
            pad_to_boundary(&mut planes[0], bundle.plane_offsets[0] as u64);
        }
        if plane == 1 && items.iter().any(|(entry, _)| entry.uncompressed_size(1) != 0) {
            let base = bundle.plane_offsets[0] as u64 + planes[0].len() as u64;
            pad_to_boundary(&mut planes[1], base);
        }
    }

    bundle.plane_offsets[1] =
        align_up(bundle.plane_offsets[0] as u64 + planes[0].len() as u64) as u32;
    bundle.plane_offsets[2] =
        align_up(bundle.plane_offsets[1] as u64 + planes[1].len() as u64) as u32;
    bundle.entries = items.into_iter().map(|(entry, _)| entry).collect();

    write_bundle(output, &bundle, debug_data.as_deref(), &planes, platform)?;
    info!("Bundle created");
    Ok(())
}

fn load_debug_data(in_dir: &Path) -> Result<Option<Vec<u8>>> {
    let path = in_dir.join(sidecar::DEBUG_DATA_FILENAME);
    if !path.is_file() {
        return Ok(None);
    }
    let data = fs::read(path)?;
    if data.is_empty() {
        return Ok(None);
    }
    Ok(Some(data))
}

fn build_header(desc: &BundleDescription, debug_data: Option<&[u8]>) -> Result<Bundle> {
    let mut bundle = Bundle {
        platform_word: desc.platform.meta_value(),
        debug_data_offset: bundle::HEADER_SIZE,
        resource_count: desc.resources.len() as u32,
        ..Default::default()
    };

    bundle.entries_offset = match debug_data {
        Some(data) => {
            bundle.flags |= FLAG_CONTAINS_DEBUG_DATA;
            // +1 for the NUL terminator.
            (((bundle::HEADER_SIZE as u64 + data.len() as u64 + 1) & 0xFFFF_FFF0) + 0x10) as u32
        }
        None => bundle::HEADER_SIZE,
    };
    if bundle.resource_count == 0 {
        warn!("Metadata file contains no resources.");
    }
    bundle.plane_offsets[0] = bundle.entries_offset + bundle.resource_count * bundle::ENTRY_SIZE;
    // plane_offsets[1] and [2] are set once the plane buffers are built.

    if desc.compressed {
        bundle.flags |= FLAG_IS_COMPRESSED;
    }
    if desc.main_mem_optimised {
        bundle.flags |= FLAG_IS_MAIN_MEM_OPTIMISED;
    }
    if desc.graphics_mem_optimised {
        bundle.flags |= FLAG_IS_GRAPHICS_MEM_OPTIMISED;
    }
    Ok(bundle)
}

fn build_entry(resource: &ResourceDescription) -> Result<ResourceEntry> {
    let mut entry = ResourceEntry {
        id: resource.id,
        type_tag: resource.type_tag,
        import_count: resource.imports.len() as u16,
        imports_hash: resource
            .imports
            .iter()
            .fold(0u64, |hash, import| hash | import.id),
        flags: resource.entry_flags,
        stream_index: resource.stream_index,
        imports: resource.imports.clone(),
        ..Default::default()
    };

    let primary_size = fs::metadata(&resource.files.primary)?.len() as u32;
    let imports_size = entry.import_count as u32 * bundle::IMPORT_ENTRY_SIZE;
    entry.uncompressed_info[0] =
        primary_size + imports_size + (resource.primary_alignment_exp << 28);
    if let Some(plane) = resource.secondary_memory_type {
        let secondary_size = match &resource.files.secondary {
            Some(path) => fs::metadata(path)?.len() as u32,
            None => 0,
        };
        entry.uncompressed_info[plane] = secondary_size + (resource.secondary_alignment_exp << 28);
    }

    if entry.import_count > 0 {
        entry.imports_offset = primary_size;
    }
    // Compressed sizes and plane offsets are assigned during layout.
    Ok(entry)
}

fn append_resource(
    buffer: &mut Vec<u8>,
    entry: &mut ResourceEntry,
    files: &ResourceFiles,
    plane: usize,
    compressed: bool,
    platform: Platform,
) -> Result<()> {
    if entry.uncompressed_size(plane) == 0 {
        return Ok(());
    }

    let align = if plane == 0 { 0x10 } else { 0x80 };
    let aligned = buffer.len().next_multiple_of(align);
    buffer.resize(aligned, 0);

    let path = if plane == 0 {
        &files.primary
    } else {
        files.secondary.as_ref().ok_or_else(|| {
            BundleError::Sidecar(format!(
                "Resource 0x{:08X} has no secondary data file.",
                entry.id
            ))
        })?
    };
    let mut data = fs::read(path)?;
    if plane == 0 {
        data.extend_from_slice(&bundle::write_imports(&entry.imports, platform)?);
    }

    let stored = if compressed {
        let packed = compression::compress(&data)?;
        entry.compressed_size[plane] = packed.len() as u32;
        packed
    } else {
        entry.compressed_size[plane] = entry.uncompressed_size(plane);
        data
    };

    entry.local_offset[plane] = buffer.len() as u32;
    buffer.extend_from_slice(&stored);
    debug!(
        "Added memory type {plane} portion for resource 0x{:08X}",
        entry.id
    );
    Ok(())
}

/// Zero-pad `buffer` so that `base + buffer.len()` lands on a 0x80 boundary.
fn pad_to_boundary(buffer: &mut Vec<u8>, base: u64) {
    let end = base + buffer.len() as u64;
    let padded = align_up(end);
    buffer.resize(buffer.len() + (padded - end) as usize, 0);
}

fn align_up(value: u64) -> u64 {
    (value + 0x7F) & !0x7F
}

fn write_bundle(
    output: &Path,
    bundle: &Bundle,
    debug_data: Option<&[u8]>,
    planes: &[Vec<u8>; 3],
    platform: Platform,
) -> Result<()> {
    let file = File::create(output)?;
    let mut stream = DataStream::new(file, platform);

    bundle.write_header(&mut stream)?;
    if let Some(data) = debug_data {
        stream.seek(bundle.debug_data_offset as u64)?;
        stream.write_bytes(data)?;
        stream.write_u8(0)?;
    }

    stream.seek(bundle.entries_offset as u64)?;
    for entry in &bundle.entries {
        entry.write(&mut stream)?;
    }

    // The entry table ends exactly at plane 0's offset and every plane
    // buffer is already padded out to the next plane's start.
    stream.seek(bundle.plane_offsets[0] as u64)?;
    for plane in planes {
        stream.write_bytes(plane)?;
    }
    stream.flush()?;
    Ok(())
}
