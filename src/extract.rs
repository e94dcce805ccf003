//! Bundle extraction
//!
//! Reads a bundle file and writes each resource's payloads as individual
//! `.dat` files plus the sidecar documents described in [`crate::sidecar`].
//! A resource whose compressed stream is damaged is skipped with a warning;
//! everything else either succeeds or aborts the run.

use crate::bundle::{self, Bundle, ImportEntry, ResourceEntry};
use crate::compression;
use crate::error::{BundleError, Result};
use crate::sidecar;
use crate::stream::{DataStream, Platform};
use crate::types;
use crate::validate;
use std::fs::{self, File};
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    /// Skip the per-type output subdirectories.
    pub no_sort: bool,
    /// Emit one combined `.imports.yaml` instead of per-resource files.
    pub combine_imports: bool,
}

/// Extract `input` into `out_dir`.
pub fn extract(input: &Path, out_dir: &Path, options: &ExtractOptions) -> Result<()> {
    fs::create_dir_all(out_dir)?;
    let file = File::open(input)?;
    let mut stream = DataStream::new(file, Platform::Pc);
    probe(&mut stream)?;
    let bundle = Bundle::read(&mut stream)?;
    validate::validate_entries(&bundle)?;
    info!("Read bundle and resource info");

    if options.combine_imports {
        sidecar::truncate_combined_imports(out_dir)?;
    }
    for index in 0..bundle.entries.len() {
        extract_resource(&mut stream, &bundle, index, out_dir, options)?;
    }
    if bundle.contains_debug_data() {
        write_debug_data(&mut stream, &bundle, out_dir)?;
    }
    sidecar::write_metadata(out_dir, &bundle)?;
    info!("Extraction complete");
    Ok(())
}

/// Validate magic, platform and version, and resolve the stream's byte
/// order. The platform word is probed as raw little-endian; the console
/// targets show up byte-swapped (see [`Platform::from_wire`]).
fn probe<S: Read + Seek>(stream: &mut DataStream<S>) -> Result<()> {
    let magic = stream.read_bytes(4)?;
    if magic != bundle::MAGIC {
        return Err(BundleError::InvalidMagic);
    }

    stream.seek(8)?;
    let word = stream.read_u32()?;
    let platform = Platform::from_wire(word).ok_or(BundleError::InvalidPlatform(word))?;
    stream.set_platform(platform);

    stream.seek(4)?;
    let version = stream.read_u32()?;
    if version != bundle::VERSION {
        return Err(BundleError::UnsupportedVersion(version));
    }

    stream.seek(0)?;
    Ok(())
}

fn extract_resource<S: Read + Seek>(
    stream: &mut DataStream<S>,
    bundle: &Bundle,
    index: usize,
    out_dir: &Path,
    options: &ExtractOptions,
) -> Result<()> {
    let entry = &bundle.entries[index];
    let mut imports = Vec::new();

    for plane in 0..3 {
        if entry.compressed_size[plane] == 0 {
            continue;
        }
        stream.seek(bundle.plane_offsets[plane] as u64 + entry.local_offset[plane] as u64)?;
        let raw = stream.read_bytes(entry.compressed_size[plane] as usize)?;

        let mut payload = if bundle.is_compressed() {
            match compression::decompress(&raw, entry.uncompressed_size(plane) as usize) {
                Ok(data) => data,
                Err(e) => {
                    warn!(
                        "Resource 0x{:08X} memory type {plane} failed to extract: {e}",
                        entry.id
                    );
                    continue;
                }
            }
        } else {
            raw
        };

        if plane == 0 && entry.import_count > 0 {
            let imports_len = entry.import_count as usize * bundle::IMPORT_ENTRY_SIZE as usize;
            let Some(data_len) = payload.len().checked_sub(imports_len) else {
                warn!(
                    "Resource 0x{:08X}: imports sub-table larger than payload, skipped",
                    entry.id
                );
                continue;
            };
            imports =
                bundle::read_imports(&payload[data_len..], entry.import_count, stream.platform())?;
            payload.truncate(data_len);
        }

        let path = resource_path(out_dir, entry, plane, stream.platform(), options.no_sort)?;
        fs::write(path, &payload)?;
    }

    if entry.import_count > 0 {
        write_imports_sidecar(entry, &imports, out_dir, options, stream.platform())?;
    }
    debug!("Extracted resource {}/{}", index + 1, bundle.resource_count);
    Ok(())
}

/// Output path for one plane's payload: `<ID>` plus `_primary`/`_secondary`
/// when the resource spans several planes, under a per-type directory
/// unless sorting is disabled.
fn resource_path(
    out_dir: &Path,
    entry: &ResourceEntry,
    plane: usize,
    platform: Platform,
    no_sort: bool,
) -> Result<PathBuf> {
    let mut name = format!("{:08X}", entry.id);
    if plane == 0 && entry.secondary_plane().is_some() {
        name.push_str("_primary");
    }
    if plane > 0 {
        name.push_str("_secondary");
    }
    name.push_str(".dat");

    let dir = if no_sort {
        out_dir.to_path_buf()
    } else {
        let sub = out_dir.join(types::dir_name(entry.type_tag, platform));
        fs::create_dir_all(&sub)?;
        sub
    };
    Ok(dir.join(name))
}

fn write_imports_sidecar(
    entry: &ResourceEntry,
    imports: &[ImportEntry],
    out_dir: &Path,
    options: &ExtractOptions,
    platform: Platform,
) -> Result<()> {
    if options.combine_imports {
        return sidecar::append_combined_imports(out_dir, entry, imports);
    }
    let dir = if options.no_sort {
        out_dir.to_path_buf()
    } else {
        let sub = out_dir.join(types::dir_name(entry.type_tag, platform));
        fs::create_dir_all(&sub)?;
        sub
    };
    sidecar::write_resource_imports(&dir.join(format!("{:08X}", entry.id)), imports)
}

fn write_debug_data<S: Read + Seek>(
    stream: &mut DataStream<S>,
    bundle: &Bundle,
    out_dir: &Path,
) -> Result<()> {
    stream.seek(bundle.debug_data_offset as u64)?;
    let data = stream.read_cstring()?;
    fs::write(out_dir.join(sidecar::DEBUG_DATA_FILENAME), data)?;
    info!("Wrote debug data XML");
    Ok(())
}
