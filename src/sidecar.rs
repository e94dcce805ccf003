//! Sidecar documents
//!
//! An extracted bundle directory carries a `.meta.yaml` describing the
//! bundle and its resources, the raw `.debug.xml` blob when present, and
//! the imports either combined in a single `.imports.yaml` or split into
//! per-resource `<ID>_imports.yaml` files. Creation parses and validates
//! the same documents.
//!
//! Imports are not guaranteed to exist even where they should; development
//! builds changed enough that they cannot be fully validated here. Only
//! basic shape and range checks are done, the rest is left to the game.

use crate::bundle::{Bundle, ImportEntry, ResourceEntry, SIZE_MASK};
use crate::error::{BundleError, Result};
use crate::stream::Platform;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const METADATA_FILENAME: &str = ".meta.yaml";
pub const IMPORTS_FILENAME: &str = ".imports.yaml";
pub const DEBUG_DATA_FILENAME: &str = ".debug.xml";

pub const DEFAULT_PRIMARY_ALIGNMENT: u32 = 0x10;
pub const DEFAULT_SECONDARY_ALIGNMENT: u32 = 0x80;
pub const MAX_ALIGNMENT: u32 = 0x8000;

fn sidecar_err(msg: impl Into<String>) -> BundleError {
    BundleError::Sidecar(msg.into())
}

/// Parse an unsigned scalar, accepting `0x`-prefixed hex or decimal.
pub fn parse_uint(s: &str) -> Option<u64> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}

/// Unsigned value of a YAML scalar node (number or hex/decimal string).
pub fn scalar_to_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => parse_uint(s),
        _ => None,
    }
}

fn key_display(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => format!("{other:?}"),
    }
}

/// Default alignments applied when a resource's sidecar omits or botches
/// its `alignment` sequence. CLI-overridable; invalid overrides warn and
/// fall back.
#[derive(Debug, Clone, Copy)]
pub struct AlignmentDefaults {
    pub primary_exp: u32,
    pub secondary_exp: u32,
}

impl AlignmentDefaults {
    pub fn new(primary: u32, secondary: u32) -> Self {
        AlignmentDefaults {
            primary_exp: Self::checked_exp(primary, DEFAULT_PRIMARY_ALIGNMENT, "primary"),
            secondary_exp: Self::checked_exp(secondary, DEFAULT_SECONDARY_ALIGNMENT, "secondary"),
        }
    }

    fn checked_exp(value: u32, fallback: u32, which: &str) -> u32 {
        if value == 0 || value > MAX_ALIGNMENT || !value.is_power_of_two() {
            warn!(
                "Invalid custom {which} alignment, defaulting to 0x{:X}.",
                fallback
            );
            fallback.trailing_zeros()
        } else {
            value.trailing_zeros()
        }
    }
}

impl Default for AlignmentDefaults {
    fn default() -> Self {
        AlignmentDefaults::new(DEFAULT_PRIMARY_ALIGNMENT, DEFAULT_SECONDARY_ALIGNMENT)
    }
}

/// Resource payload files located under the input directory.
#[derive(Debug, Clone)]
pub struct ResourceFiles {
    pub primary: PathBuf,
    pub secondary: Option<PathBuf>,
}

/// One validated resource description from `.meta.yaml`.
#[derive(Debug, Clone)]
pub struct ResourceDescription {
    pub id: u64,
    pub type_tag: u32,
    /// Which non-primary plane the secondary payload occupies (1 or 2).
    pub secondary_memory_type: Option<usize>,
    pub primary_alignment_exp: u32,
    pub secondary_alignment_exp: u32,
    pub entry_flags: u8,
    pub stream_index: u8,
    pub imports: Vec<ImportEntry>,
    pub files: ResourceFiles,
}

/// The fully-validated description of a bundle to be created.
#[derive(Debug, Clone)]
pub struct BundleDescription {
    pub platform: Platform,
    pub compressed: bool,
    pub main_mem_optimised: bool,
    pub graphics_mem_optimised: bool,
    /// In sidecar document order; the packer sorts by id afterwards.
    pub resources: Vec<ResourceDescription>,
}

/// Parse and validate the `.meta.yaml` under `dir`, locate every
/// resource's payload files and resolve its imports.
///
/// All failures here are fatal to creation. Duplicate resource ids are
/// rejected.
pub fn load_description(dir: &Path, defaults: &AlignmentDefaults) -> Result<BundleDescription> {
    let meta_path = dir.join(METADATA_FILENAME);
    let text = fs::read_to_string(&meta_path).map_err(|_| {
        sidecar_err(format!(
            "Metadata file could not be opened. Ensure the file {METADATA_FILENAME} exists \
             in the directory specified and that it has the correct permissions set."
        ))
    })?;
    let meta: Value = serde_yaml::from_str(&text)?;
    let root = meta
        .as_mapping()
        .ok_or_else(|| sidecar_err("Invalid metadata file: Expected root node type to be map."))?;

    let bundle = validate_bundle_node(root)?;
    let combined = load_combined_imports(dir)?;

    let resources_node = root
        .get("resources")
        .ok_or_else(|| sidecar_err("Could not find resources node in metadata file."))?;
    let resources_map = resources_node.as_mapping().ok_or_else(|| {
        sidecar_err("Invalid metadata file: Expected resources node type to be map.")
    })?;

    let mut seen = std::collections::HashSet::new();
    let mut resources = Vec::with_capacity(resources_map.len());
    for (key, node) in resources_map {
        let keytext = key_display(key);
        let detail = node.as_mapping().ok_or_else(|| {
            sidecar_err(format!("Resource {keytext}: Expected node type to be map."))
        })?;
        let id = validate_resource_id(key)?;
        if !seen.insert(id) {
            return Err(sidecar_err(format!(
                "Resource {keytext} has a duplicate entry."
            )));
        }
        let mut resource = validate_resource_node(&keytext, id, detail, defaults)?;
        resource.files = find_resource_files(dir, id, &keytext)?;
        resource.imports = resolve_imports(&keytext, id, &resource.files, combined.as_ref())?;
        finish_resource(&keytext, &mut resource)?;
        resources.push(resource);
    }

    Ok(BundleDescription {
        platform: bundle.0,
        compressed: bundle.1,
        main_mem_optimised: bundle.2,
        graphics_mem_optimised: bundle.3,
        resources,
    })
}

fn validate_bundle_node(root: &Mapping) -> Result<(Platform, bool, bool, bool)> {
    let bundle = root
        .get("bundle")
        .ok_or_else(|| sidecar_err("Could not find bundle node in metadata file."))?;
    let bundle = bundle.as_mapping().ok_or_else(|| {
        sidecar_err("Invalid metadata file: Expected bundle node type to be map.")
    })?;

    let platform = bundle
        .get("platform")
        .ok_or_else(|| sidecar_err("Could not find platform in metadata file."))?;
    let platform = scalar_to_u64(platform)
        .ok_or_else(|| sidecar_err("Invalid bundle platform: Expected scalar type."))?;
    let platform = u32::try_from(platform)
        .ok()
        .and_then(Platform::from_meta)
        .ok_or_else(|| sidecar_err("Invalid bundle platform: Must be 1, 2, or 3."))?;

    let flag = |name: &str| match bundle.get(name) {
        Some(Value::Bool(b)) => *b,
        _ => {
            warn!("Flag \"{name}\" is unspecified or invalid. Defaulting to true.");
            true
        }
    };

    Ok((
        platform,
        flag("compressed"),
        flag("mainMemOptimised"),
        flag("graphicsMemOptimised"),
    ))
}

fn validate_resource_id(key: &Value) -> Result<u64> {
    let keytext = key_display(key);
    let id = scalar_to_u64(key)
        .ok_or_else(|| sidecar_err(format!("Resource ID {keytext} is invalid.")))?;
    if id == 0 || id > 0xFFFF_FFFF {
        return Err(sidecar_err(format!("Resource ID {keytext} is invalid.")));
    }
    Ok(id)
}

fn validate_resource_node(
    keytext: &str,
    id: u64,
    detail: &Mapping,
    defaults: &AlignmentDefaults,
) -> Result<ResourceDescription> {
    let type_tag = detail
        .get("type")
        .and_then(scalar_to_u64)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| {
            sidecar_err(format!(
                "Resource {keytext} does not specify a type or specifies an invalid type."
            ))
        })?;

    let secondary_memory_type = match detail.get("secondaryMemoryType") {
        None => None,
        Some(node) => {
            let mem = scalar_to_u64(node).ok_or_else(|| {
                sidecar_err(format!(
                    "Resource {keytext}: Expected secondary memory type node type to be scalar."
                ))
            })?;
            if mem != 1 && mem != 2 {
                return Err(sidecar_err(format!(
                    "Resource {keytext}: Invalid secondary memory type specified; must be 1 or 2."
                )));
            }
            Some(mem as usize)
        }
    };

    let (primary_alignment_exp, secondary_alignment_exp) =
        validate_alignments(keytext, detail, defaults)?;

    let opaque = |name: &str| -> Result<u8> {
        match detail.get(name) {
            None => Ok(0),
            Some(node) => scalar_to_u64(node)
                .and_then(|v| u8::try_from(v).ok())
                .ok_or_else(|| {
                    sidecar_err(format!("Resource {keytext}: Invalid {name} value."))
                }),
        }
    };
    let entry_flags = opaque("flags")?;
    let stream_index = opaque("streamIndex")?;

    Ok(ResourceDescription {
        id,
        type_tag,
        secondary_memory_type,
        primary_alignment_exp,
        secondary_alignment_exp,
        entry_flags,
        stream_index,
        imports: Vec::new(),
        files: ResourceFiles {
            primary: PathBuf::new(),
            secondary: None,
        },
    })
}

fn validate_alignments(
    keytext: &str,
    detail: &Mapping,
    defaults: &AlignmentDefaults,
) -> Result<(u32, u32)> {
    let node = match detail.get("alignment") {
        None => {
            warn!("Resource {keytext} does not specify alignment values. Defaults will be used.");
            return Ok((defaults.primary_exp, defaults.secondary_exp));
        }
        Some(node) => node,
    };
    let seq = node.as_sequence().ok_or_else(|| {
        sidecar_err(format!(
            "Resource {keytext}: Expected alignment node type to be sequence."
        ))
    })?;

    let exp_at = |index: usize, fallback: u32| -> Result<u32> {
        let Some(value) = seq.get(index) else {
            return Ok(fallback);
        };
        if !matches!(value, Value::Number(_) | Value::String(_) | Value::Bool(_)) {
            return Err(sidecar_err(format!(
                "Resource {keytext}: Expected alignment value node type to be scalar."
            )));
        }
        match scalar_to_u64(value) {
            Some(v) if v != 0 && v <= MAX_ALIGNMENT as u64 && v.is_power_of_two() => {
                Ok((v as u32).trailing_zeros())
            }
            _ => {
                warn!(
                    "Resource {keytext}: Invalid alignment value (must be a power of 2 \
                     <=0x8000). Defaults will be used."
                );
                Ok(fallback)
            }
        }
    };

    Ok((
        exp_at(0, defaults.primary_exp)?,
        exp_at(1, defaults.secondary_exp)?,
    ))
}

/// Locate `<ID>.dat` or `<ID>_primary.dat` anywhere under `root`.
/// Exactly one match must exist; `_primary` requires a non-empty sibling
/// `<ID>_secondary.dat`.
fn find_resource_files(root: &Path, id: u64, keytext: &str) -> Result<ResourceFiles> {
    let id_string = format!("{id:08X}");
    let plain = format!("{id_string}.dat");
    let primary = format!("{id_string}_primary.dat");
    let mut matches = Vec::new();
    collect_matches(root, &plain, &primary, &mut matches)?;

    if matches.is_empty() {
        return Err(sidecar_err(format!(
            "Resource {keytext} is missing its primary data portion."
        )));
    }
    if matches.len() > 1 {
        return Err(sidecar_err(format!(
            "Resource {keytext}: Primary portion has a duplicate file."
        )));
    }
    let primary_path = matches.remove(0);
    if file_len(&primary_path)? == 0 {
        return Err(sidecar_err(format!(
            "Resource {keytext} primary portion is 0 bytes in size."
        )));
    }

    let mut secondary = None;
    if path_ends_with(&primary_path, "_primary.dat") {
        let secondary_path = sibling_path(&primary_path, "_primary.dat", "_secondary.dat");
        if !secondary_path.is_file() {
            return Err(sidecar_err(format!(
                "Resource {keytext} is missing its secondary data portion."
            )));
        }
        if file_len(&secondary_path)? == 0 {
            return Err(sidecar_err(format!(
                "Resource {keytext} secondary portion is 0 bytes in size."
            )));
        }
        secondary = Some(secondary_path);
    }

    Ok(ResourceFiles {
        primary: primary_path,
        secondary,
    })
}

fn collect_matches(dir: &Path, a: &str, b: &str, found: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_matches(&path, a, b, found)?;
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name == a || name == b {
                found.push(path);
            }
        }
    }
    Ok(())
}

fn file_len(path: &Path) -> Result<u64> {
    Ok(fs::metadata(path)?.len())
}

fn path_ends_with(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(suffix))
}

fn sibling_path(path: &Path, strip: &str, append: &str) -> PathBuf {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let base = name.strip_suffix(strip).unwrap_or(name);
    path.with_file_name(format!("{base}{append}"))
}

/// The combined `.imports.yaml`, if present: a map keyed by resource id.
/// Every key must be a valid id.
fn load_combined_imports(dir: &Path) -> Result<Option<Mapping>> {
    let path = dir.join(IMPORTS_FILENAME);
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(&path).map_err(|_| {
        sidecar_err("Imports file cannot be opened. Ensure it has the correct permissions set.")
    })?;
    let doc: Value = serde_yaml::from_str(&text)?;
    let map = doc
        .as_mapping()
        .ok_or_else(|| sidecar_err("Expected imports node type to be map."))?;
    for key in map.keys() {
        validate_resource_id(key)?;
    }
    Ok(Some(map.clone()))
}

fn resolve_imports(
    keytext: &str,
    id: u64,
    files: &ResourceFiles,
    combined: Option<&Mapping>,
) -> Result<Vec<ImportEntry>> {
    let primary_len = file_len(&files.primary)?;

    let doc: Value;
    let list = match combined {
        Some(map) => {
            match map
                .iter()
                .find(|(key, _)| scalar_to_u64(key) == Some(id))
                .map(|(_, v)| v)
            {
                Some(node) => node,
                None => return Ok(Vec::new()),
            }
        }
        None => {
            let strip = if path_ends_with(&files.primary, "_primary.dat") {
                "_primary.dat"
            } else {
                ".dat"
            };
            let path = sibling_path(&files.primary, strip, "_imports.yaml");
            if !path.is_file() {
                return Ok(Vec::new());
            }
            let text = fs::read_to_string(&path).map_err(|_| {
                sidecar_err(format!("Imports for resource {keytext} cannot be opened."))
            })?;
            doc = serde_yaml::from_str(&text)?;
            &doc
        }
    };

    let seq = list.as_sequence().ok_or_else(|| {
        sidecar_err(format!(
            "Resource {keytext}: Expected imports node type to be sequence."
        ))
    })?;

    let mut imports = Vec::with_capacity(seq.len());
    for item in seq {
        let map = item.as_mapping().ok_or_else(|| {
            sidecar_err(format!(
                "Resource {keytext}: Expected import node type to be map."
            ))
        })?;
        if map.len() != 1 {
            return Err(sidecar_err(format!(
                "Resource {keytext}: Only one import per offset is allowed."
            )));
        }
        let (offset_key, id_value) = map.iter().next().unwrap();
        let offset = scalar_to_u64(offset_key)
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| {
                sidecar_err(format!(
                    "Resource {keytext}: Invalid import offset {}.",
                    key_display(offset_key)
                ))
            })?;
        if offset as u64 > primary_len {
            return Err(sidecar_err(format!(
                "Resource {keytext}: Import offset {} out of range.",
                key_display(offset_key)
            )));
        }
        let import_id = scalar_to_u64(id_value).ok_or_else(|| {
            sidecar_err(format!(
                "Resource {keytext} import {}: Expected node type to be scalar.",
                key_display(offset_key)
            ))
        })?;
        if import_id == 0 || import_id > 0xFFFF_FFFF {
            return Err(sidecar_err(format!(
                "Invalid imported resource ID 0x{import_id:x} for resource {keytext}."
            )));
        }
        imports.push(ImportEntry {
            id: import_id,
            offset,
        });
    }
    Ok(imports)
}

/// Bounds that can only be checked once files and imports are resolved.
fn finish_resource(keytext: &str, resource: &mut ResourceDescription) -> Result<()> {
    if resource.imports.len() > u16::MAX as usize {
        return Err(sidecar_err(format!(
            "Resource {keytext} has too many imports."
        )));
    }
    let primary_len = file_len(&resource.files.primary)?;
    let packed = primary_len + resource.imports.len() as u64 * 0x10;
    if packed > SIZE_MASK as u64 {
        return Err(sidecar_err(format!(
            "Resource {keytext} primary portion is too large to represent."
        )));
    }
    if let Some(secondary) = &resource.files.secondary {
        if file_len(secondary)? > SIZE_MASK as u64 {
            return Err(sidecar_err(format!(
                "Resource {keytext} secondary portion is too large to represent."
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Extract-side emission
// ---------------------------------------------------------------------------

fn hex_id(value: u64) -> String {
    format!("0x{value:08x}")
}

/// Write `.meta.yaml` for an extracted bundle.
///
/// Per-resource `flags`/`streamIndex` are only recorded when non-zero so
/// typical bundles keep the compact document the game tooling expects.
pub fn write_metadata(dir: &Path, bundle: &Bundle) -> Result<()> {
    let mut doc = Mapping::new();

    let mut meta = Mapping::new();
    meta.insert("platform".into(), bundle.platform_word.into());
    meta.insert(
        "compressed".into(),
        (bundle.flags & crate::bundle::FLAG_IS_COMPRESSED != 0).into(),
    );
    meta.insert(
        "mainMemOptimised".into(),
        (bundle.flags & crate::bundle::FLAG_IS_MAIN_MEM_OPTIMISED != 0).into(),
    );
    meta.insert(
        "graphicsMemOptimised".into(),
        (bundle.flags & crate::bundle::FLAG_IS_GRAPHICS_MEM_OPTIMISED != 0).into(),
    );
    // Debug data flag excluded, determined by presence of .debug.xml.
    doc.insert("bundle".into(), Value::Mapping(meta));

    let mut resources = Mapping::new();
    for entry in &bundle.entries {
        let mut detail = Mapping::new();
        detail.insert("type".into(), format!("0x{:x}", entry.type_tag).into());
        let secondary = entry.secondary_plane();
        if let Some(plane) = secondary {
            detail.insert("secondaryMemoryType".into(), (plane as u64).into());
        }
        let mut alignment = vec![Value::from(entry.alignment(0) as u64)];
        if let Some(plane) = secondary {
            alignment.push(Value::from(entry.alignment(plane) as u64));
        }
        detail.insert("alignment".into(), Value::Sequence(alignment));
        if entry.flags != 0 {
            detail.insert("flags".into(), (entry.flags as u64).into());
        }
        if entry.stream_index != 0 {
            detail.insert("streamIndex".into(), (entry.stream_index as u64).into());
        }
        resources.insert(hex_id(entry.id).into(), Value::Mapping(detail));
    }
    doc.insert("resources".into(), Value::Mapping(resources));

    let text = serde_yaml::to_string(&Value::Mapping(doc))?;
    fs::write(dir.join(METADATA_FILENAME), text)?;
    Ok(())
}

fn imports_sequence(imports: &[ImportEntry]) -> Value {
    Value::Sequence(
        imports
            .iter()
            .map(|import| {
                let mut map = Mapping::new();
                map.insert(
                    format!("0x{:08x}", import.offset).into(),
                    hex_id(import.id).into(),
                );
                Value::Mapping(map)
            })
            .collect(),
    )
}

/// Write a per-resource `<base>_imports.yaml` next to the resource's data.
pub fn write_resource_imports(base: &Path, imports: &[ImportEntry]) -> Result<()> {
    let mut path = base.as_os_str().to_owned();
    path.push("_imports.yaml");
    let text = serde_yaml::to_string(&imports_sequence(imports))?;
    fs::write(PathBuf::from(path), text)?;
    Ok(())
}

/// Truncate the combined imports file at the start of an extraction run.
pub fn truncate_combined_imports(dir: &Path) -> Result<()> {
    fs::File::create(dir.join(IMPORTS_FILENAME))?;
    Ok(())
}

/// Append one resource's imports to the combined `.imports.yaml`.
/// The concatenated fragments form a single top-level map.
pub fn append_combined_imports(
    dir: &Path,
    entry: &ResourceEntry,
    imports: &[ImportEntry],
) -> Result<()> {
    let mut fragment = Mapping::new();
    fragment.insert(hex_id(entry.id).into(), imports_sequence(imports));
    let text = serde_yaml::to_string(&Value::Mapping(fragment))?;
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(IMPORTS_FILENAME))?;
    file.write_all(text.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_uint() {
        assert_eq!(parse_uint("0x10"), Some(0x10));
        assert_eq!(parse_uint("0X0000abcd"), Some(0xABCD));
        assert_eq!(parse_uint("42"), Some(42));
        assert_eq!(parse_uint("nope"), None);
        assert_eq!(parse_uint("0xZZ"), None);
    }

    #[test]
    fn test_scalar_to_u64() {
        assert_eq!(scalar_to_u64(&Value::from(7u64)), Some(7));
        assert_eq!(scalar_to_u64(&Value::from("0x7")), Some(7));
        assert_eq!(scalar_to_u64(&Value::Bool(true)), None);
        assert_eq!(scalar_to_u64(&Value::Null), None);
    }

    #[test]
    fn test_alignment_defaults_fall_back() {
        let defaults = AlignmentDefaults::new(0x10, 0x80);
        assert_eq!(defaults.primary_exp, 4);
        assert_eq!(defaults.secondary_exp, 7);

        // Not a power of two, and too large.
        let defaults = AlignmentDefaults::new(0x11, 0x10000);
        assert_eq!(defaults.primary_exp, 4);
        assert_eq!(defaults.secondary_exp, 7);
    }

    fn write_minimal_tree(dir: &Path, meta: &str) {
        fs::write(dir.join(METADATA_FILENAME), meta).unwrap();
    }

    #[test]
    fn test_load_minimal_description() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("0000ABCD.dat"), b"payload bytes").unwrap();
        write_minimal_tree(
            dir.path(),
            "bundle:\n  platform: 1\n  compressed: false\n  mainMemOptimised: true\n  \
             graphicsMemOptimised: false\nresources:\n  '0x0000abcd':\n    type: 0x3\n    \
             alignment: [16]\n",
        );

        let desc = load_description(dir.path(), &AlignmentDefaults::default()).unwrap();
        assert_eq!(desc.platform, Platform::Pc);
        assert!(!desc.compressed);
        assert!(desc.main_mem_optimised);
        assert!(!desc.graphics_mem_optimised);
        assert_eq!(desc.resources.len(), 1);
        let resource = &desc.resources[0];
        assert_eq!(resource.id, 0xABCD);
        assert_eq!(resource.type_tag, 0x3);
        assert_eq!(resource.primary_alignment_exp, 4);
        assert_eq!(resource.secondary_memory_type, None);
        assert!(resource.imports.is_empty());
    }

    #[test]
    fn test_missing_primary_file_is_fatal() {
        let dir = tempdir().unwrap();
        write_minimal_tree(
            dir.path(),
            "bundle:\n  platform: 1\nresources:\n  '0x1':\n    type: 0\n",
        );
        let err = load_description(dir.path(), &AlignmentDefaults::default()).unwrap_err();
        assert!(err.to_string().contains("missing its primary data portion"));
    }

    #[test]
    fn test_duplicate_primary_file_is_fatal() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("00000001.dat"), b"x").unwrap();
        fs::create_dir(dir.path().join("Texture")).unwrap();
        fs::write(dir.path().join("Texture").join("00000001_primary.dat"), b"x").unwrap();
        write_minimal_tree(
            dir.path(),
            "bundle:\n  platform: 1\nresources:\n  '0x1':\n    type: 0\n",
        );
        let err = load_description(dir.path(), &AlignmentDefaults::default()).unwrap_err();
        assert!(err.to_string().contains("duplicate file"));
    }

    #[test]
    fn test_primary_requires_secondary_sibling() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("00000001_primary.dat"), b"x").unwrap();
        write_minimal_tree(
            dir.path(),
            "bundle:\n  platform: 1\nresources:\n  '0x1':\n    type: 0\n    \
             secondaryMemoryType: 1\n",
        );
        let err = load_description(dir.path(), &AlignmentDefaults::default()).unwrap_err();
        assert!(err
            .to_string()
            .contains("missing its secondary data portion"));
    }

    #[test]
    fn test_duplicate_resource_id_is_fatal() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("00000001.dat"), b"x").unwrap();
        write_minimal_tree(
            dir.path(),
            "bundle:\n  platform: 1\nresources:\n  '0x1':\n    type: 0\n  '1':\n    type: 0\n",
        );
        let err = load_description(dir.path(), &AlignmentDefaults::default()).unwrap_err();
        assert!(err.to_string().contains("duplicate entry"));
    }

    #[test]
    fn test_zero_and_wide_ids_are_fatal() {
        for key in ["'0x0'", "'0x100000000'"] {
            let dir = tempdir().unwrap();
            write_minimal_tree(
                dir.path(),
                &format!("bundle:\n  platform: 1\nresources:\n  {key}:\n    type: 0\n"),
            );
            let err = load_description(dir.path(), &AlignmentDefaults::default()).unwrap_err();
            assert!(err.to_string().contains("is invalid"));
        }
    }

    #[test]
    fn test_invalid_platform_is_fatal() {
        let dir = tempdir().unwrap();
        write_minimal_tree(dir.path(), "bundle:\n  platform: 4\nresources: {}\n");
        let err = load_description(dir.path(), &AlignmentDefaults::default()).unwrap_err();
        assert!(err.to_string().contains("Must be 1, 2, or 3"));
    }

    #[test]
    fn test_per_resource_imports_resolved() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("00000001.dat"), vec![0u8; 0x40]).unwrap();
        fs::write(
            dir.path().join("00000001_imports.yaml"),
            "- '0x00000010': '0xdeadbeef'\n- '0x00000020': '0xfeedface'\n",
        )
        .unwrap();
        write_minimal_tree(
            dir.path(),
            "bundle:\n  platform: 1\nresources:\n  '0x1':\n    type: 0\n",
        );
        let desc = load_description(dir.path(), &AlignmentDefaults::default()).unwrap();
        assert_eq!(
            desc.resources[0].imports,
            vec![
                ImportEntry {
                    id: 0xDEADBEEF,
                    offset: 0x10
                },
                ImportEntry {
                    id: 0xFEEDFACE,
                    offset: 0x20
                },
            ]
        );
    }

    #[test]
    fn test_combined_imports_resolved() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("00000001.dat"), vec![0u8; 0x40]).unwrap();
        fs::write(
            dir.path().join(IMPORTS_FILENAME),
            "'0x00000001':\n- '0x00000010': '0x2'\n",
        )
        .unwrap();
        write_minimal_tree(
            dir.path(),
            "bundle:\n  platform: 1\nresources:\n  '0x1':\n    type: 0\n",
        );
        let desc = load_description(dir.path(), &AlignmentDefaults::default()).unwrap();
        assert_eq!(
            desc.resources[0].imports,
            vec![ImportEntry { id: 2, offset: 0x10 }]
        );
    }

    #[test]
    fn test_import_offset_out_of_range_is_fatal() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("00000001.dat"), b"tiny").unwrap();
        fs::write(
            dir.path().join("00000001_imports.yaml"),
            "- '0x00000010': '0x2'\n",
        )
        .unwrap();
        write_minimal_tree(
            dir.path(),
            "bundle:\n  platform: 1\nresources:\n  '0x1':\n    type: 0\n",
        );
        let err = load_description(dir.path(), &AlignmentDefaults::default()).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_import_with_multiple_keys_is_fatal() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("00000001.dat"), vec![0u8; 0x40]).unwrap();
        fs::write(
            dir.path().join("00000001_imports.yaml"),
            "- '0x00000010': '0x2'\n  '0x00000020': '0x3'\n",
        )
        .unwrap();
        write_minimal_tree(
            dir.path(),
            "bundle:\n  platform: 1\nresources:\n  '0x1':\n    type: 0\n",
        );
        let err = load_description(dir.path(), &AlignmentDefaults::default()).unwrap_err();
        assert!(err.to_string().contains("Only one import per offset"));
    }

    #[test]
    fn test_metadata_round_trip_through_writer() {
        use crate::bundle::{Bundle, ResourceEntry, FLAG_IS_COMPRESSED};

        let dir = tempdir().unwrap();
        let bundle = Bundle {
            platform_word: 1,
            flags: FLAG_IS_COMPRESSED,
            resource_count: 1,
            entries: vec![ResourceEntry {
                id: 0xABCD,
                uncompressed_info: [32 | (4 << 28), 0, 0],
                compressed_size: [32, 0, 0],
                type_tag: 0x3,
                ..Default::default()
            }],
            ..Default::default()
        };
        write_metadata(dir.path(), &bundle).unwrap();
        fs::write(dir.path().join("0000ABCD.dat"), vec![1u8; 32]).unwrap();

        let desc = load_description(dir.path(), &AlignmentDefaults::default()).unwrap();
        assert_eq!(desc.platform, Platform::Pc);
        assert!(desc.compressed);
        // mainMemOptimised was absent from the flags, so the writer emits
        // false and the loader keeps it.
        assert!(!desc.main_mem_optimised);
        assert_eq!(desc.resources[0].id, 0xABCD);
        assert_eq!(desc.resources[0].type_tag, 0x3);
        assert_eq!(desc.resources[0].primary_alignment_exp, 4);
    }
}
