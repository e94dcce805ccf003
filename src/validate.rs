//! Resource entry validation
//!
//! Bundles recovered from damaged media can be overwritten as early as
//! offset 0x800, so the header and already-validated entries can be
//! trusted but the current entry cannot. Every check here is cheap and
//! local; extraction must not proceed past a failed check. All offset
//! arithmetic is widened to u64 so adversarial sizes cannot wrap.

use crate::bundle::{Bundle, ResourceEntry};
use crate::error::{BundleError, Result};
use crate::types::MAX_KNOWN_TAG;

fn fail(index: usize, reason: String) -> Result<()> {
    Err(BundleError::EntryValidation { index, reason })
}

/// Validate the full entry table of a parsed bundle.
pub fn validate_entries(bundle: &Bundle) -> Result<()> {
    for (i, entry) in bundle.entries.iter().enumerate() {
        validate_entry(bundle, entry, i)?;
    }
    Ok(())
}

fn validate_entry(bundle: &Bundle, entry: &ResourceEntry, i: usize) -> Result<()> {
    if entry.id & 0xFFFF_FFFF == 0 {
        return fail(i, "null resource ID".into());
    }
    if entry.id >> 32 != 0 {
        return fail(i, format!("invalid resource ID 0x{:X}", entry.id));
    }
    if entry.imports_hash >> 32 != 0 {
        return fail(i, format!("invalid imports hash 0x{:X}", entry.imports_hash));
    }
    if entry.compressed_size[0] == 0 {
        return fail(i, "data size for main memory portion is 0".into());
    }
    if entry.type_tag > MAX_KNOWN_TAG {
        return fail(i, format!("invalid type 0x{:X}", entry.type_tag));
    }
    if entry.imports_offset > entry.uncompressed_size(0) {
        return fail(
            i,
            format!(
                "imports offset 0x{:X} is greater than resource size 0x{:X}",
                entry.imports_offset,
                entry.uncompressed_size(0)
            ),
        );
    }

    // Payloads on planes 0 and 1 must end before the next plane begins.
    for plane in 0..2 {
        let end = bundle.plane_offsets[plane] as u64
            + entry.local_offset[plane] as u64
            + entry.compressed_size[plane] as u64;
        if end > bundle.plane_offsets[plane + 1] as u64 {
            return fail(
                i,
                format!(
                    "memory type {plane}: end offset 0x{:X} is greater than memory type {} \
                     start offset 0x{:X}",
                    end,
                    plane + 1,
                    bundle.plane_offsets[plane + 1]
                ),
            );
        }
    }

    // Within a plane, each payload must begin at or after the end of the
    // nearest earlier entry that occupies the same plane.
    if i > 0 {
        for plane in 0..3 {
            // Offset 0 means first occupant of the plane; size 0 means no
            // data on this plane at all.
            if entry.local_offset[plane] == 0 || entry.compressed_size[plane] == 0 {
                continue;
            }
            let prev = bundle.entries[..i]
                .iter()
                .rev()
                .find(|e| e.compressed_size[plane] != 0);
            let Some(prev) = prev else {
                return fail(
                    i,
                    format!(
                        "memory type {plane}: offset is not 0, yet there is no previous \
                         resource with data"
                    ),
                );
            };
            let start = bundle.plane_offsets[plane] as u64 + entry.local_offset[plane] as u64;
            let prev_end = bundle.plane_offsets[plane] as u64
                + prev.local_offset[plane] as u64
                + prev.compressed_size[plane] as u64;
            if start < prev_end {
                return fail(
                    i,
                    format!(
                        "memory type {plane}: start offset 0x{start:X} is less than the \
                         previous resource end offset 0x{prev_end:X}"
                    ),
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_bundle() -> Bundle {
        let entry = |id: u64, local: u32, size: u32| ResourceEntry {
            id,
            uncompressed_info: [size | (4 << 28), 0, 0],
            compressed_size: [size, 0, 0],
            local_offset: [local, 0, 0],
            type_tag: 0x3,
            ..Default::default()
        };
        Bundle {
            platform_word: 1,
            debug_data_offset: 0x30,
            resource_count: 2,
            entries_offset: 0x30,
            plane_offsets: [0xB0, 0x100, 0x100],
            flags: 0,
            entries: vec![entry(0x10, 0, 0x20), entry(0x20, 0x20, 0x30)],
        }
    }

    fn assert_rejects(bundle: &Bundle, index: usize, fragment: &str) {
        match validate_entries(bundle) {
            Err(BundleError::EntryValidation { index: i, reason }) => {
                assert_eq!(i, index);
                assert!(
                    reason.contains(fragment),
                    "reason {reason:?} missing {fragment:?}"
                );
            }
            other => panic!("expected entry validation failure, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_bundle_passes() {
        validate_entries(&valid_bundle()).unwrap();
    }

    #[test]
    fn test_null_id() {
        let mut bundle = valid_bundle();
        bundle.entries[0].id = 0;
        assert_rejects(&bundle, 0, "null resource ID");
    }

    #[test]
    fn test_id_high_bits() {
        let mut bundle = valid_bundle();
        bundle.entries[0].id = 0x1_0000_0010;
        assert_rejects(&bundle, 0, "invalid resource ID");
    }

    #[test]
    fn test_imports_hash_high_bits() {
        let mut bundle = valid_bundle();
        bundle.entries[1].imports_hash = 0xFF_0000_0000;
        assert_rejects(&bundle, 1, "invalid imports hash");
    }

    #[test]
    fn test_zero_main_portion() {
        let mut bundle = valid_bundle();
        bundle.entries[1].compressed_size[0] = 0;
        assert_rejects(&bundle, 1, "main memory portion is 0");
    }

    #[test]
    fn test_type_out_of_range() {
        let mut bundle = valid_bundle();
        bundle.entries[0].type_tag = MAX_KNOWN_TAG + 1;
        assert_rejects(&bundle, 0, "invalid type");
    }

    #[test]
    fn test_imports_offset_past_payload() {
        let mut bundle = valid_bundle();
        bundle.entries[0].imports_offset = 0x21;
        assert_rejects(&bundle, 0, "imports offset");
    }

    #[test]
    fn test_payload_crosses_plane_boundary() {
        let mut bundle = valid_bundle();
        bundle.entries[1].compressed_size[0] = 0x40;
        bundle.entries[1].uncompressed_info[0] = 0x40 | (4 << 28);
        assert_rejects(&bundle, 1, "start offset");
    }

    #[test]
    fn test_overlapping_payloads() {
        let mut bundle = valid_bundle();
        bundle.entries[1].local_offset[0] = 0x10;
        assert_rejects(&bundle, 1, "previous resource end offset");
    }

    #[test]
    fn test_overlap_skips_entries_without_plane_data() {
        // Middle entry has no plane-1 data; the third entry's plane-1
        // payload is checked against the first one's.
        let mut bundle = valid_bundle();
        bundle.plane_offsets = [0xF0, 0x180, 0x200];
        bundle.resource_count = 3;
        bundle.entries[0].uncompressed_info[1] = 0x20 | (7 << 28);
        bundle.entries[0].compressed_size[1] = 0x20;
        let mut third = bundle.entries[1].clone();
        bundle.entries[1].local_offset[0] = 0x20;
        third.id = 0x30;
        third.local_offset[0] = 0x50;
        third.uncompressed_info[1] = 0x10 | (7 << 28);
        third.compressed_size[1] = 0x10;
        third.local_offset[1] = 0x20;
        bundle.entries.push(third);
        validate_entries(&bundle).unwrap();

        bundle.entries[2].local_offset[1] = 0x1F;
        assert_rejects(&bundle, 2, "memory type 1");
    }

    #[test]
    fn test_adversarial_sizes_do_not_overflow() {
        let mut bundle = valid_bundle();
        bundle.entries[1].local_offset[0] = u32::MAX;
        bundle.entries[1].compressed_size[0] = u32::MAX;
        bundle.entries[1].uncompressed_info[0] = 0x0FFF_FFFF;
        assert_rejects(&bundle, 1, "memory type 0");
    }
}
