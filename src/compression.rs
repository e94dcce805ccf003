//! zlib compression for resource payloads
//!
//! Payloads are stored as raw RFC 1950 zlib streams when the bundle's
//! IsCompressed flag is set. Each resource's plane is compressed as one
//! independent stream.
//!
//! **Design**:
//! - Compression level: 9 (the game ships maximally-compressed bundles)
//! - Decompression targets a known size from the entry's packed size field;
//!   output is capped at that size so corrupt entries cannot balloon memory
//! - Decode failure is recoverable on extract (the plane is skipped with a
//!   warning), fatal on create

use crate::error::{BundleError, Result};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Compression level used when creating bundles.
pub const LEVEL: u32 = 9;

/// Compress `data` into a zlib stream.
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let out = Vec::with_capacity(data.len() + 1024);
    let mut encoder = ZlibEncoder::new(out, Compression::new(LEVEL));
    encoder
        .write_all(data)
        .map_err(|e| BundleError::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| BundleError::Compression(e.to_string()))
}

/// Decompress a zlib stream whose decoded length is known in advance.
///
/// Fails if the stream is malformed or does not decode to exactly
/// `expected_len` bytes.
pub fn decompress(data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut decoder = ZlibDecoder::new(data).take(expected_len as u64 + 1);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| BundleError::Decompression(e.to_string()))?;
    if out.len() != expected_len {
        return Err(BundleError::Decompression(format!(
            "expected {} bytes, got {}",
            expected_len,
            out.len()
        )));
    }
    Ok(out)
}
