//! Endian-aware I/O over seekable byte sources
//!
//! Bundles are written for three targets with differing byte orders. All
//! multi-byte integer I/O goes through [`DataStream`], which swaps bytes
//! according to the selected [`Platform`]. Raw byte and string I/O is never
//! swapped; in particular the `bnd2` magic appears in the same byte order on
//! every platform.

use crate::error::Result;
use std::io::{Read, Seek, SeekFrom, Write};

/// Target platform of a bundle, which fixes its byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Little-endian.
    Pc,
    /// Big-endian.
    X360,
    /// Big-endian.
    Ps3,
}

impl Platform {
    /// Parse the logical platform value used in the header and sidecar
    /// (1, 2 or 3).
    pub fn from_meta(value: u32) -> Option<Self> {
        match value {
            1 => Some(Platform::Pc),
            2 => Some(Platform::X360),
            3 => Some(Platform::Ps3),
            _ => None,
        }
    }

    /// Resolve the platform word probed from a bundle file.
    ///
    /// The word is always read as raw little-endian, so the big-endian
    /// targets show up byte-swapped. This matches how the files are
    /// actually written and must not be "corrected".
    pub fn from_wire(word: u32) -> Option<Self> {
        match word {
            1 => Some(Platform::Pc),
            0x0200_0000 => Some(Platform::X360),
            0x0300_0000 => Some(Platform::Ps3),
            _ => None,
        }
    }

    /// The logical header/sidecar value (1, 2 or 3).
    pub fn meta_value(self) -> u32 {
        match self {
            Platform::Pc => 1,
            Platform::X360 => 2,
            Platform::Ps3 => 3,
        }
    }

    pub fn is_big_endian(self) -> bool {
        !matches!(self, Platform::Pc)
    }
}

/// Byte reader/writer with platform-determined integer byte order.
#[derive(Debug)]
pub struct DataStream<S> {
    inner: S,
    platform: Platform,
}

impl<S> DataStream<S> {
    pub fn new(inner: S, platform: Platform) -> Self {
        DataStream { inner, platform }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn set_platform(&mut self, platform: Platform) {
        self.platform = platform;
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Seek> DataStream<S> {
    /// Seek to an absolute offset.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    pub fn position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }
}

impl<S: Read> DataStream<S> {
    pub fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.inner.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.inner.read_exact(&mut buf)?;
        Ok(if self.platform.is_big_endian() {
            u16::from_be_bytes(buf)
        } else {
            u16::from_le_bytes(buf)
        })
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.inner.read_exact(&mut buf)?;
        Ok(if self.platform.is_big_endian() {
            u32::from_be_bytes(buf)
        } else {
            u32::from_le_bytes(buf)
        })
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.inner.read_exact(&mut buf)?;
        Ok(if self.platform.is_big_endian() {
            u64::from_be_bytes(buf)
        } else {
            u64::from_le_bytes(buf)
        })
    }

    /// Read `len` raw bytes, no swapping.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read a fixed-length ASCII string with trailing NULs stripped.
    pub fn read_string(&mut self, len: usize) -> Result<String> {
        let mut buf = self.read_bytes(len)?;
        while buf.last() == Some(&0) {
            buf.pop();
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Read bytes up to (and consuming) a NUL terminator or end of stream.
    pub fn read_cstring(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut buf = [0u8; 1];
        loop {
            match self.inner.read(&mut buf)? {
                0 => break,
                _ if buf[0] == 0 => break,
                _ => out.push(buf[0]),
            }
        }
        Ok(out)
    }
}

impl<S: Write> DataStream<S> {
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.inner.write_all(&[value])?;
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        let buf = if self.platform.is_big_endian() {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };
        self.inner.write_all(&buf)?;
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        let buf = if self.platform.is_big_endian() {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };
        self.inner.write_all(&buf)?;
        Ok(())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        let buf = if self.platform.is_big_endian() {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };
        self.inner.write_all(&buf)?;
        Ok(())
    }

    /// Write raw bytes verbatim, no swapping.
    pub fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        self.inner.write_all(buf)?;
        Ok(())
    }

    /// Write a string's bytes verbatim, no terminator.
    pub fn write_string(&mut self, s: &str) -> Result<()> {
        self.write_bytes(s.as_bytes())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}
