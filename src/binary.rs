//! A second cursor, layered on top of [`ByteReader`], for the fixed-width
//! binary fields used by cross-reference streams and (outside the core's
//! scope, but a contract font codecs plug into the same way) binary font
//! tables: big-endian integers, fixed-point numbers, tags and raw strings.

use crate::bytes::ByteReader;
use crate::error::{PDFError, Result};

pub(crate) struct BinaryScanner {
    reader: ByteReader,
}

impl BinaryScanner {
    pub(crate) fn new(reader: ByteReader) -> Self {
        Self { reader }
    }

    fn take_checked(&mut self, n: usize) -> Result<&[u8]> {
        if self.reader.remaining() < n {
            return Err(PDFError::malformed(
                self.reader.position() as u64,
                format!("binary scanner under-read: needed {} bytes, had {}", n, self.reader.remaining()),
            ));
        }
        Ok(self.reader.take(n))
    }

    pub(crate) fn u8(&mut self) -> Result<u8> {
        Ok(self.take_checked(1)?[0])
    }

    pub(crate) fn i8(&mut self) -> Result<i8> {
        Ok(self.take_checked(1)?[0] as i8)
    }

    pub(crate) fn u16(&mut self) -> Result<u16> {
        let b = self.take_checked(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub(crate) fn i16(&mut self) -> Result<i16> {
        let b = self.take_checked(2)?;
        Ok(i16::from_be_bytes([b[0], b[1]]))
    }

    pub(crate) fn u24(&mut self) -> Result<u32> {
        let b = self.take_checked(3)?;
        Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    pub(crate) fn u32(&mut self) -> Result<u32> {
        let b = self.take_checked(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn i32(&mut self) -> Result<i32> {
        let b = self.take_checked(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Big-endian unsigned integer of arbitrary byte width (used by xref
    /// stream fields, whose widths come from `/W`).
    pub(crate) fn uint(&mut self, width: usize) -> Result<u64> {
        if width == 0 {
            return Ok(0);
        }
        let b = self.take_checked(width)?;
        let mut value = 0u64;
        for &byte in b {
            value = (value << 8) | byte as u64;
        }
        Ok(value)
    }

    /// 16.16 fixed-point, as used by font tables.
    pub(crate) fn fixed_16_16(&mut self) -> Result<f64> {
        let raw = self.i32()?;
        Ok(raw as f64 / 65536.0)
    }

    /// 2.14 fixed-point, as used by font tables (glyf `F2Dot14`).
    pub(crate) fn fixed_2_14(&mut self) -> Result<f64> {
        let raw = self.i16()?;
        Ok(raw as f64 / 16384.0)
    }

    /// A 4-byte tag (e.g. a sfnt table tag), kept as raw bytes.
    pub(crate) fn tag(&mut self) -> Result<[u8; 4]> {
        let b = self.take_checked(4)?;
        Ok([b[0], b[1], b[2], b[3]])
    }

    pub(crate) fn bytes(&mut self, n: usize) -> Result<&[u8]> {
        self.take_checked(n)
    }

    pub(crate) fn ascii_string(&mut self, n: usize) -> Result<String> {
        let bytes = self.take_checked(n)?.to_vec();
        Ok(bytes.into_iter().map(|b| b as char).collect())
    }

    pub(crate) fn null_terminated_string(&mut self) -> Result<String> {
        let start = self.reader.position();
        let mut end = start;
        let all = self.reader.as_slice();
        while end < all.len() && all[end] != 0 {
            end += 1;
        }
        let text = String::from_utf8_lossy(&all[start..end]).into_owned();
        self.reader.move_to((end + 1).min(all.len()));
        Ok(text)
    }

    pub(crate) fn position(&self) -> usize {
        self.reader.position()
    }

    pub(crate) fn remaining(&self) -> usize {
        self.reader.remaining()
    }
}
