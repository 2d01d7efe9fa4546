//! Bounds-checked cursor over record payloads.
//!
//! Device records mix three field kinds: UTF-16 string runs terminated by a
//! two-byte zero sentinel, fixed-width integers in either byte order, and
//! reserved runs of unknown meaning but fixed width. The cursor exposes one
//! primitive per kind so record decoders read like the firmware's layout
//! tables, and every access is bounds-checked with a typed error instead of a
//! panic.
//!
//! The string scan is word-aligned: code units are read two bytes at a time
//! from the scan start, so a lone zero byte in the low or high half of a
//! code unit never terminates the field; only an all-zero code unit does.

use crate::{DeviceError, Result};

/// Cursor over a byte slice with record-decoding primitives.
#[derive(Debug)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    context: &'static str,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8], context: &'static str) -> Self {
        Cursor { data, pos: 0, context }
    }

    /// Current byte offset from the start of the slice.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// True once every byte has been consumed.
    pub fn at_end(&self) -> bool {
        self.pos == self.data.len()
    }

    fn short(&self, what: &str, wanted: usize) -> DeviceError {
        DeviceError::framing(
            self.context,
            format!("truncated at offset {}: {what} needs {wanted} bytes, {} left", self.pos, self.remaining()),
        )
    }

    /// Take `count` raw bytes.
    pub fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        if self.remaining() < count {
            return Err(self.short("raw run", count));
        }
        let slice = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    /// Skip a reserved run of fixed width.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.take(count).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16_be(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a UTF-16 string run up to (and consuming) its two-byte zero
    /// sentinel, leaving the cursor exactly past the sentinel.
    pub fn read_utf16_field(&mut self) -> Result<String> {
        let mut units = Vec::new();
        loop {
            if self.remaining() < 2 {
                return Err(self.short("UTF-16 code unit or sentinel", 2));
            }
            let unit = u16::from_le_bytes([self.data[self.pos], self.data[self.pos + 1]]);
            self.pos += 2;
            if unit == 0 {
                break;
            }
            units.push(unit);
        }
        String::from_utf16(&units).map_err(|e| {
            DeviceError::framing(self.context, format!("invalid UTF-16 string run: {e}"))
        })
    }
}

/// Encode a string as UTF-16 little-endian code units plus the two-byte zero
/// sentinel. Counterpart of [`Cursor::read_utf16_field`], used by tests and
/// by callers that assemble device records.
pub fn encode_utf16_field(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len() * 2 + 2);
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes.extend_from_slice(&[0, 0]);
    bytes
}
