//! Decoders for the device's color-sample and color-deck listings.
//!
//! Both listings arrive as a 4-byte big-endian record count followed by the
//! records themselves. Record layouts are fixed by the firmware:
//!
//! Scanned/saved color sample (opcode `78 23`), per record:
//!
//! ```text
//! sample name      UTF-16 run + sentinel
//! deck name        UTF-16 run + sentinel
//! best-match code  UTF-16 run + sentinel
//! reserved         4 bytes, unknown
//! timestamp        year u16 BE, month u8, day u8, hour u8, minute u8
//! reserved         2 bytes, unknown
//! ```
//!
//! Color-deck listing (opcode `78 21`), per record:
//!
//! ```text
//! deck name        UTF-16 run + sentinel
//! deck code        UTF-16 run + sentinel
//! enabled          u8 (0/1)
//! priority         u8
//! color count      u16 BE
//! reserved         6 bytes, unknown
//! ```
//!
//! The reserved runs carry data on some firmware revisions; they are skipped
//! at exactly the stated widths so every later field keeps its wire offset.

use serde::{Deserialize, Serialize};

use crate::records::utf16::Cursor;
use crate::{DeviceError, Result};

/// Width of the reserved run after the string block of a color record.
const COLOR_RESERVED_HEAD: usize = 4;
/// Width of the reserved tail of a color record.
const COLOR_RESERVED_TAIL: usize = 2;
/// Width of the reserved tail of a deck record.
const DECK_RESERVED_TAIL: usize = 6;

/// When a sample was measured, in device-local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
}

/// One scanned or saved color sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorRecord {
    /// User-visible sample name.
    pub name: String,
    /// Deck the best match was taken from.
    pub deck: String,
    /// Identifier of the closest deck color.
    pub best_match: String,
    /// Measurement time.
    pub measured_at: Timestamp,
}

/// One installed color deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckRecord {
    /// User-visible deck name.
    pub name: String,
    /// Deck identifier code.
    pub code: String,
    /// Whether the deck participates in matching.
    pub enabled: bool,
    /// Match ordering priority (lower wins).
    pub priority: u8,
    /// Number of colors in the deck.
    pub color_count: u16,
}

fn read_count(cursor: &mut Cursor<'_>) -> Result<usize> {
    Ok(cursor.read_u32_be()? as usize)
}

/// Decode a scanned-colors payload (opcode `78 23`).
pub fn decode_color_records(payload: &[u8]) -> Result<Vec<ColorRecord>> {
    let mut cursor = Cursor::new(payload, "color records");
    let count = read_count(&mut cursor)?;
    let mut records = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let name = cursor.read_utf16_field()?;
        let deck = cursor.read_utf16_field()?;
        let best_match = cursor.read_utf16_field()?;
        cursor.skip(COLOR_RESERVED_HEAD)?;
        let measured_at = Timestamp {
            year: cursor.read_u16_be()?,
            month: cursor.read_u8()?,
            day: cursor.read_u8()?,
            hour: cursor.read_u8()?,
            minute: cursor.read_u8()?,
        };
        cursor.skip(COLOR_RESERVED_TAIL)?;
        records.push(ColorRecord { name, deck, best_match, measured_at });
    }
    if !cursor.at_end() {
        return Err(DeviceError::framing(
            "color records",
            format!("{} trailing bytes after {count} records", cursor.remaining()),
        ));
    }
    Ok(records)
}

/// Decode a color-deck listing payload (opcode `78 21`).
pub fn decode_deck_records(payload: &[u8]) -> Result<Vec<DeckRecord>> {
    let mut cursor = Cursor::new(payload, "deck records");
    let count = read_count(&mut cursor)?;
    let mut records = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let name = cursor.read_utf16_field()?;
        let code = cursor.read_utf16_field()?;
        let enabled = cursor.read_u8()? != 0;
        let priority = cursor.read_u8()?;
        let color_count = cursor.read_u16_be()?;
        cursor.skip(DECK_RESERVED_TAIL)?;
        records.push(DeckRecord { name, code, enabled, priority, color_count });
    }
    if !cursor.at_end() {
        return Err(DeviceError::framing(
            "deck records",
            format!("{} trailing bytes after {count} records", cursor.remaining()),
        ));
    }
    Ok(records)
}
