//! Codec for the on-device asset catalog file (`Versions.dat`).
//!
//! The catalog inventories every installed asset (firmware, bitmaps, color
//! decks, sounds): one length-prefixed record per asset, concatenated into a
//! single file that travels through the chunked file-transfer protocol.
//!
//! Record layout (all integers little-endian, unlike the command channel):
//!
//! ```text
//! length    u32   byte count of the fields below, excluding itself
//! type      u16   asset type code
//! 5 fields  u16 length + 8-bit text: identifier, name, sku, description, version
//! size      u32   asset byte size
//! 1 field   u16 length + 8-bit text: filename
//! ```
//!
//! Text is 8-bit (Latin-1); decoding maps bytes to the matching code points
//! so foreign catalogs survive a decode/encode round-trip byte for byte.
//! Encoding always recomputes the record length from the encoded fields;
//! a stored length is never trusted or copied.

use serde::{Deserialize, Serialize};

use crate::records::utf16::Cursor;
use crate::{DeviceError, Result};

/// Asset type codes used in the catalog. Values are part of the on-device
/// file format and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetType {
    Bootloader,
    Firmware,
    WelcomeScreen,
    ColorDeck,
    MeasurementScreen,
    Sounds,
    DeviceConfig,
    ColorTransformMatrix,
    /// Code not known to this library; preserved verbatim so re-encoding
    /// is lossless.
    Other(u16),
}

impl AssetType {
    pub const fn as_u16(self) -> u16 {
        match self {
            AssetType::Bootloader => 1,
            AssetType::Firmware => 2,
            AssetType::WelcomeScreen => 3,
            AssetType::ColorDeck => 4,
            AssetType::MeasurementScreen => 5,
            AssetType::Sounds => 6,
            AssetType::DeviceConfig => 7,
            AssetType::ColorTransformMatrix => 8,
            AssetType::Other(code) => code,
        }
    }

    pub const fn from_u16(code: u16) -> Self {
        match code {
            1 => AssetType::Bootloader,
            2 => AssetType::Firmware,
            3 => AssetType::WelcomeScreen,
            4 => AssetType::ColorDeck,
            5 => AssetType::MeasurementScreen,
            6 => AssetType::Sounds,
            7 => AssetType::DeviceConfig,
            8 => AssetType::ColorTransformMatrix,
            other => AssetType::Other(other),
        }
    }
}

/// One catalog record describing an installed asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub asset_type: AssetType,
    pub identifier: String,
    pub name: String,
    pub sku: String,
    pub description: String,
    pub version: String,
    /// Asset size in bytes as recorded by the device.
    pub size: u32,
    pub filename: String,
}

fn decode_text(bytes: &[u8]) -> String {
    // Latin-1: every byte maps to the code point of the same value.
    bytes.iter().map(|&b| b as char).collect()
}

fn encode_text(text: &str, field: &'static str, out: &mut Vec<u8>) -> Result<()> {
    let start = out.len();
    out.extend_from_slice(&[0, 0]); // length placeholder
    for ch in text.chars() {
        let code = ch as u32;
        if code > 0xff {
            return Err(DeviceError::validation(
                field,
                format!("{ch:?} is not representable in 8-bit catalog text"),
            ));
        }
        out.push(code as u8);
    }
    let length = out.len() - start - 2;
    let length = u16::try_from(length).map_err(|_| {
        DeviceError::validation(field, format!("{length} bytes exceeds the u16 length prefix"))
    })?;
    out[start..start + 2].copy_from_slice(&length.to_le_bytes());
    Ok(())
}

fn read_text_field(cursor: &mut Cursor<'_>) -> Result<String> {
    let length = cursor.read_u16_le()? as usize;
    Ok(decode_text(cursor.take(length)?))
}

/// Decode a complete catalog file into its entries.
///
/// Decoding stops when the cursor reaches the end of the buffer; a record
/// extending past the buffer, or a record length prefix that disagrees with
/// the span of its decoded fields, is an error.
pub fn decode_catalog(data: &[u8]) -> Result<Vec<CatalogEntry>> {
    let mut cursor = Cursor::new(data, "catalog");
    let mut entries = Vec::new();
    while !cursor.at_end() {
        let declared = cursor.read_u32_le()? as usize;
        let record = cursor.take(declared)?;

        let mut fields = Cursor::new(record, "catalog record");
        let asset_type = AssetType::from_u16(fields.read_u16_le()?);
        let identifier = read_text_field(&mut fields)?;
        let name = read_text_field(&mut fields)?;
        let sku = read_text_field(&mut fields)?;
        let description = read_text_field(&mut fields)?;
        let version = read_text_field(&mut fields)?;
        let size = fields.read_u32_le()?;
        let filename = read_text_field(&mut fields)?;
        if !fields.at_end() {
            return Err(DeviceError::framing(
                "catalog record",
                format!(
                    "length prefix {declared} leaves {} undecoded bytes",
                    fields.remaining()
                ),
            ));
        }

        entries.push(CatalogEntry {
            asset_type,
            identifier,
            name,
            sku,
            description,
            version,
            size,
            filename,
        });
    }
    Ok(entries)
}

/// Encode one entry, recomputing its length prefix from the encoded fields.
pub fn encode_entry(entry: &CatalogEntry, out: &mut Vec<u8>) -> Result<()> {
    let mut record = Vec::new();
    record.extend_from_slice(&entry.asset_type.as_u16().to_le_bytes());
    encode_text(&entry.identifier, "identifier", &mut record)?;
    encode_text(&entry.name, "name", &mut record)?;
    encode_text(&entry.sku, "sku", &mut record)?;
    encode_text(&entry.description, "description", &mut record)?;
    encode_text(&entry.version, "version", &mut record)?;
    record.extend_from_slice(&entry.size.to_le_bytes());
    encode_text(&entry.filename, "filename", &mut record)?;

    out.extend_from_slice(&(record.len() as u32).to_le_bytes());
    out.extend_from_slice(&record);
    Ok(())
}

/// Encode a complete catalog file.
pub fn encode_catalog(entries: &[CatalogEntry]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for entry in entries {
        encode_entry(entry, &mut out)?;
    }
    Ok(out)
}
