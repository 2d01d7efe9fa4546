//! Binary codecs for device-resident records.
//!
//! Two families of data share these codecs: variable multi-field records
//! carried directly inside command payloads (scanned colors, color-deck
//! listings), and the catalog file stored in on-device flash that inventories
//! installed assets. The multi-field records interleave UTF-16 string runs
//! with fixed-width integers and reserved byte runs whose offsets are part of
//! the wire contract; [`utf16::Cursor`] is the shared primitive that walks
//! them without miscounting.

pub mod catalog;
pub mod color;
pub mod utf16;
