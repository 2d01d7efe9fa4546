//! Opcode table for the RM200 command set.
//!
//! Opcodes are a fixed, device-specific contract: one or two bytes that
//! prefix every request frame. The `0x78` family is handled by the device's
//! system firmware (and mostly also by the bootloader); the `0x77` family
//! covers the file system and the staged flash-update path.
//!
//! There is no negotiation or versioning: these values must match the
//! firmware byte for byte.

/// Negotiate the communication buffer size (response: u32 BE).
pub const GET_BUFFER_SIZE: &[u8] = &[0x78, 0x11];
/// Device information strings (count-prefixed, NUL-separated).
pub const GET_DEVICE_INFO: &[u8] = &[0x78, 0x12];
/// Bootloader version string (NUL-terminated).
pub const GET_BOOTLOADER_VERSION: &[u8] = &[0x78, 0x2d];
/// Firmware version string (NUL-terminated).
pub const GET_FIRMWARE_VERSION: &[u8] = &[0x77, 0x01];
/// Chip identifier (raw bytes).
pub const GET_CHIP_ID: &[u8] = &[0x78, 0x07];

/// Directory listing of on-device storage (count-prefixed strings).
pub const FILE_DIR: &[u8] = &[0x77, 0x24];
/// Delete a file; payload: name + NUL.
pub const FILE_DELETE: &[u8] = &[0x77, 0x25];
/// Open a file; payload: mode byte + name + NUL.
pub const FILE_OPEN: &[u8] = &[0x77, 0x20];
/// Close the currently open file.
pub const FILE_CLOSE: &[u8] = &[0x77, 0x21];
/// Read the next chunk of the open file (response: u32 BE length + bytes).
pub const FILE_READ: &[u8] = &[0x77, 0x22];
/// Write a chunk to the open file; payload: u32 BE length + bytes.
pub const FILE_WRITE: &[u8] = &[0x77, 0x23];

/// Stage a flash chunk; payload: offset u32 BE + length u32 BE + bytes.
pub const FLASH_UPLOAD_CHUNK: &[u8] = &[0x77, 0x12];
/// Commit staged flash data; payload: target byte + total size u32 BE.
pub const FLASH_COMMIT: &[u8] = &[0x77, 0x13];
/// Switch the device into its bootloader; payload: [`ENTER_BOOTLOADER_KEY`].
pub const ENTER_BOOTLOADER: &[u8] = &[0x78, 0x10];
/// Fixed key the firmware requires before dropping into the bootloader.
pub const ENTER_BOOTLOADER_KEY: &[u8] = &[0x87, 0xef, 0x3a, 0x1a];
/// Reboot the device.
pub const REBOOT: &[u8] = &[0x77, 0x14];

/// Query the current device mode (response: 1 byte).
pub const GET_DEVICE_MODE: &[u8] = &[0x78, 0x2a];
/// Set the device mode; payload: mode byte.
pub const SET_DEVICE_MODE: &[u8] = &[0x78, 0x29];
/// Query (bare) or set (with mode byte) the measurement aperture.
pub const APERTURE: &[u8] = &[0x78, 0x25];
/// Trigger a measurement; payload: aperture byte.
pub const TRIGGER_MEASUREMENT: &[u8] = &[0x78, 0x35];

/// Scanned/saved color records (variable multi-field records).
pub const GET_SCANNED_COLORS: &[u8] = &[0x78, 0x23];
/// Color-deck listing (variable multi-field records).
pub const GET_COLOR_DECKS: &[u8] = &[0x78, 0x21];
