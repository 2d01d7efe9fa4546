//! Wire-level enums shared across the command set.
//!
//! Each enum maps to a fixed byte value from the device firmware. Conversions
//! from raw bytes are fallible and out-of-range values are rejected as
//! [`Validation`](crate::DeviceError::Validation) errors before any transport
//! I/O takes place.

use serde::{Deserialize, Serialize};

use crate::{DeviceError, Result};

/// Operating mode of the device.
///
/// Setting [`BatteryOnly`](DeviceMode::BatteryOnly) turns the screen off until
/// a key press or a mode change; [`Sync`](DeviceMode::Sync) shows the sync
/// screen when a `SyncMode.bmp` is present on the flash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceMode {
    General,
    BatteryOnly,
    Sync,
    Remote,
    Tukan,
    BatteryPowered,
    MassStorage,
}

impl DeviceMode {
    /// Wire value understood by the firmware.
    pub const fn as_byte(self) -> u8 {
        match self {
            DeviceMode::General => 1,
            DeviceMode::BatteryOnly => 2,
            DeviceMode::Sync => 3,
            DeviceMode::Remote => 4,
            DeviceMode::Tukan => 5,
            DeviceMode::BatteryPowered => 6,
            DeviceMode::MassStorage => 9,
        }
    }

    /// Decode a wire value. Valid modes are 1..=6 and 9.
    pub fn from_byte(value: u8) -> Result<Self> {
        match value {
            1 => Ok(DeviceMode::General),
            2 => Ok(DeviceMode::BatteryOnly),
            3 => Ok(DeviceMode::Sync),
            4 => Ok(DeviceMode::Remote),
            5 => Ok(DeviceMode::Tukan),
            6 => Ok(DeviceMode::BatteryPowered),
            9 => Ok(DeviceMode::MassStorage),
            other => Err(DeviceError::validation(
                "device mode",
                format!("{other} is not a device mode (valid: 1-6, 9)"),
            )),
        }
    }
}

/// Measurement aperture selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Aperture {
    Small,
    Medium,
    /// Large aperture, also used as the auto setting.
    Large,
}

impl Aperture {
    pub const fn as_byte(self) -> u8 {
        match self {
            Aperture::Small => 0,
            Aperture::Medium => 1,
            Aperture::Large => 2,
        }
    }

    pub fn from_byte(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Aperture::Small),
            1 => Ok(Aperture::Medium),
            2 => Ok(Aperture::Large),
            other => Err(DeviceError::validation(
                "aperture",
                format!("{other} is not an aperture (valid: 0=small, 1=medium, 2=large)"),
            )),
        }
    }
}

/// Mode byte for the file-open command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpenMode {
    Read,
    Write,
}

impl OpenMode {
    pub const fn as_byte(self) -> u8 {
        match self {
            OpenMode::Read => 1,
            OpenMode::Write => 2,
        }
    }
}
