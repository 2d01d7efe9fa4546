//! Staged flash updates through the bootloader.
//!
//! Updates are a two-phase commit. Phase 1 stages the image in RAM: the blob
//! is sent as `(absolute offset, length, bytes)` chunks at strictly
//! increasing, chunk-size-aligned offsets. Phase 2 commits: a single command
//! names the destination and total size, and the device relocates the staged
//! bytes to the destination's physical storage, SPI flash for the
//! bootloader and NAND regions for everything else.
//!
//! A failed chunk aborts the whole upload; there is no retry and no rollback.
//! Commit failures are likewise never retried automatically: re-sending a
//! destructive write without the caller's say-so is how devices get bricked.
//!
//! # Warning
//!
//! [`FlashTarget::Bootloader`] overwrites the code that performs these very
//! updates. A failed or interrupted bootloader write leaves the device
//! unrecoverable over USB. Prefer [`FlashUpdater::flash_firmware`] and
//! friends; reach for [`flash_bootloader`](FlashUpdater::flash_bootloader)
//! only with a known-good image and a stable power supply.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::protocol::opcodes;
use crate::session::DeviceSession;
use crate::transport::Transport;
use crate::{DeviceError, Result};

/// Destination region for a staged flash commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlashTarget {
    /// The bootloader itself, in SPI flash. Destructive: a failed write
    /// bricks the device.
    Bootloader,
    /// Main firmware image.
    Firmware,
    /// Factory calibration data.
    Calibration,
    /// Welcome bitmap shown at power-on.
    WelcomeBitmap,
}

impl FlashTarget {
    /// Wire value understood by the bootloader.
    pub const fn as_byte(self) -> u8 {
        match self {
            FlashTarget::Bootloader => 1,
            FlashTarget::Firmware => 2,
            FlashTarget::Calibration => 3,
            FlashTarget::WelcomeBitmap => 6,
        }
    }

    /// Decode a wire value. Valid targets are 1, 2, 3 and 6.
    pub fn from_byte(value: u8) -> Result<Self> {
        match value {
            1 => Ok(FlashTarget::Bootloader),
            2 => Ok(FlashTarget::Firmware),
            3 => Ok(FlashTarget::Calibration),
            6 => Ok(FlashTarget::WelcomeBitmap),
            other => Err(DeviceError::validation(
                "flash target",
                format!("{other} is not a flash target (valid: 1, 2, 3, 6)"),
            )),
        }
    }
}

/// Flash-update operations over an active session.
///
/// A thin wrapper rather than methods on the session itself, so the
/// destructive surface is visibly opt-in at the call site.
pub struct FlashUpdater<'s, T: Transport> {
    session: &'s mut DeviceSession<T>,
}

impl<'s, T: Transport> FlashUpdater<'s, T> {
    pub fn new(session: &'s mut DeviceSession<T>) -> Self {
        FlashUpdater { session }
    }

    /// Stage one chunk at an absolute offset (phase 1).
    pub fn upload_chunk(&mut self, offset: u32, chunk: &[u8]) -> Result<()> {
        let mut payload = Vec::with_capacity(8 + chunk.len());
        payload.extend_from_slice(&offset.to_be_bytes());
        payload.extend_from_slice(&(chunk.len() as u32).to_be_bytes());
        payload.extend_from_slice(chunk);
        self.session.command("flash upload chunk", opcodes::FLASH_UPLOAD_CHUNK, &payload)?;
        Ok(())
    }

    /// Commit previously staged bytes to `target` (phase 2).
    ///
    /// The special case `commit(WelcomeBitmap, 0)` erases the existing
    /// welcome bitmap and needs no prior upload.
    pub fn commit(&mut self, target: FlashTarget, total_size: u32) -> Result<()> {
        let mut payload = vec![target.as_byte()];
        payload.extend_from_slice(&total_size.to_be_bytes());
        self.session.command("flash commit", opcodes::FLASH_COMMIT, &payload)?;
        info!(?target, total_size, "flash commit accepted");
        Ok(())
    }

    /// Stage `data` chunk by chunk, then commit it to `target`.
    ///
    /// Chunks go out at offsets `0, C, 2C, …` where `C` is the session's
    /// negotiated chunk size; the first failed chunk aborts the upload.
    pub fn upload(&mut self, target: FlashTarget, data: &[u8]) -> Result<()> {
        let chunk_size = self.session.chunk_size()?;
        let total = u32::try_from(data.len()).map_err(|_| {
            DeviceError::validation("flash image", format!("{} bytes exceeds u32", data.len()))
        })?;

        for (index, chunk) in data.chunks(chunk_size).enumerate() {
            let offset = (index * chunk_size) as u32;
            self.upload_chunk(offset, chunk)?;
            debug!(offset, len = chunk.len(), "flash chunk staged");
        }

        self.commit(target, total)
    }

    /// Stage and commit a firmware image.
    pub fn flash_firmware(&mut self, data: &[u8]) -> Result<()> {
        self.upload(FlashTarget::Firmware, data)
    }

    /// Stage and commit a calibration image.
    pub fn flash_calibration(&mut self, data: &[u8]) -> Result<()> {
        self.upload(FlashTarget::Calibration, data)
    }

    /// Stage and commit a welcome bitmap.
    pub fn flash_welcome_bitmap(&mut self, data: &[u8]) -> Result<()> {
        self.upload(FlashTarget::WelcomeBitmap, data)
    }

    /// Erase the welcome bitmap without uploading anything.
    pub fn erase_welcome_bitmap(&mut self) -> Result<()> {
        self.commit(FlashTarget::WelcomeBitmap, 0)
    }

    /// Stage and commit a bootloader image.
    ///
    /// # Warning
    ///
    /// A failed or interrupted write to the bootloader region bricks the
    /// device. Verify the image and the power supply before calling.
    pub fn flash_bootloader(&mut self, data: &[u8]) -> Result<()> {
        self.upload(FlashTarget::Bootloader, data)
    }
}
