//! Physical USB transport via `rusb`.
//!
//! The device enumerates with vendor 0x0765, product 0x6001 and exposes one
//! interface with bulk endpoints 0x02 (OUT) and 0x81 (IN). Outgoing frames
//! are preceded by a vendor control transfer announcing the frame length,
//! split across the `value` and `index` fields.

use std::time::Duration;

use rusb::{DeviceHandle, GlobalContext};
use tracing::{debug, info};

use crate::transport::Transport;
use crate::{DeviceError, Result};

/// USB vendor ID of the RM200.
pub const VENDOR_ID: u16 = 0x0765;
/// USB product ID of the RM200.
pub const PRODUCT_ID: u16 = 0x6001;

/// Request type for the length-announcement control transfer
/// (vendor, host-to-device).
const ANNOUNCE_REQUEST_TYPE: u8 = 0x40;
/// Vendor request code for the length announcement.
const ANNOUNCE_REQUEST: u8 = 0x97;

/// Timeout for control and bulk-write transactions. Bulk reads use the
/// per-call timeout handed down by the session.
const WRITE_TIMEOUT: Duration = Duration::from_millis(500);

/// Transport backed by a claimed USB device handle.
pub struct UsbTransport {
    handle: DeviceHandle<GlobalContext>,
}

impl UsbTransport {
    /// Find and claim the first RM200 on the bus.
    pub fn open() -> Result<Self> {
        Self::open_with_ids(VENDOR_ID, PRODUCT_ID)
    }

    /// Find and claim a device by explicit vendor/product IDs.
    pub fn open_with_ids(vendor_id: u16, product_id: u16) -> Result<Self> {
        let handle = rusb::open_device_with_vid_pid(vendor_id, product_id).ok_or_else(|| {
            DeviceError::transport(
                "open usb device",
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no device {vendor_id:04x}:{product_id:04x} on the bus"),
                ),
            )
        })?;

        handle
            .set_active_configuration(1)
            .map_err(|e| DeviceError::usb("set configuration", e))?;
        handle.claim_interface(0).map_err(|e| DeviceError::usb("claim interface", e))?;

        info!(vendor_id, product_id, "claimed USB device");
        Ok(UsbTransport { handle })
    }
}

impl Transport for UsbTransport {
    fn announce(&mut self, length: u32) -> Result<()> {
        self.handle
            .write_control(
                ANNOUNCE_REQUEST_TYPE,
                ANNOUNCE_REQUEST,
                (length >> 16) as u16,
                (length & 0xffff) as u16,
                &[],
                WRITE_TIMEOUT,
            )
            .map_err(|e| DeviceError::usb("length announcement", e))?;
        Ok(())
    }

    fn write(&mut self, endpoint: u8, bytes: &[u8]) -> Result<()> {
        let written = self
            .handle
            .write_bulk(endpoint, bytes, WRITE_TIMEOUT)
            .map_err(|e| DeviceError::usb("bulk write", e))?;
        if written != bytes.len() {
            return Err(DeviceError::framing(
                "bulk write",
                format!("short write: {written} of {} bytes", bytes.len()),
            ));
        }
        Ok(())
    }

    fn read(&mut self, endpoint: u8, max_length: usize, timeout: Duration) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; max_length];
        match self.handle.read_bulk(endpoint, &mut buffer, timeout) {
            Ok(received) => {
                buffer.truncate(received);
                debug!(received, "bulk read");
                Ok(buffer)
            }
            // An empty buffer on timeout is part of the transport contract.
            Err(rusb::Error::Timeout) => Ok(Vec::new()),
            Err(e) => Err(DeviceError::usb("bulk read", e)),
        }
    }
}

impl Drop for UsbTransport {
    fn drop(&mut self) {
        let _ = self.handle.release_interface(0);
    }
}
