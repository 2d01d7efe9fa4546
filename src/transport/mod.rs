//! Transport abstraction between the protocol engine and the USB stack.
//!
//! The engine never touches USB types directly; everything it needs from the
//! wire is the three-operation [`Transport`] contract: announce an outgoing
//! length over the control channel, bulk-write the frame, bulk-read the
//! response. Implementations:
//!
//! - [`MockTransport`]: scripted exchanges for tests and offline development
//! - [`UsbTransport`] (`usb` feature): the physical device via `rusb`

mod mock;
#[cfg(feature = "usb")]
mod usb;

pub use mock::{Exchange, MockTransport};
#[cfg(feature = "usb")]
pub use usb::UsbTransport;

use std::time::Duration;

use crate::Result;

/// Bulk OUT endpoint carrying request frames.
pub const ENDPOINT_OUT: u8 = 0x02;
/// Bulk IN endpoint carrying response frames.
pub const ENDPOINT_IN: u8 = 0x81;

/// Blocking, single-channel byte transport to one device.
///
/// Each command is one `announce` + `write` + `read` sequence; the protocol
/// has no pipelining, so implementations may assume calls arrive strictly in
/// that order.
pub trait Transport {
    /// Control-type exchange announcing an upcoming write of `length` bytes.
    fn announce(&mut self, length: u32) -> Result<()>;

    /// Blocking bulk write of a complete request frame.
    fn write(&mut self, endpoint: u8, bytes: &[u8]) -> Result<()>;

    /// Blocking bulk read of a response frame.
    ///
    /// May return fewer bytes than `max_length`; returns an empty buffer when
    /// the device stays silent for the whole timeout.
    fn read(&mut self, endpoint: u8, max_length: usize, timeout: Duration) -> Result<Vec<u8>>;
}
