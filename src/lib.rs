//! Type-safe Rust protocol driver for the RM200 handheld color-measurement
//! device.
//!
//! The RM200 speaks a fixed opcode catalog over a USB bulk/control transport.
//! This crate turns those opcodes into correctly framed requests, validates
//! and decodes the responses, and layers three higher-level protocols on top:
//!
//! - **Chunked file transfer**: read and write files in on-device storage
//! - **Flash updates**: stage and commit firmware, calibration, bitmap and
//!   bootloader images through the bootloader
//! - **Record codecs**: decode color samples and deck listings, and
//!   round-trip the on-device asset catalog (`Versions.dat`)
//!
//! # Architecture
//!
//! Everything runs through a [`DeviceSession`], which owns a [`Transport`]
//! plus the per-session protocol state (negotiated buffer size, wire-trace
//! flag, transfer tuning). The transport is the only seam to the outside
//! world: the bundled [`MockTransport`] replays scripted exchanges for tests,
//! and the `usb` feature adds a `rusb`-backed transport for the physical
//! device.
//!
//! The protocol is strictly synchronous: one blocking round-trip per command,
//! no retries, no pipelining. Multi-call sequences (file transfer, flash
//! staging) are serialized by the session's exclusive borrows.
//!
//! # Example
//!
//! ```rust
//! use rm200::{DeviceSession, MockTransport, Exchange};
//!
//! fn main() -> rm200::Result<()> {
//!     // A scripted device: answers the buffer-size negotiation, then the
//!     // firmware-version query.
//!     let transport = MockTransport::new(vec![
//!         Exchange::ok(&[0x78, 0x11], &1024u32.to_be_bytes()),
//!         Exchange::ok(&[0x77, 0x01], b"2.16   RM200\0"),
//!     ]);
//!
//!     let mut session = DeviceSession::connect(transport)?;
//!     assert_eq!(session.firmware_version()?, "2.16   RM200");
//!     Ok(())
//! }
//! ```

pub mod bootloader;
mod error;
pub mod protocol;
pub mod records;
mod session;
pub mod transfer;
pub mod transport;
pub mod types;

// Core exports
pub use error::{DeviceError, Result};
pub use session::{
    DeviceSession, TransferOptions, DEFAULT_CHUNK_OVERHEAD, DEFAULT_READ_TIMEOUT,
    INITIAL_BUFFER_SIZE,
};
pub use types::{Aperture, DeviceMode, OpenMode};

// Layered protocol exports
pub use bootloader::{FlashTarget, FlashUpdater};
pub use transfer::{FileState, RemoteFile};

// Record codec exports
pub use records::catalog::{decode_catalog, encode_catalog, AssetType, CatalogEntry};
pub use records::color::{ColorRecord, DeckRecord, Timestamp};

// Transport exports
pub use transport::{Exchange, MockTransport, Transport, ENDPOINT_IN, ENDPOINT_OUT};
#[cfg(feature = "usb")]
pub use transport::UsbTransport;
