//! Error types for the RM200 protocol driver.
//!
//! All fallible operations in this crate return [`DeviceError`] through the
//! crate-wide [`Result`] alias. Variants are structured so callers can tell
//! apart the four failure classes the protocol distinguishes:
//!
//! - **NotConnected**: an operation was attempted without an active session
//! - **Framing**: the response failed wire-level validation (too short, or
//!   the channel marker at byte 2 was not `0x33`)
//! - **Rejected**: a well-formed response carried a non-success status
//! - **Validation**: a caller-supplied value was out of range and was
//!   rejected before any transport I/O happened
//!
//! Transport failures are propagated, never retried: the device exposes a
//! single command/response channel and a failed exchange leaves it in an
//! unknown state that only the caller can decide how to handle.

use thiserror::Error;

/// Result type alias for device operations.
pub type Result<T, E = DeviceError> = std::result::Result<T, E>;

/// Main error type for RM200 protocol operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DeviceError {
    /// Operation attempted without an active device session.
    #[error("not connected: {operation} requires an active session")]
    NotConnected { operation: &'static str },

    /// Response failed wire-level validation.
    #[error("framing error in {context}: {details}")]
    Framing { context: &'static str, details: String },

    /// Well-formed response with a non-success status byte.
    #[error("device rejected {operation} with status {status:#04x}")]
    Rejected { operation: &'static str, status: u8 },

    /// Caller-supplied value rejected before any transport I/O.
    #[error("invalid {field}: {details}")]
    Validation { field: &'static str, details: String },

    /// I/O failure reported by the underlying transport.
    #[error("transport error during {operation}")]
    Transport {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Bulk read returned no data within the transport timeout.
    #[error("device did not answer {operation} within {timeout_ms} ms")]
    Timeout { operation: &'static str, timeout_ms: u64 },

    /// Scripted transport ran out of exchanges (mock transport only).
    #[error("mock transport script exhausted at exchange {exchange}")]
    ScriptExhausted { exchange: usize },

    /// USB stack failure.
    #[error("USB error during {operation}")]
    #[cfg(feature = "usb")]
    Usb {
        operation: &'static str,
        #[source]
        source: rusb::Error,
    },
}

impl DeviceError {
    /// Helper constructor for framing errors.
    pub fn framing(context: &'static str, details: impl Into<String>) -> Self {
        DeviceError::Framing { context, details: details.into() }
    }

    /// Helper constructor for validation errors.
    pub fn validation(field: &'static str, details: impl Into<String>) -> Self {
        DeviceError::Validation { field, details: details.into() }
    }

    /// Helper constructor for transport I/O errors.
    pub fn transport(operation: &'static str, source: std::io::Error) -> Self {
        DeviceError::Transport { operation, source }
    }

    /// Helper constructor for USB stack errors.
    #[cfg(feature = "usb")]
    pub fn usb(operation: &'static str, source: rusb::Error) -> Self {
        DeviceError::Usb { operation, source }
    }

    /// Returns true when the failure was a device-side rejection rather
    /// than a wire or caller problem. Expected negative outcomes such as
    /// "file not found" land here.
    pub fn is_rejection(&self) -> bool {
        matches!(self, DeviceError::Rejected { .. })
    }
}
