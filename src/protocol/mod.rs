//! Wire-level frame building and response validation.
//!
//! # Frame layout
//!
//! A request frame is the raw opcode bytes followed by an opcode-specific
//! payload: no envelope, no checksum, no sequence number. Integrity relies
//! on the transport's own length-announcement handshake.
//!
//! A response frame is laid out as:
//!
//! ```text
//! offset 0-1   echo bytes, not interpreted
//! offset 2     channel marker, must be 0x33
//! offset 3     status byte (0x01 = success)
//! offset 4..   payload, opcode-defined
//! ```
//!
//! Validation happens exactly once, here: a response shorter than four bytes
//! or with a wrong channel marker is a [`Framing`](crate::DeviceError::Framing)
//! failure regardless of its other content. Status interpretation beyond the
//! success/alternate split is the dispatcher's job; payload interpretation is
//! the individual opcode handlers' job. Neither ever re-checks the marker.

pub mod opcodes;

use crate::{DeviceError, Result};

/// Channel marker every well-formed response carries at byte 2.
pub const CHANNEL_MARKER: u8 = 0x33;
/// Status byte indicating success; the payload follows at byte 4.
pub const STATUS_OK: u8 = 0x01;
/// Alternate status the device-info opcode reports while the device sits in
/// its bootloader. The response still carries usable strings; every other
/// opcode treats this value as a rejection.
pub const STATUS_BOOTLOADER_INFO: u8 = 0x27;
/// Number of leading bytes before the payload in a response frame.
pub const RESPONSE_HEADER_LEN: usize = 4;

/// A validated response frame, split into status and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status byte from offset 3.
    pub status: u8,
    /// Payload bytes from offset 4 onward (may be empty).
    pub payload: Vec<u8>,
}

impl Response {
    /// Returns true when the status byte signals unconditional success.
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// Build a request frame from opcode bytes and a payload.
pub fn build_request(opcode: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(opcode.len() + payload.len());
    frame.extend_from_slice(opcode);
    frame.extend_from_slice(payload);
    frame
}

/// Validate a raw response and split it into status and payload.
///
/// `context` names the operation for error messages; it is never sent to the
/// device.
pub fn parse_response(raw: &[u8], context: &'static str) -> Result<Response> {
    if raw.len() < RESPONSE_HEADER_LEN {
        return Err(DeviceError::framing(
            context,
            format!("response too short: {} bytes, need at least {}", raw.len(), RESPONSE_HEADER_LEN),
        ));
    }
    if raw[2] != CHANNEL_MARKER {
        return Err(DeviceError::framing(
            context,
            format!("bad channel marker: {:#04x}, expected {CHANNEL_MARKER:#04x}", raw[2]),
        ));
    }
    Ok(Response { status: raw[3], payload: raw[RESPONSE_HEADER_LEN..].to_vec() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn request_is_opcode_then_payload() {
        let frame = build_request(opcodes::FILE_WRITE, &[0x00, 0x00, 0x00, 0x02, 0xaa, 0xbb]);
        assert_eq!(frame, vec![0x77, 0x23, 0x00, 0x00, 0x00, 0x02, 0xaa, 0xbb]);
    }

    #[test]
    fn empty_payload_is_just_the_opcode() {
        assert_eq!(build_request(opcodes::FILE_READ, &[]), vec![0x77, 0x22]);
    }

    #[test]
    fn well_formed_response_splits_status_and_payload() {
        let resp = parse_response(&[0x00, 0x00, 0x33, 0x01, 0xde, 0xad], "test").unwrap();
        assert_eq!(resp.status, STATUS_OK);
        assert!(resp.is_ok());
        assert_eq!(resp.payload, vec![0xde, 0xad]);
    }

    #[test]
    fn four_byte_response_has_empty_payload() {
        let resp = parse_response(&[0xff, 0xff, 0x33, 0x27, ], "test").unwrap();
        assert_eq!(resp.status, STATUS_BOOTLOADER_INFO);
        assert!(!resp.is_ok());
        assert!(resp.payload.is_empty());
    }

    #[test]
    fn marker_mismatch_fails_even_with_ok_status() {
        let err = parse_response(&[0x00, 0x00, 0x34, 0x01, 0xde], "test").unwrap_err();
        assert!(matches!(err, DeviceError::Framing { .. }));
    }

    proptest! {
        #[test]
        fn short_responses_never_parse(raw in proptest::collection::vec(any::<u8>(), 0..4)) {
            // Anything under four bytes is a framing failure, whatever the bytes say.
            prop_assert!(parse_response(&raw, "prop").is_err());
        }

        #[test]
        fn parse_is_total_for_any_bytes(raw in proptest::collection::vec(any::<u8>(), 0..64)) {
            match parse_response(&raw, "prop") {
                Ok(resp) => {
                    prop_assert!(raw.len() >= 4);
                    prop_assert_eq!(raw[2], CHANNEL_MARKER);
                    prop_assert_eq!(resp.status, raw[3]);
                    prop_assert_eq!(resp.payload.as_slice(), &raw[4..]);
                }
                Err(DeviceError::Framing { .. }) => {
                    prop_assert!(raw.len() < 4 || raw[2] != CHANNEL_MARKER);
                }
                Err(other) => prop_assert!(false, "unexpected error class: {other}"),
            }
        }
    }
}
