//! Device session and command dispatcher.
//!
//! A [`DeviceSession`] is the single entry point for talking to one device:
//! it owns the transport, the negotiated buffer size, the wire-trace flag and
//! the transfer tuning, so two sessions to two devices never share state.
//!
//! Every command is exactly one transport round-trip: announce the outgoing
//! length, bulk-write the frame, bulk-read the response bounded by the
//! negotiated buffer size, validate, interpret the status. There is no retry,
//! no pipelining and no cancellation beyond the read timeout.
//!
//! The buffer-size negotiation (`78 11`) is special: its success re-establishes
//! the session's buffer size as a side effect, and [`DeviceSession::connect`]
//! performs it before returning, so a session that exists always has a fresh
//! value. File-transfer and flash chunk sizes are derived from it minus the
//! configurable protocol overhead (see [`TransferOptions`]).

use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::protocol::{self, opcodes, Response, STATUS_BOOTLOADER_INFO, STATUS_OK};
use crate::records::color::{decode_color_records, decode_deck_records, ColorRecord, DeckRecord};
use crate::transport::{Transport, ENDPOINT_IN, ENDPOINT_OUT};
use crate::types::{Aperture, DeviceMode};
use crate::{DeviceError, Result};

/// Buffer size assumed until the device has answered the negotiation query.
/// Only ever used for that first exchange.
pub const INITIAL_BUFFER_SIZE: usize = 140;

/// Fixed per-chunk protocol overhead subtracted from the negotiated buffer
/// size when sizing file and flash chunks. The value is not consistent across
/// protocol revisions, so it is a tunable on [`TransferOptions`] rather than
/// a literal at the use sites.
pub const DEFAULT_CHUNK_OVERHEAD: usize = 40;

/// Default bulk-read timeout per command.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(1000);

/// Tuning knobs for the chunked transfer protocols.
#[derive(Debug, Clone, Copy)]
pub struct TransferOptions {
    /// Bytes subtracted from the negotiated buffer size to get the maximum
    /// chunk payload.
    pub chunk_overhead: usize,
    /// Send an explicit zero-length write chunk before closing an uploaded
    /// file. Whether the firmware needs this terminator (mirroring the
    /// zero-length read sentinel) is unresolved against real hardware, so it
    /// stays switchable; observed behavior works without it.
    pub write_eof_chunk: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        TransferOptions { chunk_overhead: DEFAULT_CHUNK_OVERHEAD, write_eof_chunk: false }
    }
}

/// An active session with one device.
#[derive(Debug)]
pub struct DeviceSession<T: Transport> {
    transport: Option<T>,
    buffer_size: usize,
    read_timeout: Duration,
    trace_wire: bool,
    transfer: TransferOptions,
}

impl<T: Transport> DeviceSession<T> {
    /// Claim `transport` and negotiate the communication buffer size.
    pub fn connect(transport: T) -> Result<Self> {
        Self::connect_with_options(transport, TransferOptions::default())
    }

    /// [`connect`](Self::connect) with explicit transfer tuning.
    pub fn connect_with_options(transport: T, transfer: TransferOptions) -> Result<Self> {
        let mut session = DeviceSession {
            transport: Some(transport),
            buffer_size: INITIAL_BUFFER_SIZE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            trace_wire: false,
            transfer,
        };
        let negotiated = session.negotiate_buffer_size()?;
        info!(buffer_size = negotiated, "session established");
        Ok(session)
    }

    /// Release the transport. Any further command on this session fails with
    /// `NotConnected`.
    pub fn disconnect(&mut self) -> Option<T> {
        if self.transport.is_some() {
            info!("session closed");
        }
        self.transport.take()
    }

    /// Negotiated communication buffer size; all reads are bounded by it.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Maximum chunk payload for file and flash transfers.
    ///
    /// Fails when the configured overhead does not leave room for a single
    /// payload byte, which would otherwise loop forever writing empty chunks.
    pub fn chunk_size(&self) -> Result<usize> {
        match self.buffer_size.checked_sub(self.transfer.chunk_overhead) {
            Some(size) if size > 0 => Ok(size),
            _ => Err(DeviceError::validation(
                "chunk overhead",
                format!(
                    "overhead {} leaves no payload room in buffer of {}",
                    self.transfer.chunk_overhead, self.buffer_size
                ),
            )),
        }
    }

    /// Transfer tuning in effect for this session.
    pub fn transfer_options(&self) -> TransferOptions {
        self.transfer
    }

    pub fn set_transfer_options(&mut self, transfer: TransferOptions) {
        self.transfer = transfer;
    }

    /// Enable or disable trace-level hex dumps of every frame.
    pub fn set_wire_trace(&mut self, enabled: bool) {
        self.trace_wire = enabled;
    }

    pub fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }

    // ------------------------------------------------------------------
    // Dispatcher
    // ------------------------------------------------------------------

    fn transport_mut(&mut self, operation: &'static str) -> Result<&mut T> {
        self.transport.as_mut().ok_or(DeviceError::NotConnected { operation })
    }

    /// One announce/write/read round-trip, returning the validated response.
    fn round_trip(
        &mut self,
        operation: &'static str,
        opcode: &[u8],
        payload: &[u8],
    ) -> Result<Response> {
        let request = protocol::build_request(opcode, payload);
        let max_read = self.buffer_size;
        let timeout = self.read_timeout;
        let trace_wire = self.trace_wire;

        let transport = self.transport_mut(operation)?;
        transport.announce(request.len() as u32)?;
        if trace_wire {
            trace!(operation, "frame out: {request:02x?}");
        }
        transport.write(ENDPOINT_OUT, &request)?;

        let raw = transport.read(ENDPOINT_IN, max_read, timeout)?;
        if trace_wire {
            trace!(operation, "frame in: {raw:02x?}");
        }
        if raw.is_empty() {
            return Err(DeviceError::Timeout {
                operation,
                timeout_ms: timeout.as_millis() as u64,
            });
        }

        let response = protocol::parse_response(&raw, operation)?;
        debug!(operation, status = response.status, payload_len = response.payload.len());
        Ok(response)
    }

    /// Send a command, expecting status `0x01`; returns the payload.
    pub fn command(
        &mut self,
        operation: &'static str,
        opcode: &[u8],
        payload: &[u8],
    ) -> Result<Vec<u8>> {
        self.command_accepting(operation, opcode, payload, &[])
    }

    /// Send a command, accepting `0x01` plus the listed alternate statuses.
    fn command_accepting(
        &mut self,
        operation: &'static str,
        opcode: &[u8],
        payload: &[u8],
        alternates: &[u8],
    ) -> Result<Vec<u8>> {
        let response = self.round_trip(operation, opcode, payload)?;
        if response.status == STATUS_OK || alternates.contains(&response.status) {
            Ok(response.payload)
        } else {
            Err(DeviceError::Rejected { operation, status: response.status })
        }
    }

    /// Send a command whose outcome is a yes/no answer. A well-formed
    /// response with any non-success status maps to `false`; the payload is
    /// never surfaced.
    pub fn command_bool(
        &mut self,
        operation: &'static str,
        opcode: &[u8],
        payload: &[u8],
    ) -> Result<bool> {
        let response = self.round_trip(operation, opcode, payload)?;
        Ok(response.status == STATUS_OK)
    }

    // ------------------------------------------------------------------
    // Device identity and status
    // ------------------------------------------------------------------

    /// Query the device's communication buffer size and store it on the
    /// session. Called automatically by [`connect`](Self::connect); call it
    /// again after firmware/bootloader transitions that may renegotiate.
    pub fn negotiate_buffer_size(&mut self) -> Result<u32> {
        let payload =
            self.command("negotiate buffer size", opcodes::GET_BUFFER_SIZE, &[])?;
        let size = u32::from_be_bytes(payload.as_slice().try_into().map_err(|_| {
            DeviceError::framing(
                "negotiate buffer size",
                format!("expected 4-byte size, got {} bytes", payload.len()),
            )
        })?);
        self.buffer_size = size as usize;
        debug!(buffer_size = size, "buffer size negotiated");
        Ok(size)
    }

    /// Device information strings (serial number first).
    ///
    /// Also answered while the device sits in its bootloader, where the
    /// firmware reports the alternate status `0x27` but still sends the
    /// strings; this is the only opcode with such an alternate.
    pub fn device_info(&mut self) -> Result<Vec<String>> {
        let payload = self.command_accepting(
            "device info",
            opcodes::GET_DEVICE_INFO,
            &[],
            &[STATUS_BOOTLOADER_INFO],
        )?;
        decode_string_list(&payload, "device info")
    }

    /// Device serial number (first device-info string).
    pub fn serial_number(&mut self) -> Result<String> {
        let info = self.device_info()?;
        info.into_iter().next().ok_or_else(|| {
            DeviceError::framing("device info", "empty string list, no serial number")
        })
    }

    /// Bootloader version string, e.g. `"2.41   Bootloader"`.
    pub fn bootloader_version(&mut self) -> Result<String> {
        let payload =
            self.command("bootloader version", opcodes::GET_BOOTLOADER_VERSION, &[])?;
        decode_cstr(&payload, "bootloader version")
    }

    /// Firmware version string, e.g. `"2.16   RM200"`.
    pub fn firmware_version(&mut self) -> Result<String> {
        let payload =
            self.command("firmware version", opcodes::GET_FIRMWARE_VERSION, &[])?;
        decode_cstr(&payload, "firmware version")
    }

    /// Chip identifier rendered as a `0x`-prefixed hex string.
    pub fn chip_id(&mut self) -> Result<String> {
        let payload = self.command("chip id", opcodes::GET_CHIP_ID, &[])?;
        let mut id = String::with_capacity(2 + payload.len() * 2);
        id.push_str("0x");
        for byte in &payload {
            id.push_str(&format!("{byte:02x}"));
        }
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Modes and measurement
    // ------------------------------------------------------------------

    /// Current device mode.
    pub fn device_mode(&mut self) -> Result<DeviceMode> {
        let payload = self.command("get device mode", opcodes::GET_DEVICE_MODE, &[])?;
        match payload.as_slice() {
            [byte] => DeviceMode::from_byte(*byte),
            other => Err(DeviceError::framing(
                "get device mode",
                format!("expected 1-byte mode, got {} bytes", other.len()),
            )),
        }
    }

    /// Switch the device mode. Out-of-range modes are unrepresentable; decode
    /// raw bytes through [`DeviceMode::from_byte`] before calling.
    pub fn set_device_mode(&mut self, mode: DeviceMode) -> Result<bool> {
        self.command_bool("set device mode", opcodes::SET_DEVICE_MODE, &[mode.as_byte()])
    }

    /// Current measurement aperture.
    pub fn aperture(&mut self) -> Result<Aperture> {
        let payload = self.command("get aperture", opcodes::APERTURE, &[])?;
        match payload.as_slice() {
            [byte] => Aperture::from_byte(*byte),
            other => Err(DeviceError::framing(
                "get aperture",
                format!("expected 1-byte aperture, got {} bytes", other.len()),
            )),
        }
    }

    /// Select the measurement aperture.
    pub fn set_aperture(&mut self, aperture: Aperture) -> Result<bool> {
        self.command_bool("set aperture", opcodes::APERTURE, &[aperture.as_byte()])
    }

    /// Trigger a measurement with the given aperture.
    pub fn trigger_measurement(&mut self, aperture: Aperture) -> Result<bool> {
        self.command_bool(
            "trigger measurement",
            opcodes::TRIGGER_MEASUREMENT,
            &[aperture.as_byte()],
        )
    }

    /// Reboot the device. The session's buffer size is stale afterwards;
    /// reconnect or renegotiate before transferring data.
    pub fn reboot(&mut self) -> Result<bool> {
        self.command_bool("reboot", opcodes::REBOOT, &[])
    }

    /// Switch into the bootloader. Requires the fixed firmware key; the
    /// device re-enumerates afterwards.
    pub fn enter_bootloader(&mut self) -> Result<bool> {
        self.command_bool("enter bootloader", opcodes::ENTER_BOOTLOADER, opcodes::ENTER_BOOTLOADER_KEY)
    }

    // ------------------------------------------------------------------
    // Storage directory
    // ------------------------------------------------------------------

    /// List files in on-device storage.
    pub fn list_files(&mut self) -> Result<Vec<String>> {
        let payload = self.command("directory listing", opcodes::FILE_DIR, &[])?;
        decode_string_list(&payload, "directory listing")
    }

    /// Delete a file from on-device storage. `Ok(false)` when the device
    /// refuses (typically: no such file).
    pub fn delete_file(&mut self, name: &str) -> Result<bool> {
        let payload = encode_name(name)?;
        self.command_bool("delete file", opcodes::FILE_DELETE, &payload)
    }

    // ------------------------------------------------------------------
    // Device-resident records
    // ------------------------------------------------------------------

    /// Scanned/saved color sample records.
    pub fn scanned_colors(&mut self) -> Result<Vec<ColorRecord>> {
        let payload = self.command("scanned colors", opcodes::GET_SCANNED_COLORS, &[])?;
        decode_color_records(&payload)
    }

    /// Installed color-deck listing.
    pub fn color_decks(&mut self) -> Result<Vec<DeckRecord>> {
        let payload = self.command("color decks", opcodes::GET_COLOR_DECKS, &[])?;
        decode_deck_records(&payload)
    }
}

/// Encode a file name as bytes + NUL, rejecting embedded NULs.
pub(crate) fn encode_name(name: &str) -> Result<Vec<u8>> {
    if name.as_bytes().contains(&0) {
        return Err(DeviceError::validation("file name", "embedded NUL byte"));
    }
    let mut bytes = Vec::with_capacity(name.len() + 1);
    bytes.extend_from_slice(name.as_bytes());
    bytes.push(0);
    Ok(bytes)
}

/// Decode a NUL-terminated 8-bit string payload.
fn decode_cstr(payload: &[u8], context: &'static str) -> Result<String> {
    let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
    String::from_utf8(payload[..end].to_vec())
        .map_err(|e| DeviceError::framing(context, format!("invalid UTF-8 text: {e}")))
}

/// Decode a count-prefixed, NUL-separated string list payload.
///
/// The device terminates the final string with a NUL as well; exactly one
/// trailing NUL is stripped before splitting, so `"A\0B\0C\0"` decodes to
/// `["A", "B", "C"]` with no phantom empty element.
fn decode_string_list(payload: &[u8], context: &'static str) -> Result<Vec<String>> {
    if payload.len() < 4 {
        return Err(DeviceError::framing(
            context,
            format!("expected 4-byte count prefix, got {} bytes", payload.len()),
        ));
    }
    let declared = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
    let mut body = &payload[4..];
    if body.last() == Some(&0) {
        body = &body[..body.len() - 1];
    }

    let strings: Vec<String> = if body.is_empty() {
        Vec::new()
    } else {
        body.split(|&b| b == 0)
            .map(|part| {
                String::from_utf8(part.to_vec())
                    .map_err(|e| DeviceError::framing(context, format!("invalid UTF-8 text: {e}")))
            })
            .collect::<Result<_>>()?
    };

    if declared as usize != strings.len() {
        warn!(context, declared, actual = strings.len(), "string count mismatch");
    }
    Ok(strings)
}
