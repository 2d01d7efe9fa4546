//! Chunked transfer of files in on-device storage.
//!
//! The device exposes a single implicit file slot driven by four commands:
//! open (with a read/write mode byte), read-chunk, write-chunk and close.
//! [`RemoteFile`] models that slot as an explicit state machine owned by the
//! caller, so out-of-order calls are rejected before they reach the wire
//! instead of relying on call-order discipline:
//!
//! ```text
//! Closed --open(Read)--> OpenRead --read_chunk*--> OpenRead --close--> Closed
//! Closed --open(Write)-> OpenWrite --write_chunk*-> OpenWrite --close--> Closed
//! ```
//!
//! Reads are length-prefixed; a zero-length chunk is the end-of-stream
//! sentinel and is never appended to output. Writes carry their own length
//! prefix and are committed device-side by the close. Whether the write path
//! also wants a zero-length terminator is an open hardware question, switched
//! by [`TransferOptions::write_eof_chunk`](crate::TransferOptions).
//!
//! The exclusive borrow of the session serializes the multi-call protocol;
//! two concurrent chunk operations on the same device cannot be expressed.

use tracing::{debug, warn};

use crate::protocol::opcodes;
use crate::session::{encode_name, DeviceSession};
use crate::transport::Transport;
use crate::types::OpenMode;
use crate::{DeviceError, Result};

/// Current state of a [`RemoteFile`] handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Closed,
    OpenRead,
    OpenWrite,
}

/// Handle to a file in on-device storage, open for reading or writing.
pub struct RemoteFile<'s, T: Transport> {
    session: &'s mut DeviceSession<T>,
    name: String,
    state: FileState,
}

impl<'s, T: Transport> RemoteFile<'s, T> {
    /// Open `name` on the device in the given mode.
    ///
    /// A device-side refusal (typically: no such file on read, storage full
    /// on write) surfaces as a [`Rejected`](DeviceError::Rejected) error
    /// carrying the status byte.
    pub fn open(
        session: &'s mut DeviceSession<T>,
        name: &str,
        mode: OpenMode,
    ) -> Result<Self> {
        let mut payload = vec![mode.as_byte()];
        payload.extend_from_slice(&encode_name(name)?);
        session.command("open file", opcodes::FILE_OPEN, &payload)?;
        debug!(name, ?mode, "file opened");
        Ok(RemoteFile {
            session,
            name: name.to_owned(),
            state: match mode {
                OpenMode::Read => FileState::OpenRead,
                OpenMode::Write => FileState::OpenWrite,
            },
        })
    }

    /// Name of the remote file.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current protocol state of this handle.
    pub fn state(&self) -> FileState {
        self.state
    }

    /// Read the next chunk; `None` signals end of stream.
    ///
    /// The sentinel's length prefix is consumed but never appended to output.
    /// A payload shorter than its own length prefix is fatal: the length
    /// prefixes are the only way to stay synchronized with the stream, so
    /// there is no partial-result recovery.
    pub fn read_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        self.require_state(FileState::OpenRead, "read file chunk")?;
        let payload = self.session.command("read file chunk", opcodes::FILE_READ, &[])?;
        if payload.len() < 4 {
            return Err(DeviceError::framing(
                "read file chunk",
                format!("missing length prefix: {} bytes", payload.len()),
            ));
        }
        let length =
            u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) as usize;
        if length == 0 {
            return Ok(None);
        }
        let body = &payload[4..];
        if body.len() < length {
            return Err(DeviceError::framing(
                "read file chunk",
                format!("short chunk: prefix says {length} bytes, payload has {}", body.len()),
            ));
        }
        if body.len() > length {
            warn!(
                declared = length,
                received = body.len(),
                "chunk carries trailing bytes past its length prefix"
            );
        }
        Ok(Some(body[..length].to_vec()))
    }

    /// Write one chunk. The chunk must fit the session's negotiated chunk
    /// size; larger slices are rejected before any I/O.
    pub fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        self.require_state(FileState::OpenWrite, "write file chunk")?;
        let max = self.session.chunk_size()?;
        if chunk.len() > max {
            return Err(DeviceError::validation(
                "chunk length",
                format!("{} bytes exceeds negotiated chunk size {max}", chunk.len()),
            ));
        }
        let mut payload = (chunk.len() as u32).to_be_bytes().to_vec();
        payload.extend_from_slice(chunk);
        self.session.command("write file chunk", opcodes::FILE_WRITE, &payload)?;
        Ok(())
    }

    /// Close the file. On a write handle this commits the written bytes
    /// device-side. Closing an already-closed handle is a validation error,
    /// not a device exchange.
    pub fn close(&mut self) -> Result<()> {
        if self.state == FileState::Closed {
            return Err(DeviceError::validation("file state", "file is not open"));
        }
        self.session.command("close file", opcodes::FILE_CLOSE, &[])?;
        self.state = FileState::Closed;
        debug!(name = %self.name, "file closed");
        Ok(())
    }

    fn require_state(&self, expected: FileState, operation: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(DeviceError::validation(
                "file state",
                format!("{operation} requires {expected:?}, handle is {:?}", self.state),
            ))
        }
    }
}

impl<T: Transport> Drop for RemoteFile<'_, T> {
    fn drop(&mut self) {
        if self.state != FileState::Closed {
            // No commands from drop: the session may be mid-error. The device
            // closes the slot on the next open.
            warn!(name = %self.name, "remote file dropped without close");
        }
    }
}

impl<T: Transport> DeviceSession<T> {
    /// Upload `data` as file `name`: open for write, send buffer-size-bounded
    /// chunks in order, close to commit.
    pub fn upload_file(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let chunk_size = self.chunk_size()?;
        let write_eof_chunk = self.transfer_options().write_eof_chunk;

        let mut file = RemoteFile::open(self, name, OpenMode::Write)?;
        for chunk in data.chunks(chunk_size) {
            file.write_chunk(chunk)?;
        }
        if write_eof_chunk {
            file.write_chunk(&[])?;
        }
        file.close()?;
        debug!(name, bytes = data.len(), "upload complete");
        Ok(())
    }

    /// Download file `name`: open for read, drain chunks until the
    /// zero-length sentinel, close.
    pub fn download_file(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut file = RemoteFile::open(self, name, OpenMode::Read)?;
        let mut data = Vec::new();
        while let Some(chunk) = file.read_chunk()? {
            data.extend_from_slice(&chunk);
        }
        file.close()?;
        debug!(name, bytes = data.len(), "download complete");
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::TransferOptions;
    use crate::transport::{Exchange, MockTransport};

    fn negotiate(buffer_size: u32) -> Exchange {
        Exchange::ok(&[0x78, 0x11], &buffer_size.to_be_bytes())
    }

    fn open_frame(mode: u8, name: &str) -> Vec<u8> {
        let mut frame = vec![0x77, 0x20, mode];
        frame.extend_from_slice(name.as_bytes());
        frame.push(0);
        frame
    }

    fn write_frame(chunk: &[u8]) -> Vec<u8> {
        let mut frame = vec![0x77, 0x23];
        frame.extend_from_slice(&(chunk.len() as u32).to_be_bytes());
        frame.extend_from_slice(chunk);
        frame
    }

    fn read_response(chunk: &[u8]) -> Vec<u8> {
        let mut payload = (chunk.len() as u32).to_be_bytes().to_vec();
        payload.extend_from_slice(chunk);
        payload
    }

    #[test]
    fn upload_splits_at_negotiated_chunk_size() {
        // 1024-byte buffer minus the 40-byte overhead: 984-byte chunks, so a
        // 2000-byte file goes out as 984 + 984 + 32, then one close.
        let data = vec![0xabu8; 2000];
        let transport = MockTransport::new(vec![
            negotiate(1024),
            Exchange::ok(&open_frame(2, "big.bin"), &[]),
            Exchange::ok(&write_frame(&data[..984]), &[]),
            Exchange::ok(&write_frame(&data[984..1968]), &[]),
            Exchange::ok(&write_frame(&data[1968..]), &[]),
            Exchange::ok(&[0x77, 0x21], &[]),
        ]);
        let mut session = DeviceSession::connect(transport).unwrap();
        session.upload_file("big.bin", &data).unwrap();
        let transport = session.disconnect().unwrap();
        assert!(transport.script_drained());
    }

    #[test]
    fn upload_does_not_send_zero_length_terminator_by_default() {
        let transport = MockTransport::new(vec![
            negotiate(1024),
            Exchange::ok(&open_frame(2, "f"), &[]),
            Exchange::ok(&write_frame(&[1, 2, 3]), &[]),
            Exchange::ok(&[0x77, 0x21], &[]),
        ]);
        let mut session = DeviceSession::connect(transport).unwrap();
        session.upload_file("f", &[1, 2, 3]).unwrap();
        assert!(session.disconnect().unwrap().script_drained());
    }

    #[test]
    fn upload_sends_terminator_when_configured() {
        let transport = MockTransport::new(vec![
            negotiate(1024),
            Exchange::ok(&open_frame(2, "f"), &[]),
            Exchange::ok(&write_frame(&[1, 2, 3]), &[]),
            Exchange::ok(&write_frame(&[]), &[]),
            Exchange::ok(&[0x77, 0x21], &[]),
        ]);
        let mut session = DeviceSession::connect_with_options(
            transport,
            TransferOptions { write_eof_chunk: true, ..Default::default() },
        )
        .unwrap();
        session.upload_file("f", &[1, 2, 3]).unwrap();
        assert!(session.disconnect().unwrap().script_drained());
    }

    #[test]
    fn download_stops_at_zero_length_sentinel() {
        let transport = MockTransport::new(vec![
            negotiate(1024),
            Exchange::ok(&open_frame(1, "cal.dat"), &[]),
            Exchange::ok(&[0x77, 0x22], &read_response(b"hello ")),
            Exchange::ok(&[0x77, 0x22], &read_response(b"world")),
            Exchange::ok(&[0x77, 0x22], &read_response(&[])),
            Exchange::ok(&[0x77, 0x21], &[]),
        ]);
        let mut session = DeviceSession::connect(transport).unwrap();
        let data = session.download_file("cal.dat").unwrap();
        assert_eq!(data, b"hello world");
        assert!(session.disconnect().unwrap().script_drained());
    }

    #[test]
    fn open_rejection_carries_the_status() {
        let transport = MockTransport::new(vec![
            negotiate(1024),
            Exchange::with_status(&open_frame(1, "missing"), 0x02, &[]),
        ]);
        let mut session = DeviceSession::connect(transport).unwrap();
        let err = session.download_file("missing").unwrap_err();
        assert!(matches!(err, DeviceError::Rejected { status: 0x02, .. }));
    }

    #[test]
    fn short_read_chunk_is_fatal() {
        // Prefix claims 16 bytes, payload carries 4: no way to resynchronize.
        let mut payload = 16u32.to_be_bytes().to_vec();
        payload.extend_from_slice(&[1, 2, 3, 4]);
        let transport = MockTransport::new(vec![
            negotiate(1024),
            Exchange::ok(&open_frame(1, "x"), &[]),
            Exchange::ok(&[0x77, 0x22], &payload),
        ]);
        let mut session = DeviceSession::connect(transport).unwrap();
        let err = session.download_file("x").unwrap_err();
        assert!(matches!(err, DeviceError::Framing { .. }));
    }

    #[test]
    fn reading_a_write_handle_is_rejected_before_io() {
        let transport = MockTransport::new(vec![
            negotiate(1024),
            Exchange::ok(&open_frame(2, "w"), &[]),
        ]);
        let mut session = DeviceSession::connect(transport).unwrap();
        let mut file = RemoteFile::open(&mut session, "w", OpenMode::Write).unwrap();
        let err = file.read_chunk().unwrap_err();
        assert!(matches!(err, DeviceError::Validation { .. }));
        drop(file);
        // Only negotiate + open went over the wire.
        assert_eq!(session.disconnect().unwrap().exchanges(), 2);
    }

    #[test]
    fn double_close_is_a_noop_failure() {
        let transport = MockTransport::new(vec![
            negotiate(1024),
            Exchange::ok(&open_frame(1, "r"), &[]),
            Exchange::ok(&[0x77, 0x21], &[]),
        ]);
        let mut session = DeviceSession::connect(transport).unwrap();
        let mut file = RemoteFile::open(&mut session, "r", OpenMode::Read).unwrap();
        file.close().unwrap();
        let err = file.close().unwrap_err();
        assert!(matches!(err, DeviceError::Validation { .. }));
    }

    #[test]
    fn oversized_write_chunk_is_rejected_before_io() {
        let transport = MockTransport::new(vec![
            negotiate(100),
            Exchange::ok(&open_frame(2, "w"), &[]),
        ]);
        let mut session = DeviceSession::connect(transport).unwrap();
        let mut file = RemoteFile::open(&mut session, "w", OpenMode::Write).unwrap();
        // chunk size is 100 - 40 = 60
        let err = file.write_chunk(&[0u8; 61]).unwrap_err();
        assert!(matches!(err, DeviceError::Validation { .. }));
        file.write_chunk(&[0u8; 60]).unwrap_err(); // script has no write step
    }
}
