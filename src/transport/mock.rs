//! Scripted transport for tests and offline development.
//!
//! A [`MockTransport`] plays back a fixed script of request/response
//! exchanges. Every written frame is checked against the script in order, so
//! a test fails loudly the moment the engine sends something unexpected, and
//! the full exchange log stays available for assertions afterwards.

use std::time::Duration;

use crate::transport::Transport;
use crate::{DeviceError, Result};

/// One scripted request/response pair.
#[derive(Debug, Clone)]
pub struct Exchange {
    /// Frame the engine is expected to write.
    pub expect: Vec<u8>,
    /// Raw response bytes handed back on the following read.
    pub respond: Vec<u8>,
}

impl Exchange {
    /// Expect `request` and answer with a well-formed success response
    /// carrying `payload`.
    pub fn ok(request: &[u8], payload: &[u8]) -> Self {
        Self::with_status(request, 0x01, payload)
    }

    /// Expect `request` and answer with a well-formed response carrying an
    /// arbitrary status byte.
    pub fn with_status(request: &[u8], status: u8, payload: &[u8]) -> Self {
        let mut respond = vec![0x00, 0x00, 0x33, status];
        respond.extend_from_slice(payload);
        Exchange { expect: request.to_vec(), respond }
    }

    /// Expect `request` and answer with raw bytes, bypassing response
    /// framing entirely. Used to script malformed responses.
    pub fn raw(request: &[u8], respond: &[u8]) -> Self {
        Exchange { expect: request.to_vec(), respond: respond.to_vec() }
    }
}

/// Transport that replays a fixed script of exchanges.
#[derive(Debug, Default)]
pub struct MockTransport {
    script: Vec<Exchange>,
    cursor: usize,
    pending_response: Option<Vec<u8>>,
    announced: Vec<u32>,
    written: Vec<Vec<u8>>,
}

impl MockTransport {
    pub fn new(script: Vec<Exchange>) -> Self {
        MockTransport { script, ..Default::default() }
    }

    /// All lengths announced over the control channel, in order.
    pub fn announced(&self) -> &[u32] {
        &self.announced
    }

    /// All frames written so far, in order.
    pub fn written(&self) -> &[Vec<u8>] {
        &self.written
    }

    /// Number of completed write/read exchanges.
    pub fn exchanges(&self) -> usize {
        self.cursor
    }

    /// True once every scripted exchange has been consumed.
    pub fn script_drained(&self) -> bool {
        self.cursor == self.script.len() && self.pending_response.is_none()
    }
}

impl Transport for MockTransport {
    fn announce(&mut self, length: u32) -> Result<()> {
        self.announced.push(length);
        Ok(())
    }

    fn write(&mut self, _endpoint: u8, bytes: &[u8]) -> Result<()> {
        let step = self.script.get(self.cursor).ok_or(DeviceError::ScriptExhausted {
            exchange: self.cursor,
        })?;
        if step.expect != bytes {
            return Err(DeviceError::framing(
                "mock transport",
                format!(
                    "exchange {}: expected frame {:02x?}, engine wrote {:02x?}",
                    self.cursor, step.expect, bytes
                ),
            ));
        }
        self.pending_response = Some(step.respond.clone());
        self.written.push(bytes.to_vec());
        self.cursor += 1;
        Ok(())
    }

    fn read(&mut self, _endpoint: u8, max_length: usize, _timeout: Duration) -> Result<Vec<u8>> {
        let mut response = self
            .pending_response
            .take()
            .ok_or(DeviceError::ScriptExhausted { exchange: self.cursor })?;
        response.truncate(max_length);
        Ok(response)
    }
}
