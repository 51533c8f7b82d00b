//! In-memory stream for unit tests.

use std::io::{self, Cursor, Read, Write};

/// Replays scripted response bytes and records everything written.
#[derive(Debug, Default)]
pub(crate) struct ScriptedStream {
    input: Cursor<Vec<u8>>,
    output: Vec<u8>,
}

impl ScriptedStream {
    pub(crate) fn new(input: Vec<u8>) -> Self {
        Self {
            input: Cursor::new(input),
            output: Vec::new(),
        }
    }

    /// Builds a stream that answers several requests in order.
    pub(crate) fn with_responses(responses: &[Vec<u8>]) -> Self {
        Self::new(responses.concat())
    }

    pub(crate) fn written(&self) -> &[u8] {
        &self.output
    }

    pub(crate) fn fully_consumed(&self) -> bool {
        self.input.position() as usize == self.input.get_ref().len()
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Successful response carrying `payload`.
pub(crate) fn ok_response(payload: &[u8]) -> Vec<u8> {
    let length = (2 + payload.len()) as u16;
    let mut bytes = vec![0xD0, 0x00, 0x00, 0xFF, 0xFF, 0x03, 0x00];
    bytes.extend_from_slice(&length.to_le_bytes());
    bytes.extend_from_slice(&[0x00, 0x00]);
    bytes.extend_from_slice(payload);
    bytes
}

/// Error response with the given end code and detail bytes.
pub(crate) fn error_response(end_code: [u8; 2], detail: [u8; 2]) -> Vec<u8> {
    let mut bytes = vec![0xD0, 0x00, 0x00, 0xFF, 0xFF, 0x03, 0x00, 0x04, 0x00];
    bytes.extend_from_slice(&end_code);
    bytes.extend_from_slice(&detail);
    bytes
}
