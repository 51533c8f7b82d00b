//! MC protocol (3E binary) response parsing.
//!
//! # Response Structure
//!
//! | Bytes | Field | Description |
//! |-------|-------|-------------|
//! | 2 | Subtitle | `0xD0, 0x00` echo |
//! | 5 | Access route | Echo of the request's route |
//! | 2 | Response data length | Covers end code + data |
//! | 2 | End code | `0x0000` = success |
//! | n | Data or error detail | See below |
//!
//! The first 11 bytes are always read as one unit. On success the payload
//! follows; its length is known from the request (word count × 2), never
//! taken from the wire. On failure exactly 2 error-detail bytes follow and
//! the call fails with [`McError::Protocol`].
//!
//! # Example
//!
//! ```
//! use melsec_mc::{read_payload, read_response_header};
//! use std::io::Cursor;
//!
//! let mut stream = Cursor::new(vec![
//!     0xD0, 0x00, 0x00, 0xFF, 0xFF, 0x03, 0x00, 0x06, 0x00, // header
//!     0x00, 0x00, // end code
//!     0x34, 0x12, 0x78, 0x56, // data
//! ]);
//!
//! read_response_header(&mut stream).unwrap();
//! assert_eq!(read_payload(&mut stream, 4).unwrap(), [0x34, 0x12, 0x78, 0x56]);
//! ```

use std::io::{ErrorKind, Read};

use tracing::{trace, warn};

use crate::end_code::{classify, END_CODE_OK};
use crate::error::{McError, Result};

/// Size of the fixed response header, end code included.
pub const RESPONSE_HEADER_SIZE: usize = 11;

/// Offset of the end code within the response header.
pub const END_CODE_OFFSET: usize = 9;

/// Size of the error detail that follows a non-zero end code.
pub const ERROR_DETAIL_SIZE: usize = 2;

/// Parsed fixed part of a successful response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    /// Subtitle echo.
    pub subtitle: [u8; 2],
    /// Access route echo.
    pub access_route: [u8; 5],
    /// Declared response data length.
    pub data_length: u16,
    /// End code (always `0x0000` for a header returned by
    /// [`read_response_header`]).
    pub end_code: u16,
}

impl ResponseHeader {
    /// Splits the raw 11 header bytes into fields.
    pub fn from_bytes(bytes: &[u8; RESPONSE_HEADER_SIZE]) -> Self {
        Self {
            subtitle: [bytes[0], bytes[1]],
            access_route: [bytes[2], bytes[3], bytes[4], bytes[5], bytes[6]],
            data_length: u16::from_le_bytes([bytes[7], bytes[8]]),
            end_code: u16::from_le_bytes([bytes[END_CODE_OFFSET], bytes[END_CODE_OFFSET + 1]]),
        }
    }
}

/// Fills `buf` completely from `reader`.
///
/// # Errors
///
/// Returns `McError::ShortRead` if the stream ends first, and `McError::Io`
/// for any other read failure.
pub(crate) fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut received = 0;
    while received < buf.len() {
        match reader.read(&mut buf[received..]) {
            Ok(0) => {
                return Err(McError::ShortRead {
                    expected: buf.len(),
                    received,
                })
            }
            Ok(n) => received += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(McError::Io(e)),
        }
    }
    Ok(())
}

/// Reads the 11-byte response header and checks the end code.
///
/// On a non-zero end code the 2 error-detail bytes are consumed as well, so
/// the stream stays aligned on the next frame.
///
/// # Errors
///
/// - `McError::Protocol` when the PLC reports an error.
/// - `McError::ShortRead` / `McError::Io` when the stream fails.
pub fn read_response_header<R: Read + ?Sized>(reader: &mut R) -> Result<ResponseHeader> {
    let mut buf = [0u8; RESPONSE_HEADER_SIZE];
    read_full(reader, &mut buf)?;
    trace!("response header: {:02X?}", buf);

    let header = ResponseHeader::from_bytes(&buf);
    if header.end_code == END_CODE_OK {
        return Ok(header);
    }

    let mut detail = [0u8; ERROR_DETAIL_SIZE];
    read_full(reader, &mut detail)?;

    let end = classify([buf[END_CODE_OFFSET], buf[END_CODE_OFFSET + 1]], detail);
    warn!(
        code = format_args!("0x{:04X}", end.code),
        kind = %end.kind,
        "PLC returned error end code"
    );

    Err(McError::Protocol {
        kind: end.kind,
        code: end.code,
        detail: end.detail,
    })
}

/// Reads exactly `expected_len` payload bytes.
///
/// # Errors
///
/// Returns `McError::ShortRead` if the stream ends first.
pub fn read_payload<R: Read + ?Sized>(reader: &mut R, expected_len: usize) -> Result<Vec<u8>> {
    let mut payload = vec![0u8; expected_len];
    read_full(reader, &mut payload)?;
    trace!("response payload: {:02X?}", payload);
    Ok(payload)
}
