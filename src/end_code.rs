//! Classification of MC protocol end codes.
//!
//! Every response carries a 2-byte end code right after the fixed header.
//! `0x0000` means success; any other value is looked up in a static table
//! and surfaced as [`McError::Protocol`](crate::McError::Protocol) together
//! with the raw code and the error-detail bytes that follow it.
//!
//! # Example
//!
//! ```
//! use melsec_mc::{classify, EndCodeKind};
//!
//! // 0xC05E arrives on the wire as [0x5E, 0xC0]
//! assert_eq!(classify([0x5E, 0xC0], [0x00, 0x00]).kind, EndCodeKind::Timeout);
//! assert_eq!(classify([0x31, 0x40], [0x00, 0x00]).kind, EndCodeKind::Unknown);
//! ```

use std::fmt;

/// End code reported for a successful request.
pub const END_CODE_OK: u16 = 0x0000;

/// Category of a non-zero end code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndCodeKind {
    /// CPU monitoring timer expired before the PLC CPU answered the module.
    Timeout,
    /// Requested number of points is outside the allowed range.
    PointCountOutOfRange,
    /// Start device plus point count runs past the end of the device range.
    AddressOutOfRange,
    /// Command or subcommand is not supported by the target.
    UnsupportedCommand,
    /// Any code not present in the table.
    Unknown,
}

/// A classified end code with the raw bytes kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndCode {
    /// Category looked up from the table.
    pub kind: EndCodeKind,
    /// Raw end code, decoded little-endian.
    pub code: u16,
    /// Error detail bytes following the end code.
    pub detail: [u8; 2],
}

// (first code, last code, kind), inclusive ranges
const END_CODE_TABLE: &[(u16, u16, EndCodeKind)] = &[
    (0xC05E, 0xC05E, EndCodeKind::Timeout),
    (0xC051, 0xC054, EndCodeKind::PointCountOutOfRange),
    (0xC056, 0xC056, EndCodeKind::AddressOutOfRange),
    (0xC059, 0xC059, EndCodeKind::UnsupportedCommand),
];

/// Classifies the 2 end-code bytes and 2 detail bytes of a failed response.
pub fn classify(code: [u8; 2], detail: [u8; 2]) -> EndCode {
    let code = u16::from_le_bytes(code);
    let kind = END_CODE_TABLE
        .iter()
        .find(|(first, last, _)| (*first..=*last).contains(&code))
        .map_or(EndCodeKind::Unknown, |(_, _, kind)| *kind);

    EndCode { kind, code, detail }
}

/// Returns a human-readable description of an end-code category.
///
/// # Example
///
/// ```
/// use melsec_mc::{end_code_description, EndCodeKind};
///
/// assert_eq!(end_code_description(EndCodeKind::Timeout), "CPU monitoring timer expired");
/// ```
pub fn end_code_description(kind: EndCodeKind) -> &'static str {
    match kind {
        EndCodeKind::Timeout => "CPU monitoring timer expired",
        EndCodeKind::PointCountOutOfRange => "number of points out of range",
        EndCodeKind::AddressOutOfRange => "device range exceeded",
        EndCodeKind::UnsupportedCommand => "command not supported",
        EndCodeKind::Unknown => "unknown error",
    }
}

impl fmt::Display for EndCodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(end_code_description(*self))
    }
}
