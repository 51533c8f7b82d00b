//! Error types for the MC protocol client.

use std::io;
use thiserror::Error;

use crate::end_code::EndCodeKind;

/// Result type alias for MC protocol operations.
pub type Result<T> = std::result::Result<T, McError>;

/// Reasons a textual device address can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    /// No device kind in the table matches the leading letters.
    #[error("invalid device prefix in '{0}'")]
    InvalidPrefix(String),

    /// The suffix is empty, not a number in the kind's base, or too large.
    #[error("invalid device number in '{0}'")]
    InvalidNumber(String),
}

/// Errors that can occur during MC protocol communication.
#[derive(Debug, Error)]
pub enum McError {
    /// The PLC answered with a non-zero end code.
    #[error("PLC error: end code 0x{code:04X} ({kind}), detail {detail:02X?}")]
    Protocol {
        /// Classification of the end code.
        kind: EndCodeKind,
        /// Raw end code (little-endian on the wire).
        code: u16,
        /// The two error-detail bytes that follow the end code.
        detail: [u8; 2],
    },

    /// The stream ended before a complete frame part was received.
    #[error("short read: expected {expected} bytes, received {received}")]
    ShortRead {
        /// Number of bytes the frame part requires.
        expected: usize,
        /// Number of bytes received before the stream ended.
        received: usize,
    },

    /// A response payload does not match the width implied by the request.
    #[error("response length mismatch: expected {expected} bytes, received {received}")]
    ResponseLength {
        /// Payload width the request implies.
        expected: usize,
        /// Payload width the response declares or carries.
        received: usize,
    },

    /// Malformed device address text.
    #[error("invalid device address: {0}")]
    Address(#[from] AddressParseError),

    /// A staged write value is wider than the device.
    #[error("value too long: {len} bytes exceeds device width of {max} bytes")]
    ValueTooLong {
        /// Length of the rejected value.
        len: usize,
        /// Device width in bytes (`count * 2`).
        max: usize,
    },

    /// Invalid parameter provided.
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// Name of the invalid parameter.
        parameter: String,
        /// Description of why the parameter is invalid.
        reason: String,
    },

    /// Response payload content could not be interpreted.
    #[error("Invalid response: {reason}")]
    InvalidResponse {
        /// Description of the response error.
        reason: String,
    },

    /// I/O error during communication.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl McError {
    /// Creates a new `InvalidParameter` error.
    ///
    /// # Example
    ///
    /// ```
    /// use melsec_mc::McError;
    ///
    /// let err = McError::invalid_parameter("count", "must be greater than 0");
    /// ```
    pub fn invalid_parameter(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new `InvalidResponse` error.
    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            reason: reason.into(),
        }
    }

    /// Returns whether the connection must be assumed unusable after this error.
    ///
    /// Framing cannot be recovered once a frame was only partially consumed,
    /// so I/O failures, short reads and length mismatches are all fatal.
    /// PLC end codes and validation errors leave the connection in sync.
    ///
    /// # Example
    ///
    /// ```
    /// use melsec_mc::McError;
    ///
    /// let err = McError::ShortRead { expected: 11, received: 3 };
    /// assert!(err.is_fatal());
    /// assert!(!McError::invalid_parameter("count", "zero").is_fatal());
    /// ```
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            McError::Io(_) | McError::ShortRead { .. } | McError::ResponseLength { .. }
        )
    }

    /// Returns the end-code classification when this is a PLC error.
    pub fn end_code_kind(&self) -> Option<EndCodeKind> {
        match self {
            McError::Protocol { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
