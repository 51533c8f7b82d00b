//! Textual device addresses.
//!
//! A device address such as `D100`, `X1A0` or `SB2` is a device-kind prefix
//! followed by a device number. The prefix is matched against the static
//! [`DEVICE_TABLE`](crate::device_code::DEVICE_TABLE), longest prefix first,
//! and the number is parsed in the kind's own base.
//!
//! # Example
//!
//! ```
//! use melsec_mc::{AddressWidth, DeviceAddress, DeviceKind};
//!
//! let addr: DeviceAddress = "x1a0".parse().unwrap();
//! assert_eq!(addr.kind(), DeviceKind::X);
//! assert_eq!(addr.offset(), 0x1A0);
//!
//! let bytes = addr.encode(AddressWidth::Q).unwrap();
//! assert_eq!(bytes, [0xA0, 0x01, 0x00, 0x9C]);
//! ```

use std::fmt;
use std::str::FromStr;

use crate::device_code::{lookup_prefix, DeviceKind, NumericBase, Unit, MAX_PREFIX_LEN};
use crate::error::{AddressParseError, McError, Result};

/// Largest device number encodable in the 3-byte (Q series) layout.
pub const MAX_Q_OFFSET: u32 = 0x00FF_FFFF;

/// Layout of the device field in request payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressWidth {
    /// Q/L series: 3-byte device number, 1-byte device code, subcommand `0x0000`.
    #[default]
    Q,
    /// iQ-R series: 4-byte device number, 2-byte device code, subcommand `0x0002`.
    IqR,
}

impl AddressWidth {
    /// Returns the encoded size of one device field.
    pub fn encoded_len(self) -> usize {
        match self {
            AddressWidth::Q => 4,
            AddressWidth::IqR => 6,
        }
    }

    /// Returns the subcommand used for word access in this layout.
    pub fn word_subcommand(self) -> u16 {
        match self {
            AddressWidth::Q => 0x0000,
            AddressWidth::IqR => 0x0002,
        }
    }
}

/// A parsed device address: device kind plus device number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceAddress {
    kind: DeviceKind,
    offset: u32,
}

impl DeviceAddress {
    /// Creates an address from its parts.
    pub fn new(kind: DeviceKind, offset: u32) -> Self {
        Self { kind, offset }
    }

    /// Parses a textual address, case-insensitively.
    ///
    /// Surrounding whitespace is not stripped and makes the address invalid.
    ///
    /// # Errors
    ///
    /// - [`AddressParseError::InvalidPrefix`] if no device kind matches.
    /// - [`AddressParseError::InvalidNumber`] if the number is missing, not
    ///   valid in the kind's base, or does not fit in 32 bits.
    ///
    /// # Example
    ///
    /// ```
    /// use melsec_mc::{AddressParseError, DeviceAddress, DeviceKind};
    ///
    /// let addr = DeviceAddress::parse("D12000").unwrap();
    /// assert_eq!((addr.kind(), addr.offset()), (DeviceKind::D, 12000));
    ///
    /// assert!(matches!(
    ///     DeviceAddress::parse("K01"),
    ///     Err(AddressParseError::InvalidPrefix(_))
    /// ));
    /// ```
    pub fn parse(text: &str) -> std::result::Result<Self, AddressParseError> {
        let upper = text.to_ascii_uppercase();

        // prefix candidates stop at the first digit
        let letters = upper
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(upper.len())
            .min(MAX_PREFIX_LEN);

        for len in (1..=letters).rev() {
            let Some(prefix) = upper.get(..len) else {
                continue;
            };
            if let Some(spec) = lookup_prefix(prefix) {
                let number = &upper[len..];
                let offset = u32::from_str_radix(number, spec.base.radix())
                    .ok()
                    .filter(|_| number.chars().all(|c| c.is_ascii_alphanumeric()))
                    .ok_or_else(|| AddressParseError::InvalidNumber(text.to_string()))?;
                return Ok(Self::new(spec.kind, offset));
            }
        }

        Err(AddressParseError::InvalidPrefix(text.to_string()))
    }

    /// Returns the device kind.
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Returns the device number.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Returns the numbering base of the device number.
    pub fn base(&self) -> NumericBase {
        self.kind.base()
    }

    /// Returns whether the device is a bit or word device.
    pub fn unit(&self) -> Unit {
        self.kind.unit()
    }

    /// Encodes the device field: little-endian device number, then device code.
    ///
    /// # Errors
    ///
    /// Returns `McError::InvalidParameter` if the device number does not fit
    /// in 3 bytes under [`AddressWidth::Q`].
    pub fn encode(&self, width: AddressWidth) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(width.encoded_len());
        self.encode_into(&mut bytes, width)?;
        Ok(bytes)
    }

    pub(crate) fn encode_into(&self, buf: &mut Vec<u8>, width: AddressWidth) -> Result<()> {
        let offset = self.offset.to_le_bytes();
        match width {
            AddressWidth::Q => {
                if self.offset > MAX_Q_OFFSET {
                    return Err(McError::invalid_parameter(
                        "offset",
                        format!("{} does not fit in 3 bytes", self),
                    ));
                }
                buf.extend_from_slice(&offset[..3]);
                buf.push(self.kind.code());
            }
            AddressWidth::IqR => {
                buf.extend_from_slice(&offset);
                buf.extend_from_slice(&[self.kind.code(), 0x00]);
            }
        }
        Ok(())
    }
}

impl FromStr for DeviceAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.base() {
            NumericBase::Decimal => write!(f, "{}{}", self.kind, self.offset),
            NumericBase::Hexadecimal => write!(f, "{}{:X}", self.kind, self.offset),
        }
    }
}
