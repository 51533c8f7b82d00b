//! Device kind definitions for MELSEC PLCs.
//!
//! This module defines the [`DeviceKind`] enum which represents the soft
//! component classes ("devices") of a MELSEC CPU, together with the static
//! table that maps textual prefixes to kinds, binary device codes, numbering
//! bases and access units.
//!
//! # Device Overview
//!
//! | Prefix | Description | Base | Unit |
//! |--------|-------------|:----:|:----:|
//! | X / Y | Input / output | 16 | bit |
//! | M, L, F, V | Internal, latch, annunciator, edge relay | 10 | bit |
//! | B | Link relay | 16 | bit |
//! | D | Data register | 10 | word |
//! | W | Link register | 16 | word |
//! | R, ZR | File register | 10 | word |
//! | SM / SD | Special relay / special register | 10 | bit / word |
//! | TS, TC, TN | Timer contact, coil, current value | 10 | bit, bit, word |
//! | CS, CC, CN | Counter contact, coil, current value | 10 | bit, bit, word |
//!
//! Long timers/counters (`LT*`, `LST*`, `LC*`), retentive timers (`ST*`),
//! link special devices (`SB`, `SW`), direct I/O (`DX`, `DY`), index
//! registers (`Z`, `LZ`) and refresh data registers (`RD`) are in the table
//! as well.
//!
//! # Example
//!
//! ```
//! use melsec_mc::{DeviceKind, NumericBase, Unit};
//!
//! assert_eq!(DeviceKind::X.base(), NumericBase::Hexadecimal);
//! assert_eq!(DeviceKind::D.unit(), Unit::Word);
//! assert_eq!(DeviceKind::SB.to_string(), "SB");
//! ```

use std::fmt;

/// Numbering base used by a device kind's textual address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericBase {
    /// Decimal device numbers (`D100`).
    Decimal,
    /// Hexadecimal device numbers (`X1A0`).
    Hexadecimal,
}

impl NumericBase {
    /// Returns the radix for `from_str_radix`.
    pub fn radix(self) -> u32 {
        match self {
            NumericBase::Decimal => 10,
            NumericBase::Hexadecimal => 16,
        }
    }
}

/// Whether a device kind is addressed per bit or per 16-bit word.
///
/// Multi-block requests count word blocks and bit blocks separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    /// Bit device; accessed 16 points per word in word commands.
    Bit,
    /// Word device.
    Word,
}

/// Soft component classes of a MELSEC CPU.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    X,
    Y,
    M,
    L,
    F,
    V,
    B,
    D,
    W,
    R,
    Z,
    SM,
    SD,
    TS,
    TC,
    TN,
    CS,
    CC,
    CN,
    SB,
    SW,
    DX,
    DY,
    LZ,
    ZR,
    RD,
    LTS,
    LTC,
    LTN,
    STS,
    STC,
    STN,
    LCS,
    LCC,
    LCN,
    LSTS,
    LSTC,
    LSTN,
}

/// One row of the static device table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSpec {
    /// Uppercase textual prefix.
    pub prefix: &'static str,
    /// Kind the prefix stands for.
    pub kind: DeviceKind,
    /// Binary device code sent on the wire.
    pub code: u8,
    /// Numbering base of the suffix.
    pub base: NumericBase,
    /// Access unit for multi-block tallies.
    pub unit: Unit,
}

const fn spec(
    prefix: &'static str,
    kind: DeviceKind,
    code: u8,
    base: NumericBase,
    unit: Unit,
) -> DeviceSpec {
    DeviceSpec {
        prefix,
        kind,
        code,
        base,
        unit,
    }
}

use NumericBase::{Decimal as DEC, Hexadecimal as HEX};

/// Static device table, one entry per kind in `DeviceKind` variant order.
pub static DEVICE_TABLE: &[DeviceSpec] = &[
    spec("X", DeviceKind::X, 0x9C, HEX, Unit::Bit),
    spec("Y", DeviceKind::Y, 0x9D, HEX, Unit::Bit),
    spec("M", DeviceKind::M, 0x90, DEC, Unit::Bit),
    spec("L", DeviceKind::L, 0x92, DEC, Unit::Bit),
    spec("F", DeviceKind::F, 0x93, DEC, Unit::Bit),
    spec("V", DeviceKind::V, 0x94, DEC, Unit::Bit),
    spec("B", DeviceKind::B, 0xA0, HEX, Unit::Bit),
    spec("D", DeviceKind::D, 0xA8, DEC, Unit::Word),
    spec("W", DeviceKind::W, 0xB4, HEX, Unit::Word),
    spec("R", DeviceKind::R, 0xAF, DEC, Unit::Word),
    spec("Z", DeviceKind::Z, 0xCC, DEC, Unit::Word),
    spec("SM", DeviceKind::SM, 0x91, DEC, Unit::Bit),
    spec("SD", DeviceKind::SD, 0xA9, DEC, Unit::Word),
    spec("TS", DeviceKind::TS, 0xC1, DEC, Unit::Bit),
    spec("TC", DeviceKind::TC, 0xC0, DEC, Unit::Bit),
    spec("TN", DeviceKind::TN, 0xC2, DEC, Unit::Word),
    spec("CS", DeviceKind::CS, 0xC4, DEC, Unit::Bit),
    spec("CC", DeviceKind::CC, 0xC3, DEC, Unit::Bit),
    spec("CN", DeviceKind::CN, 0xC5, DEC, Unit::Word),
    spec("SB", DeviceKind::SB, 0xA1, HEX, Unit::Bit),
    spec("SW", DeviceKind::SW, 0xB5, HEX, Unit::Word),
    spec("DX", DeviceKind::DX, 0xA2, HEX, Unit::Bit),
    spec("DY", DeviceKind::DY, 0xA3, HEX, Unit::Bit),
    spec("LZ", DeviceKind::LZ, 0x62, DEC, Unit::Word),
    spec("ZR", DeviceKind::ZR, 0xB0, DEC, Unit::Word),
    spec("RD", DeviceKind::RD, 0x2C, DEC, Unit::Word),
    spec("LTS", DeviceKind::LTS, 0x51, DEC, Unit::Bit),
    spec("LTC", DeviceKind::LTC, 0x50, DEC, Unit::Bit),
    spec("LTN", DeviceKind::LTN, 0x52, DEC, Unit::Word),
    spec("STS", DeviceKind::STS, 0xC7, DEC, Unit::Bit),
    spec("STC", DeviceKind::STC, 0xC6, DEC, Unit::Bit),
    spec("STN", DeviceKind::STN, 0xC8, DEC, Unit::Word),
    spec("LCS", DeviceKind::LCS, 0x55, DEC, Unit::Bit),
    spec("LCC", DeviceKind::LCC, 0x54, DEC, Unit::Bit),
    spec("LCN", DeviceKind::LCN, 0x56, DEC, Unit::Word),
    spec("LSTS", DeviceKind::LSTS, 0x59, DEC, Unit::Bit),
    spec("LSTC", DeviceKind::LSTC, 0x58, DEC, Unit::Bit),
    spec("LSTN", DeviceKind::LSTN, 0x5A, DEC, Unit::Word),
];

/// Longest prefix length in [`DEVICE_TABLE`].
pub const MAX_PREFIX_LEN: usize = 4;

/// Finds the table entry whose prefix equals `prefix` exactly.
pub fn lookup_prefix(prefix: &str) -> Option<&'static DeviceSpec> {
    DEVICE_TABLE.iter().find(|spec| spec.prefix == prefix)
}

impl DeviceKind {
    /// Returns this kind's row in [`DEVICE_TABLE`].
    pub fn spec(self) -> &'static DeviceSpec {
        // rows are laid out in variant order
        let spec = &DEVICE_TABLE[self as usize];
        debug_assert_eq!(spec.kind, self);
        spec
    }

    /// Returns the binary device code.
    pub fn code(self) -> u8 {
        self.spec().code
    }

    /// Returns the textual prefix.
    pub fn prefix(self) -> &'static str {
        self.spec().prefix
    }

    /// Returns the numbering base of device numbers.
    pub fn base(self) -> NumericBase {
        self.spec().base
    }

    /// Returns whether this kind is a bit or a word device.
    ///
    /// # Example
    ///
    /// ```
    /// use melsec_mc::{DeviceKind, Unit};
    ///
    /// assert_eq!(DeviceKind::M.unit(), Unit::Bit);
    /// assert_eq!(DeviceKind::TN.unit(), Unit::Word);
    /// ```
    pub fn unit(self) -> Unit {
        self.spec().unit
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}
