//! MC protocol (3E binary) request frames.
//!
//! # Request Structure
//!
//! | Bytes | Field | Description |
//! |-------|-------|-------------|
//! | 2 | Subtitle | Always `0x50, 0x00` |
//! | 1 | Network No. | Access route |
//! | 1 | PLC No. | Access route |
//! | 2 | Module I/O No. | Access route, little-endian |
//! | 1 | Module Station No. | Access route |
//! | 2 | Request data length | Bytes from CPU timer to end of payload |
//! | 2 | CPU timer | 250 ms units |
//! | 2 | Command | e.g. `0x0401` batch read |
//! | 2 | Subcommand | `0x0000` (Q) or `0x0002` (iQ-R) |
//! | n | Payload | Command specific |
//!
//! Batch payload: `device field | count (2B) | [write data]`.
//!
//! Multi-block payload: `word blocks (1B) | bit blocks (1B)` followed by
//! `device field | count (2B) | [write data]` for each block in order.
//!
//! # Example
//!
//! ```
//! use melsec_mc::{build_single_request, Command, ConnectionOptions, DeviceAddress};
//!
//! let options = ConnectionOptions::default();
//! let addr: DeviceAddress = "D100".parse().unwrap();
//! let frame = build_single_request(&options, Command::BatchRead, &addr, 2, None).unwrap();
//!
//! assert_eq!(&frame[..2], &[0x50, 0x00]);
//! // timer + command + subcommand + 6-byte payload
//! assert_eq!(u16::from_le_bytes([frame[7], frame[8]]), 12);
//! assert_eq!(&frame[15..], &[0x64, 0x00, 0x00, 0xA8, 0x02, 0x00]);
//! ```

use crate::address::{AddressWidth, DeviceAddress};
use crate::config::ConnectionOptions;
use crate::device_code::Unit;
use crate::error::{McError, Result};

/// Subtitle of a 3E request frame.
pub const REQUEST_SUBTITLE: [u8; 2] = [0x50, 0x00];

/// Size of the fixed header: subtitle + access route + request data length.
pub const REQUEST_HEADER_SIZE: usize = 9;

/// Maximum number of words in one batch command.
pub const MAX_WORDS_PER_COMMAND: u16 = 960;

/// Maximum number of blocks (word + bit) in one multi-block command.
pub const MAX_BLOCKS_PER_COMMAND: usize = 120;

/// Commands this client sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Batch read in word units (`0x0401`).
    BatchRead,
    /// Batch write in word units (`0x1401`).
    BatchWrite,
    /// Multiple-block batch read (`0x0406`).
    MultiBlockRead,
    /// Multiple-block batch write (`0x1406`).
    MultiBlockWrite,
    /// CPU model name read (`0x0101`).
    ReadCpuModel,
}

impl Command {
    /// Returns the command code; it is sent little-endian.
    pub fn code(self) -> u16 {
        match self {
            Command::BatchRead => 0x0401,
            Command::BatchWrite => 0x1401,
            Command::MultiBlockRead => 0x0406,
            Command::MultiBlockWrite => 0x1406,
            Command::ReadCpuModel => 0x0101,
        }
    }

    /// Returns the subcommand for the given device field layout.
    pub fn subcommand(self, width: AddressWidth) -> u16 {
        match self {
            Command::ReadCpuModel => 0x0000,
            _ => width.word_subcommand(),
        }
    }

    /// Returns whether the request carries write data.
    pub fn is_write(self) -> bool {
        matches!(self, Command::BatchWrite | Command::MultiBlockWrite)
    }
}

/// One block of a multi-block request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Head device of the block.
    pub address: DeviceAddress,
    /// Number of words in the block.
    pub count: u16,
}

impl Block {
    /// Creates a block.
    pub fn new(address: DeviceAddress, count: u16) -> Self {
        Self { address, count }
    }

    /// Width of the block's data in bytes.
    pub fn byte_len(&self) -> usize {
        usize::from(self.count) * 2
    }
}

/// Access route bytes that follow the subtitle.
fn access_route(options: &ConnectionOptions) -> [u8; 5] {
    let io = options.module_io_no().to_le_bytes();
    [
        options.network_no(),
        options.plc_no(),
        io[0],
        io[1],
        options.module_station_no(),
    ]
}

/// Wraps a command payload into a complete request frame.
///
/// # Errors
///
/// Returns `McError::InvalidParameter` if the request data length does not
/// fit in 2 bytes.
pub fn wrap_request(options: &ConnectionOptions, command: Command, payload: &[u8]) -> Result<Vec<u8>> {
    // timer + command + subcommand
    let data_len = 6 + payload.len();
    let request_len = u16::try_from(data_len).map_err(|_| {
        McError::invalid_parameter("payload", format!("{} bytes exceeds frame limit", data_len))
    })?;

    let mut frame = Vec::with_capacity(REQUEST_HEADER_SIZE + data_len);
    frame.extend_from_slice(&REQUEST_SUBTITLE);
    frame.extend_from_slice(&access_route(options));
    frame.extend_from_slice(&request_len.to_le_bytes());
    frame.extend_from_slice(&options.cpu_timer().to_le_bytes());
    frame.extend_from_slice(&command.code().to_le_bytes());
    frame.extend_from_slice(&command.subcommand(options.address_width()).to_le_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

fn check_count(parameter: &str, count: u16) -> Result<()> {
    if count == 0 {
        return Err(McError::invalid_parameter(parameter, "must be greater than 0"));
    }
    if count > MAX_WORDS_PER_COMMAND {
        return Err(McError::invalid_parameter(
            parameter,
            format!("must not exceed {}", MAX_WORDS_PER_COMMAND),
        ));
    }
    Ok(())
}

fn check_values(parameter: &str, values: &[u8], count: u16) -> Result<()> {
    let expected = usize::from(count) * 2;
    if values.len() != expected {
        return Err(McError::invalid_parameter(
            parameter,
            format!("expected {} bytes, got {}", expected, values.len()),
        ));
    }
    Ok(())
}

/// Builds a batch read or batch write request for one device range.
///
/// `values` must be present, and exactly `count * 2` bytes long, for
/// [`Command::BatchWrite`]; it must be absent for [`Command::BatchRead`].
///
/// # Errors
///
/// Returns `McError::InvalidParameter` for a non-batch command, a count
/// outside 1-960, or missing/mis-sized write data.
pub fn build_single_request(
    options: &ConnectionOptions,
    command: Command,
    address: &DeviceAddress,
    count: u16,
    values: Option<&[u8]>,
) -> Result<Vec<u8>> {
    if !matches!(command, Command::BatchRead | Command::BatchWrite) {
        return Err(McError::invalid_parameter(
            "command",
            format!("{:?} is not a batch command", command),
        ));
    }
    check_count("count", count)?;

    let width = options.address_width();
    let mut payload = Vec::with_capacity(width.encoded_len() + 2 + values.map_or(0, <[u8]>::len));
    address.encode_into(&mut payload, width)?;
    payload.extend_from_slice(&count.to_le_bytes());

    match (command.is_write(), values) {
        (true, Some(values)) => {
            check_values("values", values, count)?;
            payload.extend_from_slice(values);
        }
        (false, None) => {}
        (true, None) => return Err(McError::invalid_parameter("values", "write requires data")),
        (false, Some(_)) => {
            return Err(McError::invalid_parameter("values", "read takes no data"))
        }
    }

    wrap_request(options, command, &payload)
}

/// Builds a multiple-block batch read or write request.
///
/// Word and bit block counts are tallied from each block's device unit, in
/// declaration order. For [`Command::MultiBlockWrite`] `values` must hold one
/// buffer per block, each exactly `count * 2` bytes long.
///
/// # Errors
///
/// Returns `McError::InvalidParameter` for a non-multi-block command, an
/// empty or oversized block list, a bad block count, or write data that does
/// not line up with the blocks.
pub fn build_multi_request(
    options: &ConnectionOptions,
    command: Command,
    blocks: &[Block],
    values: Option<&[Vec<u8>]>,
) -> Result<Vec<u8>> {
    if !matches!(command, Command::MultiBlockRead | Command::MultiBlockWrite) {
        return Err(McError::invalid_parameter(
            "command",
            format!("{:?} is not a multi-block command", command),
        ));
    }
    if blocks.is_empty() {
        return Err(McError::invalid_parameter("blocks", "must not be empty"));
    }
    if blocks.len() > MAX_BLOCKS_PER_COMMAND {
        return Err(McError::invalid_parameter(
            "blocks",
            format!("must not exceed {} blocks", MAX_BLOCKS_PER_COMMAND),
        ));
    }
    let total: usize = blocks.iter().map(|b| usize::from(b.count)).sum();
    if total > usize::from(MAX_WORDS_PER_COMMAND) {
        return Err(McError::invalid_parameter(
            "blocks",
            format!("{} points exceeds {}", total, MAX_WORDS_PER_COMMAND),
        ));
    }

    let values = match (command.is_write(), values) {
        (true, Some(values)) if values.len() == blocks.len() => Some(values),
        (true, Some(values)) => {
            return Err(McError::invalid_parameter(
                "values",
                format!("expected {} blocks, got {}", blocks.len(), values.len()),
            ))
        }
        (true, None) => return Err(McError::invalid_parameter("values", "write requires data")),
        (false, Some(_)) => {
            return Err(McError::invalid_parameter("values", "read takes no data"))
        }
        (false, None) => None,
    };

    let width = options.address_width();
    let mut word_blocks: u8 = 0;
    let mut bit_blocks: u8 = 0;
    let mut body = Vec::with_capacity(blocks.len() * (width.encoded_len() + 2));

    for (i, block) in blocks.iter().enumerate() {
        check_count("count", block.count)?;
        match block.address.unit() {
            Unit::Word => word_blocks += 1,
            Unit::Bit => bit_blocks += 1,
        }

        block.address.encode_into(&mut body, width)?;
        body.extend_from_slice(&block.count.to_le_bytes());

        if let Some(values) = values {
            check_values("values", &values[i], block.count)?;
            body.extend_from_slice(&values[i]);
        }
    }

    let mut payload = Vec::with_capacity(2 + body.len());
    payload.push(word_blocks);
    payload.push(bit_blocks);
    payload.extend_from_slice(&body);

    wrap_request(options, command, &payload)
}

/// Builds the CPU model name read request.
pub fn build_cpu_model_request(options: &ConnectionOptions) -> Result<Vec<u8>> {
    wrap_request(options, Command::ReadCpuModel, &[])
}
