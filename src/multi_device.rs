//! Several device ranges read and written with one request.
//!
//! A [`MultiBlockDevice`] is an ordered list of blocks, each a head device
//! plus a word count. One multiple-block request covers all of them; the
//! combined response is split back into per-block values strictly in the
//! order the blocks were added, `count * 2` bytes each.
//!
//! # Example
//!
//! ```no_run
//! use melsec_mc::{ConnectionOptions, MultiBlockDevice, PlcConnection};
//!
//! let conn = PlcConnection::connect("192.168.3.39:5007", ConnectionOptions::default())?;
//! let mut device = MultiBlockDevice::new(&conn);
//! device.add_block("D0", 3)?.add_block("M0", 2)?;
//!
//! device.read()?;
//! let values = device.value();
//! assert_eq!(values.len(), 2);
//! # Ok::<(), melsec_mc::McError>(())
//! ```

use std::fmt;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::address::DeviceAddress;
use crate::connection::PlcConnection;
use crate::device::{check_device_count, pad_value};
use crate::error::{McError, Result};
use crate::frame::{build_multi_request, Block, Command};

/// A named block within a [`MultiBlockDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedBlock {
    /// Device name, normalised to uppercase.
    pub name: String,
    /// Parsed head address and word count.
    pub block: Block,
}

#[derive(Debug, Default)]
struct MultiState {
    values: Vec<Vec<u8>>,
    pending: Option<Vec<Vec<u8>>>,
    read_frame: Option<Vec<u8>>,
    changed: bool,
}

/// Ordered set of device blocks sharing one request.
pub struct MultiBlockDevice<'c, S = TcpStream> {
    conn: &'c PlcConnection<S>,
    blocks: Vec<NamedBlock>,
    state: Mutex<MultiState>,
}

impl<'c, S: Read + Write> MultiBlockDevice<'c, S> {
    /// Creates an empty multi-block device.
    pub fn new(conn: &'c PlcConnection<S>) -> Self {
        Self {
            conn,
            blocks: Vec::new(),
            state: Mutex::new(MultiState::default()),
        }
    }

    /// Appends a block of `count` words starting at `name`.
    ///
    /// Any staged write is discarded, since it no longer lines up with the
    /// block list.
    ///
    /// # Errors
    ///
    /// - `McError::Address` if `name` is not a valid device address.
    /// - `McError::InvalidParameter` if `count` is 0 or above 960.
    pub fn add_block(&mut self, name: &str, count: u16) -> Result<&mut Self> {
        let address = DeviceAddress::parse(name)?;
        check_device_count(count)?;

        self.blocks.push(NamedBlock {
            name: name.to_ascii_uppercase(),
            block: Block::new(address, count),
        });

        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        state.values.push(Vec::new());
        state.pending = None;
        state.read_frame = None;
        Ok(self)
    }

    /// Blocks in declaration order.
    pub fn blocks(&self) -> &[NamedBlock] {
        &self.blocks
    }

    /// Total width of all blocks in bytes.
    pub fn byte_len(&self) -> usize {
        self.blocks.iter().map(|b| b.block.byte_len()).sum()
    }

    fn state(&self) -> MutexGuard<'_, MultiState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn raw_blocks(&self) -> Vec<Block> {
        self.blocks.iter().map(|b| b.block).collect()
    }

    /// Returns whether any block changed since the last
    /// [`value`](Self::value) call.
    pub fn changed(&self) -> bool {
        self.state().changed
    }

    /// Returns whether staged values are waiting for [`write`](Self::write).
    pub fn is_write_pending(&self) -> bool {
        self.state().pending.is_some()
    }

    /// Reads every block with one multiple-block request.
    ///
    /// # Errors
    ///
    /// - `McError::InvalidParameter` if no block was added.
    /// - `McError::ResponseLength` if the payload does not match the block
    ///   widths; the connection must be treated as out of sync.
    /// - Any error from [`PlcConnection::send_command`].
    pub fn read(&self) -> Result<()> {
        let mut state = self.state();

        let frame = match state.read_frame.take() {
            Some(frame) => frame,
            None => build_multi_request(
                self.conn.options(),
                Command::MultiBlockRead,
                &self.raw_blocks(),
                None,
            )?,
        };
        let expected = self.byte_len();
        let result = self.conn.send_command(&frame, expected);
        state.read_frame = Some(frame);
        let payload = result?;

        let values = self.partition(&payload)?;
        if values != state.values {
            state.values = values;
            state.changed = true;
        }
        debug!(
            blocks = self.blocks.len(),
            bytes = expected,
            changed = state.changed,
            "read multi-block device"
        );
        Ok(())
    }

    /// Splits a combined payload into per-block values.
    fn partition(&self, payload: &[u8]) -> Result<Vec<Vec<u8>>> {
        let expected = self.byte_len();
        if payload.len() != expected {
            return Err(McError::ResponseLength {
                expected,
                received: payload.len(),
            });
        }

        let mut rest = payload;
        let mut values = Vec::with_capacity(self.blocks.len());
        for named in &self.blocks {
            let (head, tail) = rest.split_at(named.block.byte_len());
            values.push(head.to_vec());
            rest = tail;
        }
        Ok(values)
    }

    /// Writes all staged block values with one multiple-block request.
    ///
    /// Does nothing when nothing is staged. On failure the staged values
    /// are kept.
    ///
    /// # Errors
    ///
    /// Any error from [`PlcConnection::send_command`].
    pub fn write(&self) -> Result<()> {
        let mut state = self.state();
        let Some(pending) = state.pending.as_deref() else {
            return Ok(());
        };

        let frame = build_multi_request(
            self.conn.options(),
            Command::MultiBlockWrite,
            &self.raw_blocks(),
            Some(pending),
        )?;
        self.conn.send_command(&frame, 0)?;

        if let Some(pending) = state.pending.take() {
            state.values = pending;
        }
        state.changed = true;
        debug!(blocks = self.blocks.len(), "wrote multi-block device");
        Ok(())
    }

    /// Stages one value per block for the next [`write`](Self::write).
    ///
    /// Each value is zero-padded to its block's width.
    ///
    /// # Errors
    ///
    /// - `McError::InvalidParameter` if the number of values differs from
    ///   the number of blocks.
    /// - `McError::ValueTooLong` if any value is wider than its block.
    pub fn set_value<V: AsRef<[u8]>>(&self, values: &[V]) -> Result<()> {
        if values.len() != self.blocks.len() {
            return Err(McError::invalid_parameter(
                "values",
                format!("expected {} blocks, got {}", self.blocks.len(), values.len()),
            ));
        }

        let padded = self
            .blocks
            .iter()
            .zip(values)
            .map(|(named, value)| pad_value(value.as_ref(), named.block.byte_len()))
            .collect::<Result<Vec<_>>>()?;

        self.state().pending = Some(padded);
        Ok(())
    }

    /// Returns the per-block values in declaration order and clears the
    /// `changed` flag.
    pub fn value(&self) -> Vec<Vec<u8>> {
        let mut state = self.state();
        state.changed = false;
        state.values.clone()
    }
}

impl<S> fmt::Debug for MultiBlockDevice<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiBlockDevice")
            .field("blocks", &self.blocks)
            .finish_non_exhaustive()
    }
}
