//! Single-block device with change tracking.
//!
//! A [`Device`] names one contiguous range of word devices on a PLC, for
//! example `D100` with a count of 4. It remembers the last value read or
//! written, holds an optional staged write, and reports whether the stored
//! value changed since it was last fetched with [`Device::value`].
//!
//! The read request never changes for a given device, so it is built on the
//! first [`Device::read`] and reused afterwards. Write requests carry the
//! staged data and are built fresh on every [`Device::write`].
//!
//! # Example
//!
//! ```no_run
//! use melsec_mc::{ConnectionOptions, Device, PlcConnection};
//!
//! let conn = PlcConnection::connect("192.168.3.39:5007", ConnectionOptions::default())?;
//! let device = Device::new(&conn, "D100", 2)?;
//!
//! device.read()?;
//! if device.changed() {
//!     println!("D100..D101 = {:?}", device.words());
//! }
//!
//! device.set_words(&[0x1234, 0x5678])?;
//! device.write()?;
//! # Ok::<(), melsec_mc::McError>(())
//! ```

use std::fmt;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::address::DeviceAddress;
use crate::connection::PlcConnection;
use crate::error::{McError, Result};
use crate::frame::{build_single_request, Command, MAX_WORDS_PER_COMMAND};

#[derive(Debug, Default)]
struct DeviceState {
    value: Vec<u8>,
    pending: Option<Vec<u8>>,
    read_frame: Option<Vec<u8>>,
    changed: bool,
}

/// One named range of word devices bound to a connection.
pub struct Device<'c, S = TcpStream> {
    conn: &'c PlcConnection<S>,
    name: String,
    address: DeviceAddress,
    count: u16,
    state: Mutex<DeviceState>,
}

/// Zero-pads `raw` to `width` bytes, rejecting longer input.
pub(crate) fn pad_value(raw: &[u8], width: usize) -> Result<Vec<u8>> {
    if raw.len() > width {
        return Err(McError::ValueTooLong {
            len: raw.len(),
            max: width,
        });
    }
    let mut padded = raw.to_vec();
    padded.resize(width, 0);
    Ok(padded)
}

pub(crate) fn check_device_count(count: u16) -> Result<()> {
    if count == 0 || count > MAX_WORDS_PER_COMMAND {
        return Err(McError::invalid_parameter(
            "count",
            format!("{} is outside 1-{}", count, MAX_WORDS_PER_COMMAND),
        ));
    }
    Ok(())
}

impl<'c, S: Read + Write> Device<'c, S> {
    /// Creates a device for `count` words starting at `name`.
    ///
    /// No I/O happens here; the stored value stays empty until the first
    /// successful [`read`](Self::read) or [`write`](Self::write).
    ///
    /// # Errors
    ///
    /// - `McError::Address` if `name` is not a valid device address.
    /// - `McError::InvalidParameter` if `count` is 0 or above 960.
    pub fn new(conn: &'c PlcConnection<S>, name: &str, count: u16) -> Result<Self> {
        let address = DeviceAddress::parse(name)?;
        check_device_count(count)?;

        Ok(Self {
            conn,
            name: name.to_ascii_uppercase(),
            address,
            count,
            state: Mutex::new(DeviceState::default()),
        })
    }

    /// Device name as given, normalised to uppercase.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parsed head address.
    pub fn address(&self) -> DeviceAddress {
        self.address
    }

    /// Number of words covered.
    pub fn count(&self) -> u16 {
        self.count
    }

    /// Width of the device value in bytes.
    pub fn byte_len(&self) -> usize {
        usize::from(self.count) * 2
    }

    fn state(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns whether the stored value changed since the last
    /// [`value`](Self::value) call.
    pub fn changed(&self) -> bool {
        self.state().changed
    }

    /// Returns whether a staged value is waiting for [`write`](Self::write).
    pub fn is_write_pending(&self) -> bool {
        self.state().pending.is_some()
    }

    /// Reads the device from the PLC.
    ///
    /// The stored value is replaced, and `changed` set, only when the
    /// response differs from what is stored. On error nothing is modified.
    ///
    /// # Errors
    ///
    /// Any error from [`PlcConnection::send_command`].
    pub fn read(&self) -> Result<()> {
        let mut state = self.state();

        let frame = match state.read_frame.take() {
            Some(frame) => frame,
            None => build_single_request(
                self.conn.options(),
                Command::BatchRead,
                &self.address,
                self.count,
                None,
            )?,
        };
        let result = self.conn.send_command(&frame, self.byte_len());
        state.read_frame = Some(frame);
        let payload = result?;

        if payload != state.value {
            state.value = payload;
            state.changed = true;
        }
        debug!(device = %self.name, count = self.count, changed = state.changed, "read device");
        Ok(())
    }

    /// Writes the staged value to the PLC.
    ///
    /// Does nothing when no value is staged. On success the staged value
    /// becomes the stored value and `changed` is set; on failure it stays
    /// staged so the caller can retry.
    ///
    /// # Errors
    ///
    /// Any error from [`PlcConnection::send_command`].
    pub fn write(&self) -> Result<()> {
        let mut state = self.state();
        let Some(pending) = state.pending.as_deref() else {
            return Ok(());
        };

        let frame = build_single_request(
            self.conn.options(),
            Command::BatchWrite,
            &self.address,
            self.count,
            Some(pending),
        )?;
        self.conn.send_command(&frame, 0)?;

        if let Some(pending) = state.pending.take() {
            state.value = pending;
        }
        state.changed = true;
        debug!(device = %self.name, count = self.count, "wrote device");
        Ok(())
    }

    /// Stages `raw` for the next [`write`](Self::write).
    ///
    /// Shorter input is zero-padded to `count * 2` bytes.
    ///
    /// # Errors
    ///
    /// Returns `McError::ValueTooLong` if `raw` is wider than the device;
    /// the value is never truncated.
    pub fn set_value(&self, raw: &[u8]) -> Result<()> {
        let padded = pad_value(raw, self.byte_len())?;
        self.state().pending = Some(padded);
        Ok(())
    }

    /// Stages little-endian words for the next [`write`](Self::write).
    ///
    /// # Errors
    ///
    /// Returns `McError::ValueTooLong` if more than `count` words are given.
    pub fn set_words(&self, words: &[u16]) -> Result<()> {
        let raw: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        self.set_value(&raw)
    }

    /// Returns the stored value and clears the `changed` flag.
    pub fn value(&self) -> Vec<u8> {
        let mut state = self.state();
        state.changed = false;
        state.value.clone()
    }

    /// Decodes the stored value as little-endian words.
    ///
    /// Unlike [`value`](Self::value) this leaves `changed` as it is.
    pub fn words(&self) -> Vec<u16> {
        self.state()
            .value
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect()
    }
}

impl<S> fmt::Debug for Device<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("count", &self.count)
            .finish_non_exhaustive()
    }
}
