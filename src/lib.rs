//! # MELSEC MC Protocol Library
//!
//! A Rust library for reading and writing Mitsubishi PLC devices over the
//! MC protocol (3E frame, binary code) on a TCP stream.
//!
//! The crate covers the protocol layer: device address parsing and
//! encoding, request frame construction, response parsing (including the
//! error end-code path), and stateful device handles that cache their read
//! request and track whether the value changed.
//!
//! ## Features
//!
//! - **Synchronous**: one request, one response, blocking I/O
//! - **Typed addresses**: `"X1A0"`, `"D12000"`, `"SB2"` parse into a device
//!   kind plus offset using the kind's own numeric base
//! - **Change tracking**: [`Device`] and [`MultiBlockDevice`] report when a
//!   read returned different data
//! - **No panics**: all errors are returned as `Result<T, McError>`
//! - **No retries**: retry and reconnection policy belongs to the caller
//!
//! ## Quick Start
//!
//! ```no_run
//! use melsec_mc::{ConnectionOptions, Device, PlcConnection};
//!
//! fn main() -> melsec_mc::Result<()> {
//!     let conn = PlcConnection::connect("192.168.3.39:5007", ConnectionOptions::default())?;
//!
//!     // D100 and D101
//!     let counter = Device::new(&conn, "D100", 2)?;
//!     counter.read()?;
//!     println!("D100 = {:?}", counter.words());
//!
//!     counter.set_words(&[0x1234, 0x5678])?;
//!     counter.write()?;
//!
//!     conn.close()
//! }
//! ```
//!
//! ## Device Addresses
//!
//! | Prefix | Device | Base |
//! |--------|--------|------|
//! | `X`, `Y` | Input, output | hex |
//! | `M`, `L`, `F`, `V` | Relays, annunciator, edge relay | decimal |
//! | `B`, `W` | Link relay, link register | hex |
//! | `D`, `R`, `ZR` | Data, file registers | decimal |
//! | `SM`, `SD` | Special relay, special register | decimal |
//! | `TS`, `TC`, `TN` | Timer contact, coil, current value | decimal |
//! | `CS`, `CC`, `CN` | Counter contact, coil, current value | decimal |
//! | `SB`, `SW`, `DX`, `DY` | Link special, direct I/O | hex |
//!
//! Long timers, long counters and the other extended kinds are listed in
//! [`DEVICE_TABLE`]. Prefixes are matched longest first, so `"LTN5"` is a
//! long timer current value and never latch relay `L`.
//!
//! ## Multiple Blocks
//!
//! ```no_run
//! use melsec_mc::{ConnectionOptions, MultiBlockDevice, PlcConnection};
//!
//! let conn = PlcConnection::connect("192.168.3.39:5007", ConnectionOptions::default())?;
//! let mut status = MultiBlockDevice::new(&conn);
//! status.add_block("D0", 3)?.add_block("M0", 2)?;
//!
//! status.read()?;
//! for (block, value) in status.blocks().iter().zip(status.value()) {
//!     println!("{} = {:02X?}", block.name, value);
//! }
//! # Ok::<(), melsec_mc::McError>(())
//! ```
//!
//! ## Error Handling
//!
//! ```no_run
//! use melsec_mc::{ConnectionOptions, Device, EndCodeKind, McError, PlcConnection};
//!
//! let conn = PlcConnection::connect("192.168.3.39:5007", ConnectionOptions::default())?;
//! let device = Device::new(&conn, "D0", 10)?;
//!
//! match device.read() {
//!     Ok(()) => println!("D0 = {:?}", device.words()),
//!     Err(McError::Protocol { kind: EndCodeKind::Timeout, detail, .. }) => {
//!         println!("CPU watchdog timeout, detail {:02X?}", detail);
//!     }
//!     Err(e) if e.is_fatal() => println!("connection lost: {}", e),
//!     Err(e) => println!("Error: {}", e),
//! }
//! # Ok::<(), McError>(())
//! ```
//!
//! ## Configuration
//!
//! ```
//! use melsec_mc::{AddressWidth, ConnectionOptions};
//!
//! let options = ConnectionOptions::builder()
//!     .with_network_no(0x00)
//!     .with_plc_no(0xFF)
//!     .with_module_io_no(0x03FF)
//!     .with_cpu_timer(0x0010)                // 4 s
//!     .with_address_width(AddressWidth::Q)   // iQ-R CPUs: AddressWidth::IqR
//!     .build()?;
//! # Ok::<(), melsec_mc::McError>(())
//! ```
//!
//! ## Concurrency
//!
//! A [`PlcConnection`] serializes whole request/response round trips, so
//! devices on several threads may share it. Each device guards its own
//! state, and [`PlcConnection::close`] releases a thread blocked on a read.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod address;
mod config;
mod connection;
mod device;
mod device_code;
mod end_code;
mod error;
mod frame;
mod multi_device;
mod response;

#[cfg(test)]
mod test_support;

// Public re-exports
pub use address::{AddressWidth, DeviceAddress, MAX_Q_OFFSET};
pub use config::{
    ConnectionOptions, ConnectionOptionsBuilder, DEFAULT_CPU_TIMER, DEFAULT_MODULE_IO_NO,
    DEFAULT_MODULE_STATION_NO, DEFAULT_NETWORK_NO, DEFAULT_PLC_NO,
};
pub use connection::{
    CpuModel, PlcConnection, CPU_MODEL_RESPONSE_SIZE, DEFAULT_MC_PORT, DEFAULT_TIMEOUT,
};
pub use device::Device;
pub use device_code::{lookup_prefix, DeviceKind, DeviceSpec, NumericBase, Unit, DEVICE_TABLE};
pub use end_code::{classify, end_code_description, EndCode, EndCodeKind, END_CODE_OK};
pub use error::{AddressParseError, McError, Result};
pub use frame::{
    build_cpu_model_request, build_multi_request, build_single_request, wrap_request, Block,
    Command, MAX_BLOCKS_PER_COMMAND, MAX_WORDS_PER_COMMAND, REQUEST_HEADER_SIZE,
};
pub use multi_device::{MultiBlockDevice, NamedBlock};
pub use response::{
    read_payload, read_response_header, ResponseHeader, ERROR_DETAIL_SIZE, RESPONSE_HEADER_SIZE,
};
