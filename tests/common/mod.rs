//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod mock_plc;

use std::time::Duration;

use melsec_mc::{ConnectionOptions, PlcConnection};

pub use mock_plc::{MockBehavior, MockPlc, MOCK_CPU_CODE, MOCK_CPU_NAME};

/// Connects to `mock` with default options.
pub fn connect(mock: &MockPlc) -> PlcConnection {
    connect_with(mock, ConnectionOptions::default(), Duration::from_secs(2))
}

/// Connects to `mock` with explicit options and timeout.
pub fn connect_with(mock: &MockPlc, options: ConnectionOptions, timeout: Duration) -> PlcConnection {
    PlcConnection::connect_timeout(mock.local_addr(), options, timeout).unwrap()
}
