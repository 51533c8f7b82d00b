//! Connection options for the MC protocol access route.
//!
//! Every request frame starts with the same access route: network number,
//! PLC number, request destination module I/O number and station number,
//! followed by the CPU monitoring timer. [`ConnectionOptions`] holds these
//! values; it is immutable once built and validated exactly once by
//! [`ConnectionOptionsBuilder::build`].
//!
//! # Example
//!
//! ```
//! use melsec_mc::{AddressWidth, ConnectionOptions};
//!
//! let options = ConnectionOptions::builder()
//!     .with_cpu_timer(0x0010)               // 16 * 250 ms
//!     .with_address_width(AddressWidth::IqR)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(options.plc_no(), 0xFF);
//! assert_eq!(options.cpu_timer(), 0x0010);
//! ```

use crate::address::AddressWidth;
use crate::error::{McError, Result};

/// Default network number (own network).
pub const DEFAULT_NETWORK_NO: u8 = 0x00;
/// Default PLC number (own station).
pub const DEFAULT_PLC_NO: u8 = 0xFF;
/// Default request destination module I/O number (own station CPU).
pub const DEFAULT_MODULE_IO_NO: u16 = 0x03FF;
/// Default request destination module station number.
pub const DEFAULT_MODULE_STATION_NO: u8 = 0x00;
/// Default CPU monitoring timer, in units of 250 ms.
pub const DEFAULT_CPU_TIMER: u16 = 0x0001;

/// Access route and timer settings shared by every frame on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionOptions {
    network_no: u8,
    plc_no: u8,
    module_io_no: u16,
    module_station_no: u8,
    cpu_timer: u16,
    address_width: AddressWidth,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            network_no: DEFAULT_NETWORK_NO,
            plc_no: DEFAULT_PLC_NO,
            module_io_no: DEFAULT_MODULE_IO_NO,
            module_station_no: DEFAULT_MODULE_STATION_NO,
            cpu_timer: DEFAULT_CPU_TIMER,
            address_width: AddressWidth::Q,
        }
    }
}

impl ConnectionOptions {
    /// Starts a builder initialised with the defaults.
    pub fn builder() -> ConnectionOptionsBuilder {
        ConnectionOptionsBuilder::default()
    }

    /// Network number.
    pub fn network_no(&self) -> u8 {
        self.network_no
    }

    /// PLC number.
    pub fn plc_no(&self) -> u8 {
        self.plc_no
    }

    /// Request destination module I/O number.
    pub fn module_io_no(&self) -> u16 {
        self.module_io_no
    }

    /// Request destination module station number.
    pub fn module_station_no(&self) -> u8 {
        self.module_station_no
    }

    /// CPU monitoring timer (250 ms units, 0 waits forever).
    pub fn cpu_timer(&self) -> u16 {
        self.cpu_timer
    }

    /// Device field layout used in request payloads.
    pub fn address_width(&self) -> AddressWidth {
        self.address_width
    }
}

/// Builder for [`ConnectionOptions`].
///
/// Each setter may be called at most once; [`build`](Self::build) reports a
/// second call, and any out-of-range value, as `McError::InvalidParameter`.
#[derive(Debug, Clone, Default)]
pub struct ConnectionOptionsBuilder {
    network_no: Option<u8>,
    plc_no: Option<u8>,
    module_io_no: Option<u16>,
    module_station_no: Option<u8>,
    cpu_timer: Option<u16>,
    address_width: Option<AddressWidth>,
    duplicate: Option<&'static str>,
}

fn set_once<T>(slot: &mut Option<T>, value: T, name: &'static str, dup: &mut Option<&'static str>) {
    if slot.is_some() && dup.is_none() {
        *dup = Some(name);
    }
    *slot = Some(value);
}

impl ConnectionOptionsBuilder {
    /// Sets the network number (0x00 for the own network, up to 0xEF).
    pub fn with_network_no(mut self, network_no: u8) -> Self {
        set_once(&mut self.network_no, network_no, "network_no", &mut self.duplicate);
        self
    }

    /// Sets the PLC number (0xFF for the own station).
    pub fn with_plc_no(mut self, plc_no: u8) -> Self {
        set_once(&mut self.plc_no, plc_no, "plc_no", &mut self.duplicate);
        self
    }

    /// Sets the request destination module I/O number.
    pub fn with_module_io_no(mut self, module_io_no: u16) -> Self {
        set_once(
            &mut self.module_io_no,
            module_io_no,
            "module_io_no",
            &mut self.duplicate,
        );
        self
    }

    /// Sets the request destination module station number.
    pub fn with_module_station_no(mut self, station_no: u8) -> Self {
        set_once(
            &mut self.module_station_no,
            station_no,
            "module_station_no",
            &mut self.duplicate,
        );
        self
    }

    /// Sets the CPU monitoring timer in units of 250 ms.
    pub fn with_cpu_timer(mut self, cpu_timer: u16) -> Self {
        set_once(&mut self.cpu_timer, cpu_timer, "cpu_timer", &mut self.duplicate);
        self
    }

    /// Selects the Q-series or iQ-R device field layout.
    pub fn with_address_width(mut self, width: AddressWidth) -> Self {
        set_once(
            &mut self.address_width,
            width,
            "address_width",
            &mut self.duplicate,
        );
        self
    }

    /// Validates the settings and produces the immutable options.
    ///
    /// # Errors
    ///
    /// Returns `McError::InvalidParameter` if a setter was called twice or a
    /// value is outside the range the access route allows.
    ///
    /// # Example
    ///
    /// ```
    /// use melsec_mc::ConnectionOptions;
    ///
    /// assert!(ConnectionOptions::builder().with_module_io_no(0x0400).build().is_err());
    /// assert!(ConnectionOptions::builder()
    ///     .with_cpu_timer(4)
    ///     .with_cpu_timer(8)
    ///     .build()
    ///     .is_err());
    /// ```
    pub fn build(self) -> Result<ConnectionOptions> {
        if let Some(name) = self.duplicate {
            return Err(McError::invalid_parameter(name, "may only be set once"));
        }

        let defaults = ConnectionOptions::default();
        let options = ConnectionOptions {
            network_no: self.network_no.unwrap_or(defaults.network_no),
            plc_no: self.plc_no.unwrap_or(defaults.plc_no),
            module_io_no: self.module_io_no.unwrap_or(defaults.module_io_no),
            module_station_no: self.module_station_no.unwrap_or(defaults.module_station_no),
            cpu_timer: self.cpu_timer.unwrap_or(defaults.cpu_timer),
            address_width: self.address_width.unwrap_or(defaults.address_width),
        };

        if options.network_no > 0xEF {
            return Err(McError::invalid_parameter(
                "network_no",
                format!("0x{:02X} is outside 0x00-0xEF", options.network_no),
            ));
        }
        if !matches!(options.plc_no, 0x01..=0x78 | 0x7D | 0x7E | 0xFF) {
            return Err(McError::invalid_parameter(
                "plc_no",
                format!("0x{:02X} is not a valid PLC number", options.plc_no),
            ));
        }
        if !matches!(
            options.module_io_no,
            0x0000..=0x01FF | 0x03D0..=0x03D3 | 0x03E0..=0x03E3 | 0x03FF
        ) {
            return Err(McError::invalid_parameter(
                "module_io_no",
                format!("0x{:04X} is not a valid module I/O number", options.module_io_no),
            ));
        }
        if options.module_station_no > 0x1F {
            return Err(McError::invalid_parameter(
                "module_station_no",
                format!("0x{:02X} is outside 0x00-0x1F", options.module_station_no),
            ));
        }

        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ConnectionOptions::default();
        assert_eq!(options.network_no(), 0x00);
        assert_eq!(options.plc_no(), 0xFF);
        assert_eq!(options.module_io_no(), 0x03FF);
        assert_eq!(options.module_station_no(), 0x00);
        assert_eq!(options.cpu_timer(), 0x0001);
        assert_eq!(options.address_width(), AddressWidth::Q);
        assert_eq!(ConnectionOptions::builder().build().unwrap(), options);
    }

    #[test]
    fn test_overrides() {
        let options = ConnectionOptions::builder()
            .with_network_no(1)
            .with_plc_no(2)
            .with_module_io_no(0x03E0)
            .with_module_station_no(3)
            .with_cpu_timer(20)
            .with_address_width(AddressWidth::IqR)
            .build()
            .unwrap();

        assert_eq!(options.network_no(), 1);
        assert_eq!(options.plc_no(), 2);
        assert_eq!(options.module_io_no(), 0x03E0);
        assert_eq!(options.module_station_no(), 3);
        assert_eq!(options.cpu_timer(), 20);
        assert_eq!(options.address_width(), AddressWidth::IqR);
    }

    #[test]
    fn test_duplicate_setter_rejected() {
        let err = ConnectionOptions::builder()
            .with_plc_no(1)
            .with_plc_no(2)
            .build()
            .unwrap_err();
        assert!(matches!(err, McError::InvalidParameter { ref parameter, .. } if parameter == "plc_no"));
    }

    #[test]
    fn test_range_checks() {
        assert!(ConnectionOptions::builder().with_network_no(0xF0).build().is_err());
        assert!(ConnectionOptions::builder().with_plc_no(0x00).build().is_err());
        assert!(ConnectionOptions::builder().with_plc_no(0x7D).build().is_ok());
        assert!(ConnectionOptions::builder().with_module_io_no(0x0200).build().is_err());
        assert!(ConnectionOptions::builder().with_module_io_no(0x01FF).build().is_ok());
        assert!(ConnectionOptions::builder().with_module_station_no(0x20).build().is_err());
    }

    #[test]
    fn test_cpu_timer_zero_allowed() {
        let options = ConnectionOptions::builder().with_cpu_timer(0).build().unwrap();
        assert_eq!(options.cpu_timer(), 0);
    }
}
