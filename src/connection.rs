//! Connection to a PLC's MC protocol port.
//!
//! [`PlcConnection`] pairs a byte stream with the [`ConnectionOptions`] used
//! to build frames for it. The protocol is strictly half-duplex, so the
//! stream sits behind a mutex that is held for the whole request/response
//! round trip; devices on different threads can share one connection
//! without interleaving frames.
//!
//! # Design
//!
//! - **Synchronous** - blocking writes and reads; deadlines come from the
//!   socket's read/write timeouts
//! - **No retries** - every failure is returned to the caller
//! - **Stream agnostic** - any `Read + Write` works; [`TcpStream`] is the
//!   production transport
//!
//! # Example
//!
//! ```no_run
//! use melsec_mc::{ConnectionOptions, PlcConnection};
//!
//! let conn = PlcConnection::connect("192.168.3.39:5007", ConnectionOptions::default())?;
//! let model = conn.read_cpu_model()?;
//! println!("connected to {} (0x{:04X})", model.name, model.code);
//! conn.close()?;
//! # Ok::<(), melsec_mc::McError>(())
//! ```

use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use socket2::SockRef;
use tracing::{debug, trace};

use crate::config::ConnectionOptions;
use crate::error::{McError, Result};
use crate::frame::build_cpu_model_request;
use crate::response::{read_payload, read_response_header};

/// Default TCP port for MC protocol access (binary, TCP).
pub const DEFAULT_MC_PORT: u16 = 5007;

/// Default read/write timeout applied by [`PlcConnection::connect`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Size of the CPU model read response payload.
pub const CPU_MODEL_RESPONSE_SIZE: usize = 18;

const END_CODE_SIZE: usize = 2;

/// CPU model reported by the PLC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuModel {
    /// Model name with padding removed, e.g. `Q03UDVCPU`.
    pub name: String,
    /// Model code.
    pub code: u16,
}

impl CpuModel {
    /// Decodes the 18-byte CPU model payload.
    ///
    /// # Errors
    ///
    /// Returns `McError::InvalidResponse` if the payload has the wrong size or
    /// the name is not ASCII.
    pub fn from_bytes(payload: &[u8]) -> Result<Self> {
        if payload.len() != CPU_MODEL_RESPONSE_SIZE {
            return Err(McError::invalid_response(format!(
                "CPU model payload must be {} bytes, got {}",
                CPU_MODEL_RESPONSE_SIZE,
                payload.len()
            )));
        }

        let (name, code) = payload.split_at(16);
        if !name.is_ascii() {
            return Err(McError::invalid_response("CPU model name is not ASCII"));
        }
        let name = String::from_utf8_lossy(name)
            .trim_matches(|c: char| c == ' ' || c == '\0')
            .to_string();

        Ok(Self {
            name,
            code: u16::from_le_bytes([code[0], code[1]]),
        })
    }
}

/// A shared, serialized connection to one PLC.
pub struct PlcConnection<S = TcpStream> {
    stream: Mutex<S>,
    options: ConnectionOptions,
    closed: AtomicBool,
    // cloned socket handle so close() can interrupt a blocked read
    shutdown_handle: Option<TcpStream>,
}

impl<S: Read + Write> PlcConnection<S> {
    /// Wraps an already-open stream.
    pub fn new(stream: S, options: ConnectionOptions) -> Self {
        Self {
            stream: Mutex::new(stream),
            options,
            closed: AtomicBool::new(false),
            shutdown_handle: None,
        }
    }

    /// Returns the options used to build frames for this connection.
    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    /// Returns whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Sends one request frame and reads its response.
    ///
    /// The connection lock is held from the first byte written until the
    /// last response byte is read. `response_len` is the payload size the
    /// request implies; pass 0 for writes, which only carry an end code.
    ///
    /// # Errors
    ///
    /// - `McError::Io` if the connection is closed or the stream fails.
    /// - `McError::ShortRead` if the stream ends mid-frame.
    /// - `McError::ResponseLength` if the declared response length does not
    ///   match `response_len`; the stream is out of sync afterwards.
    /// - `McError::Protocol` if the PLC reports an error end code.
    pub fn send_command(&self, frame: &[u8], response_len: usize) -> Result<Vec<u8>> {
        if self.is_closed() {
            return Err(McError::Io(io::Error::new(
                ErrorKind::NotConnected,
                "connection closed",
            )));
        }

        let mut stream = self
            .stream
            .lock()
            .map_err(|_| McError::Io(io::Error::other("connection lock poisoned")))?;

        trace!("request: {:02X?}", frame);
        stream.write_all(frame)?;
        stream.flush()?;

        let header = read_response_header(&mut *stream)?;
        // declared length covers the end code plus the payload
        let declared = usize::from(header.data_length);
        if declared != END_CODE_SIZE + response_len {
            return Err(McError::ResponseLength {
                expected: response_len,
                received: declared.saturating_sub(END_CODE_SIZE),
            });
        }
        if response_len == 0 {
            return Ok(Vec::new());
        }
        read_payload(&mut *stream, response_len)
    }

    /// Reads the CPU model name and code.
    ///
    /// # Errors
    ///
    /// Any error from [`send_command`](Self::send_command), or
    /// `McError::InvalidResponse` if the payload cannot be decoded.
    pub fn read_cpu_model(&self) -> Result<CpuModel> {
        let frame = build_cpu_model_request(&self.options)?;
        let payload = self.send_command(&frame, CPU_MODEL_RESPONSE_SIZE)?;
        let model = CpuModel::from_bytes(&payload)?;
        debug!(name = %model.name, code = model.code, "read CPU model");
        Ok(model)
    }

    /// Closes the connection.
    ///
    /// Later requests fail with a `NotConnected` I/O error. For TCP
    /// connections the socket is shut down as well, which releases a read
    /// blocked on another thread with a fatal error.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        debug!("closing PLC connection");

        if let Some(handle) = &self.shutdown_handle {
            match handle.shutdown(Shutdown::Both) {
                Err(e) if e.kind() != ErrorKind::NotConnected => return Err(McError::Io(e)),
                _ => {}
            }
        }
        Ok(())
    }

    /// Consumes the connection and returns the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PlcConnection<TcpStream> {
    /// Connects to a PLC with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the address cannot be resolved or no address
    /// accepts the connection.
    pub fn connect<A: ToSocketAddrs>(addr: A, options: ConnectionOptions) -> Result<Self> {
        let mut last_err = None;
        for addr in addr.to_socket_addrs()? {
            match Self::connect_timeout(addr, options, DEFAULT_TIMEOUT) {
                Ok(conn) => return Ok(conn),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            McError::Io(io::Error::new(
                ErrorKind::InvalidInput,
                "address resolved to nothing",
            ))
        }))
    }

    /// Connects to a PLC, using `timeout` for connecting and for every
    /// subsequent read and write.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the connection or socket setup fails.
    pub fn connect_timeout(
        addr: SocketAddr,
        options: ConnectionOptions,
        timeout: Duration,
    ) -> Result<Self> {
        debug!(%addr, "connecting to PLC");
        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        Self::from_tcp_stream(stream, options)
    }

    /// Wraps a connected TCP stream, enabling `TCP_NODELAY` and keep-alive.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the socket cannot be configured or cloned.
    pub fn from_tcp_stream(stream: TcpStream, options: ConnectionOptions) -> Result<Self> {
        stream.set_nodelay(true)?;
        SockRef::from(&stream).set_keepalive(true)?;
        let handle = stream.try_clone()?;

        let mut conn = Self::new(stream, options);
        conn.shutdown_handle = Some(handle);
        Ok(conn)
    }

    /// Returns the PLC's socket address.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        match &self.shutdown_handle {
            Some(handle) => Ok(handle.peer_addr()?),
            None => Err(McError::Io(io::Error::from(ErrorKind::NotConnected))),
        }
    }
}

impl<S> std::fmt::Debug for PlcConnection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlcConnection")
            .field("options", &self.options)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .field(
                "peer_addr",
                &self.shutdown_handle.as_ref().and_then(|h| h.peer_addr().ok()),
            )
            .finish()
    }
}
