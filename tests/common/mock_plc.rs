//! Mock MC protocol (3E binary) PLC for integration testing.
//!
//! Listens on a dynamically allocated localhost port, parses batch and
//! multiple-block read/write requests, and answers from an in-memory word
//! store. Faults are injected through [`MockBehavior`].

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const CMD_BATCH_READ: u16 = 0x0401;
const CMD_BATCH_WRITE: u16 = 0x1401;
const CMD_MULTI_READ: u16 = 0x0406;
const CMD_MULTI_WRITE: u16 = 0x1406;
const CMD_CPU_MODEL: u16 = 0x0101;

const END_UNSUPPORTED_COMMAND: u16 = 0xC059;

/// Model name reported by the mock.
pub const MOCK_CPU_NAME: &str = "Q03UDVCPU";
/// Model code reported by the mock.
pub const MOCK_CPU_CODE: u16 = 0x0366;

/// Configurable fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    /// Answer every request.
    Normal,
    /// Answer after a delay.
    DelayMs(u64),
    /// Answer every request with this end code and detail.
    EndCode(u16, [u8; 2]),
    /// Receive the request, then close the connection.
    DropConnection,
    /// Send a success header but only half of the payload, then close.
    TruncatePayload,
    /// Receive the request and never answer.
    Hang,
}

/// Word memory keyed by (device code, offset).
type Memory = Arc<Mutex<HashMap<(u8, u32), u16>>>;

/// Parsed device field.
#[derive(Debug, Clone, Copy)]
struct DeviceField {
    code: u8,
    offset: u32,
    count: u16,
}

/// Request body after the fixed header.
struct Request<'a> {
    command: u16,
    subcommand: u16,
    body: &'a [u8],
}

/// A mock MC protocol server.
pub struct MockPlc {
    local_addr: SocketAddr,
    stop_signal: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
    memory: Memory,
    behavior: Arc<Mutex<MockBehavior>>,
    requests: Arc<AtomicUsize>,
}

impl MockPlc {
    /// Starts a mock PLC on `127.0.0.1:0`.
    pub fn start(behavior: MockBehavior) -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let local_addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;

        let stop_signal = Arc::new(AtomicBool::new(false));
        let memory: Memory = Arc::new(Mutex::new(HashMap::new()));
        let behavior = Arc::new(Mutex::new(behavior));
        let requests = Arc::new(AtomicUsize::new(0));

        let shared = Shared {
            stop_signal: stop_signal.clone(),
            memory: memory.clone(),
            behavior: behavior.clone(),
            requests: requests.clone(),
        };
        let thread_handle = thread::spawn(move || server_loop(listener, shared));

        Ok(Self {
            local_addr,
            stop_signal,
            thread_handle: Some(thread_handle),
            memory,
            behavior,
            requests,
        })
    }

    /// Address the mock listens on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Changes the behavior for subsequent requests.
    pub fn set_behavior(&self, behavior: MockBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    /// Number of complete requests received so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Presets consecutive words starting at `offset`.
    pub fn set_words(&self, code: u8, offset: u32, words: &[u16]) {
        let mut memory = self.memory.lock().unwrap();
        for (i, word) in words.iter().enumerate() {
            memory.insert((code, offset + i as u32), *word);
        }
    }

    /// Reads consecutive words starting at `offset`; unset words are 0.
    pub fn words(&self, code: u8, offset: u32, count: usize) -> Vec<u16> {
        let memory = self.memory.lock().unwrap();
        (0..count as u32)
            .map(|i| memory.get(&(code, offset + i)).copied().unwrap_or(0))
            .collect()
    }
}

impl Drop for MockPlc {
    fn drop(&mut self) {
        self.stop_signal.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

#[derive(Clone)]
struct Shared {
    stop_signal: Arc<AtomicBool>,
    memory: Memory,
    behavior: Arc<Mutex<MockBehavior>>,
    requests: Arc<AtomicUsize>,
}

fn server_loop(listener: TcpListener, shared: Shared) {
    let mut workers = Vec::new();
    while !shared.stop_signal.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, _)) => {
                let shared = shared.clone();
                workers.push(thread::spawn(move || handle_connection(stream, shared)));
            }
            Err(_) => thread::sleep(Duration::from_millis(10)),
        }
    }
    for worker in workers {
        let _ = worker.join();
    }
}

/// Fills `buf`, polling the stop signal between read timeouts.
///
/// Returns false when the peer closed the connection or the mock is stopping.
fn read_exact_or_stop(stream: &mut TcpStream, buf: &mut [u8], stop: &AtomicBool) -> bool {
    let mut filled = 0;
    while filled < buf.len() {
        if stop.load(Ordering::SeqCst) {
            return false;
        }
        match stream.read(&mut buf[filled..]) {
            Ok(0) => return false,
            Ok(n) => filled += n,
            Err(ref e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) => {}
            Err(_) => return false,
        }
    }
    true
}

fn handle_connection(mut stream: TcpStream, shared: Shared) {
    let _ = stream.set_nonblocking(false);
    let _ = stream.set_read_timeout(Some(Duration::from_millis(50)));
    let _ = stream.set_nodelay(true);
    let stop = shared.stop_signal.as_ref();

    loop {
        let mut header = [0u8; 9];
        if !read_exact_or_stop(&mut stream, &mut header, stop) {
            return;
        }
        if header[..2] != [0x50, 0x00] {
            return;
        }
        let data_len = u16::from_le_bytes([header[7], header[8]]) as usize;
        let mut data = vec![0u8; data_len];
        if !read_exact_or_stop(&mut stream, &mut data, stop) || data_len < 6 {
            return;
        }
        shared.requests.fetch_add(1, Ordering::SeqCst);

        let route = [header[2], header[3], header[4], header[5], header[6]];
        let request = Request {
            command: u16::from_le_bytes([data[2], data[3]]),
            subcommand: u16::from_le_bytes([data[4], data[5]]),
            body: &data[6..],
        };

        let behavior = *shared.behavior.lock().unwrap();
        let response = match behavior {
            MockBehavior::Normal => process_request(&request, &shared.memory)
                .map_or_else(|code| error_frame(route, code, [0x00, 0x00]), |p| ok_frame(route, &p)),
            MockBehavior::DelayMs(ms) => {
                thread::sleep(Duration::from_millis(ms));
                process_request(&request, &shared.memory)
                    .map_or_else(|code| error_frame(route, code, [0x00, 0x00]), |p| ok_frame(route, &p))
            }
            MockBehavior::EndCode(code, detail) => error_frame(route, code, detail),
            MockBehavior::DropConnection => return,
            MockBehavior::TruncatePayload => {
                let payload = process_request(&request, &shared.memory).unwrap_or_default();
                let mut frame = ok_frame(route, &payload);
                frame.truncate(11 + payload.len() / 2);
                let _ = stream.write_all(&frame);
                return;
            }
            MockBehavior::Hang => {
                // hold the connection open until the client or the mock gives up
                let mut sink = [0u8; 1];
                while read_exact_or_stop(&mut stream, &mut sink, stop) {}
                return;
            }
        };

        if stream.write_all(&response).is_err() {
            return;
        }
    }
}

fn ok_frame(route: [u8; 5], payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![0xD0, 0x00];
    frame.extend_from_slice(&route);
    frame.extend_from_slice(&((2 + payload.len()) as u16).to_le_bytes());
    frame.extend_from_slice(&[0x00, 0x00]);
    frame.extend_from_slice(payload);
    frame
}

fn error_frame(route: [u8; 5], code: u16, detail: [u8; 2]) -> Vec<u8> {
    let mut frame = vec![0xD0, 0x00];
    frame.extend_from_slice(&route);
    frame.extend_from_slice(&4u16.to_le_bytes());
    frame.extend_from_slice(&code.to_le_bytes());
    frame.extend_from_slice(&detail);
    frame
}

/// Parses one device field plus count, advancing `body`.
fn take_field(body: &mut &[u8], subcommand: u16) -> Option<DeviceField> {
    let (offset, code, rest) = match subcommand {
        0x0000 if body.len() >= 6 => (
            u32::from_le_bytes([body[0], body[1], body[2], 0]),
            body[3],
            &body[4..],
        ),
        0x0002 if body.len() >= 8 => (
            u32::from_le_bytes([body[0], body[1], body[2], body[3]]),
            body[4],
            &body[6..],
        ),
        _ => return None,
    };
    let count = u16::from_le_bytes([rest[0], rest[1]]);
    *body = &rest[2..];
    Some(DeviceField {
        code,
        offset,
        count,
    })
}

fn read_field(field: DeviceField, memory: &HashMap<(u8, u32), u16>, out: &mut Vec<u8>) {
    for i in 0..u32::from(field.count) {
        let word = memory.get(&(field.code, field.offset + i)).copied().unwrap_or(0);
        out.extend_from_slice(&word.to_le_bytes());
    }
}

fn write_field(
    field: DeviceField,
    body: &mut &[u8],
    memory: &mut HashMap<(u8, u32), u16>,
) -> Option<()> {
    let len = usize::from(field.count) * 2;
    if body.len() < len {
        return None;
    }
    for (i, pair) in body[..len].chunks_exact(2).enumerate() {
        memory.insert(
            (field.code, field.offset + i as u32),
            u16::from_le_bytes([pair[0], pair[1]]),
        );
    }
    *body = &body[len..];
    Some(())
}

/// Executes a request; the error is the end code to answer with.
fn process_request(request: &Request<'_>, memory: &Memory) -> Result<Vec<u8>, u16> {
    let mut memory = memory.lock().unwrap();
    let mut body = request.body;
    let mut payload = Vec::new();

    match request.command {
        CMD_BATCH_READ => {
            let field = take_field(&mut body, request.subcommand).ok_or(END_UNSUPPORTED_COMMAND)?;
            read_field(field, &memory, &mut payload);
        }
        CMD_BATCH_WRITE => {
            let field = take_field(&mut body, request.subcommand).ok_or(END_UNSUPPORTED_COMMAND)?;
            write_field(field, &mut body, &mut memory).ok_or(END_UNSUPPORTED_COMMAND)?;
        }
        CMD_MULTI_READ | CMD_MULTI_WRITE => {
            if body.len() < 2 {
                return Err(END_UNSUPPORTED_COMMAND);
            }
            let blocks = usize::from(body[0]) + usize::from(body[1]);
            body = &body[2..];
            for _ in 0..blocks {
                let field =
                    take_field(&mut body, request.subcommand).ok_or(END_UNSUPPORTED_COMMAND)?;
                if request.command == CMD_MULTI_READ {
                    read_field(field, &memory, &mut payload);
                } else {
                    write_field(field, &mut body, &mut memory).ok_or(END_UNSUPPORTED_COMMAND)?;
                }
            }
        }
        CMD_CPU_MODEL => {
            let mut name = [b' '; 16];
            name[..MOCK_CPU_NAME.len()].copy_from_slice(MOCK_CPU_NAME.as_bytes());
            payload.extend_from_slice(&name);
            payload.extend_from_slice(&MOCK_CPU_CODE.to_le_bytes());
        }
        _ => return Err(END_UNSUPPORTED_COMMAND),
    }
    Ok(payload)
}
