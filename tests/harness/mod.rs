//! Test harness utilities for driving the client without a network.
//!
//! [`MockTransport`] and [`ManualClock`] are cheap handles over shared state:
//! the client owns one clone, the test keeps another to script input and
//! inspect output.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use embedws::diagnostics::NoopSink;
use embedws::{
    Address, Clock, CloseFrame, Config, ConnectionConfig, Error, Transport, WebSocketClient,
};

pub const HANDSHAKE_OK: &[u8] = b"HTTP/1.1 101 Switching Protocols\r\n\
    Upgrade: websocket\r\n\
    Connection: Upgrade\r\n\
    \r\n";

pub type TestClient = WebSocketClient<MockTransport, ManualClock>;

/// Monotonic clock that only moves when told to or when slept on.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock().unwrap()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

type Responder = Box<dyn FnMut(&[u8]) -> Option<Vec<u8>> + Send>;

#[derive(Default)]
struct MockState {
    responder: Option<Responder>,
    refusals: usize,
    responses: VecDeque<Vec<u8>>,
    inbound: VecDeque<u8>,
    written: Vec<u8>,
    open: bool,
    connects: Vec<(Address, u16)>,
    connect_times: Vec<Duration>,
    closes: usize,
    hang_up_when_drained: bool,
}

/// Scripted [`Transport`].
///
/// Each successful connect loads the next queued response (usually a
/// handshake reply) as inbound data.
#[derive(Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    clock: ManualClock,
}

impl MockTransport {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            state: Arc::default(),
            clock,
        }
    }

    /// Fail the next `count` connect attempts.
    pub fn refuse_connects(&self, count: usize) {
        self.state.lock().unwrap().refusals += count;
    }

    /// Bytes delivered after the next successful connect.
    pub fn queue_response(&self, bytes: &[u8]) {
        self.state.lock().unwrap().responses.push_back(bytes.to_vec());
    }

    /// Answer writes: whatever `responder` returns becomes inbound data.
    pub fn respond_with<F>(&self, responder: F)
    where
        F: FnMut(&[u8]) -> Option<Vec<u8>> + Send + 'static,
    {
        self.state.lock().unwrap().responder = Some(Box::new(responder));
    }

    /// Bytes arriving on the current connection.
    pub fn push_inbound(&self, bytes: &[u8]) {
        self.state.lock().unwrap().inbound.extend(bytes.iter().copied());
    }

    /// The peer goes away.
    pub fn drop_connection(&self) {
        let mut state = self.state.lock().unwrap();
        state.open = false;
        state.inbound.clear();
    }

    /// The peer goes away once the pending inbound bytes have been read.
    pub fn hang_up_when_drained(&self) {
        self.state.lock().unwrap().hang_up_when_drained = true;
    }

    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.state.lock().unwrap().written)
    }

    pub fn inbound_len(&self) -> usize {
        self.state.lock().unwrap().inbound.len()
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().unwrap().open
    }

    pub fn connects(&self) -> Vec<(Address, u16)> {
        self.state.lock().unwrap().connects.clone()
    }

    pub fn connect_times(&self) -> Vec<Duration> {
        self.state.lock().unwrap().connect_times.clone()
    }

    pub fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }
}

impl Transport for MockTransport {
    fn connect(&mut self, address: &Address, port: u16) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.connects.push((address.clone(), port));
        state.connect_times.push(self.clock.now());
        state.inbound.clear();

        if state.refusals > 0 {
            state.refusals -= 1;
            state.open = false;
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            ));
        }

        state.open = true;
        if let Some(response) = state.responses.pop_front() {
            state.inbound.extend(response);
        }
        Ok(())
    }

    fn connected(&self) -> bool {
        self.state.lock().unwrap().open
    }

    fn available(&mut self) -> usize {
        self.state.lock().unwrap().inbound.len()
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        let mut state = self.state.lock().unwrap();
        let byte = state
            .inbound
            .pop_front()
            .ok_or_else(|| io::Error::from(io::ErrorKind::WouldBlock))?;
        if state.hang_up_when_drained && state.inbound.is_empty() {
            state.open = false;
        }
        Ok(byte)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.open {
            return Err(io::Error::from(io::ErrorKind::NotConnected));
        }
        state.written.extend_from_slice(data);
        if let Some(reply) = state.responder.as_mut().and_then(|respond| respond(data)) {
            state.inbound.extend(reply);
        }
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.state.lock().unwrap();
        if state.open {
            state.closes += 1;
        }
        state.open = false;
        state.inbound.clear();
    }
}

/// Everything the handlers observed, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Open,
    Message(String),
    Close(u16, String),
    Error(Error),
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

/// Record every handler invocation into the returned log.
pub fn record_events(client: &mut TestClient) -> EventLog {
    let log = EventLog::default();

    let events = log.clone();
    client.set_on_open(move |_session| events.lock().unwrap().push(Event::Open));
    let events = log.clone();
    client.set_on_message(move |_session, text| {
        events.lock().unwrap().push(Event::Message(text.to_string()));
    });
    let events = log.clone();
    client.set_on_close(move |frame: &CloseFrame| {
        events
            .lock()
            .unwrap()
            .push(Event::Close(frame.code.as_u16(), frame.reason.clone()));
    });
    let events = log.clone();
    client.set_on_error(move |err| events.lock().unwrap().push(Event::Error(err.clone())));

    log
}

pub fn drain(log: &EventLog) -> Vec<Event> {
    std::mem::take(&mut *log.lock().unwrap())
}

/// Client over a fresh mock transport and clock, with diagnostics silenced.
pub fn test_client(config: Config) -> (TestClient, MockTransport, ManualClock) {
    let clock = ManualClock::new();
    let transport = MockTransport::new(clock.clone());
    let mut client = WebSocketClient::with_clock(transport.clone(), clock.clone(), config);
    client.set_diagnostics(NoopSink);
    (client, transport, clock)
}

pub fn target() -> ConnectionConfig {
    ConnectionConfig::new("device.local", 8080).path("/ws")
}

/// Connect and complete the handshake in one poll.
pub fn open_client(config: Config) -> (TestClient, MockTransport, ManualClock, EventLog) {
    let (mut client, transport, clock) = test_client(config);
    let log = record_events(&mut client);
    transport.queue_response(HANDSHAKE_OK);
    client.connect(target());
    client.poll();
    assert_eq!(drain(&log), vec![Event::Open]);
    transport.take_written();
    (client, transport, clock, log)
}

/// Unmasked server frame with an arbitrary first header byte.
pub fn raw_frame(first: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![first];
    match payload.len() {
        len @ 0..=125 => out.push(len as u8),
        len @ 126..=0xFFFF => {
            out.push(126);
            out.extend_from_slice(&(len as u16).to_be_bytes());
        }
        len => {
            out.push(127);
            out.extend_from_slice(&(len as u64).to_be_bytes());
        }
    }
    out.extend_from_slice(payload);
    out
}
