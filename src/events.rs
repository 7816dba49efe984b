//! Event handlers and the session handle passed to them.
//!
//! Handlers are optional boxed closures. They run synchronously inside
//! [`WebSocketClient::poll`](crate::WebSocketClient::poll), in the order the
//! triggering frames arrived.

use std::fmt;

use crate::config::Limits;
use crate::diagnostics::{DiagnosticSink, Level};
use crate::error::Result;
use crate::message::CloseFrame;
use crate::protocol::Frame;
use crate::protocol::mask::generate_mask;
use crate::transport::Transport;

/// Called once the handshake completes.
pub type OpenHandler = Box<dyn FnMut(&mut Session<'_>) + Send>;
/// Called with each complete text message.
pub type MessageHandler = Box<dyn FnMut(&mut Session<'_>, &str) + Send>;
/// Called when the server closes the connection.
pub type CloseHandler = Box<dyn FnMut(&CloseFrame) + Send>;
/// Called for every reported error.
pub type ErrorHandler = Box<dyn FnMut(&crate::Error) + Send>;
/// Sees every handshake response line; an error fails the handshake.
pub type HeaderInspector = Box<dyn FnMut(&str) -> Result<()> + Send>;

/// Handle to an open connection, lent to handlers so they can reply.
pub struct Session<'a> {
    transport: &'a mut dyn Transport,
    limits: &'a Limits,
    diag: &'a dyn DiagnosticSink,
}

impl<'a> Session<'a> {
    pub(crate) fn new(
        transport: &'a mut dyn Transport,
        limits: &'a Limits,
        diag: &'a dyn DiagnosticSink,
    ) -> Self {
        Self {
            transport,
            limits,
            diag,
        }
    }

    /// Send `text` as one unfragmented, masked text frame.
    ///
    /// # Errors
    ///
    /// - `Error::MessageTooLarge` if `text` exceeds `limits.max_message_size`
    /// - `Error::Rng` if no mask key could be generated
    /// - `Error::Io` if the transport write fails
    pub fn send(&mut self, text: &str) -> Result<()> {
        self.limits.check_message_size(text.len())?;

        let mask = generate_mask()?;
        self.diag.emit(
            Level::Trace,
            format_args!("send {} bytes, mask {:02x?}", text.len(), mask),
        );
        let bytes = Frame::text(text).to_bytes(Some(mask));
        self.transport.write(&bytes)?;
        Ok(())
    }
}

/// The four event slots plus the handshake inspection seam.
#[derive(Default)]
pub struct Handlers {
    pub on_open: Option<OpenHandler>,
    pub on_message: Option<MessageHandler>,
    pub on_close: Option<CloseHandler>,
    pub on_error: Option<ErrorHandler>,
    pub header_inspector: Option<HeaderInspector>,
}

impl Handlers {
    pub(crate) fn open(&mut self, session: &mut Session<'_>) {
        if let Some(handler) = self.on_open.as_mut() {
            handler(session);
        }
    }

    pub(crate) fn message(&mut self, session: &mut Session<'_>, text: &str) {
        if let Some(handler) = self.on_message.as_mut() {
            handler(session, text);
        }
    }

    pub(crate) fn close(&mut self, frame: &CloseFrame) {
        if let Some(handler) = self.on_close.as_mut() {
            handler(frame);
        }
    }

    pub(crate) fn error(&mut self, error: &crate::Error) {
        if let Some(handler) = self.on_error.as_mut() {
            handler(error);
        }
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("on_open", &self.on_open.is_some())
            .field("on_message", &self.on_message.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("header_inspector", &self.header_inspector.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    use crate::diagnostics::NoopSink;
    use crate::error::Error;
    use crate::message::CloseCode;
    use crate::transport::Address;

    #[derive(Default)]
    struct Sink {
        written: Vec<u8>,
    }

    impl Transport for Sink {
        fn connect(&mut self, _address: &Address, _port: u16) -> io::Result<()> {
            Ok(())
        }
        fn connected(&self) -> bool {
            true
        }
        fn available(&mut self) -> usize {
            0
        }
        fn read_byte(&mut self) -> io::Result<u8> {
            Err(io::ErrorKind::WouldBlock.into())
        }
        fn write(&mut self, data: &[u8]) -> io::Result<()> {
            self.written.extend_from_slice(data);
            Ok(())
        }
        fn close(&mut self) {}
    }

    #[test]
    fn test_session_send_writes_masked_text_frame() {
        let mut transport = Sink::default();
        let limits = Limits::default();
        let mut session = Session::new(&mut transport, &limits, &NoopSink);

        session.send("hi").unwrap();

        let (frame, len) = Frame::parse(&transport.written).unwrap();
        assert_eq!(len, transport.written.len());
        assert_eq!(transport.written[0], 0x81);
        assert_eq!(transport.written[1] & 0x80, 0x80);
        assert_eq!(frame.payload(), b"hi");
    }

    #[test]
    fn test_session_send_respects_message_limit() {
        let mut transport = Sink::default();
        let limits = Limits::new(16, 4, 1, 64);
        let mut session = Session::new(&mut transport, &limits, &NoopSink);

        assert_eq!(
            session.send("too long"),
            Err(Error::MessageTooLarge { size: 8, max: 4 })
        );
        assert!(transport.written.is_empty());
    }

    #[test]
    fn test_unset_handlers_are_skipped() {
        let mut handlers = Handlers::default();
        handlers.close(&CloseFrame::new(CloseCode::Normal, ""));
        handlers.error(&Error::ReadTimeout);
    }

    #[test]
    fn test_handlers_invoked() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut handlers = Handlers::default();

        let log = seen.clone();
        handlers.on_close = Some(Box::new(move |frame: &CloseFrame| {
            log.lock().unwrap().push(format!("close {}", frame.code.as_u16()));
        }));
        let log = seen.clone();
        handlers.on_error = Some(Box::new(move |err: &Error| {
            log.lock().unwrap().push(format!("error {err}"));
        }));

        handlers.close(&CloseFrame::new(CloseCode::GoingAway, "restart"));
        handlers.error(&Error::NotConnected);

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["close 1001".to_string(), "error Not connected".to_string()]
        );
        assert_eq!(
            format!("{handlers:?}"),
            "Handlers { on_open: false, on_message: false, on_close: true, on_error: true, header_inspector: false }"
        );
    }
}
