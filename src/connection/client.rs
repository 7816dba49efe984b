use crate::config::{Config, ConnectionConfig, HandshakeMode};
use crate::connection::{ConnectionState, RetryTimer};
use crate::diagnostics::{DiagnosticSink, Level, LogSink};
use crate::error::{Error, Result};
use crate::events::{Handlers, HeaderInspector, Session};
use crate::message::CloseFrame;
use crate::protocol::assembler::{AssembledMessage, MessageAssembler};
use crate::protocol::frame::MIN_HEADER_LEN;
use crate::protocol::handshake::{
    DEFAULT_KEY, HandshakeRequest, generate_key, read_handshake, send_handshake,
    wait_for_response,
};
use crate::protocol::{Frame, OpCode};
use crate::time::{Clock, SystemClock};
use crate::transport::{ByteReader, Transport};

/// Reply to a ping: an unmasked pong with an empty payload.
const EMPTY_PONG: [u8; 2] = [0x8A, 0x00];

/// Poll-driven WebSocket client.
///
/// The client owns its transport and clock and does nothing on its own: every
/// connection attempt, frame read and callback happens inside [`poll`].
/// While disconnected it retries at most once per
/// [`RetryPolicy::interval`](crate::config::RetryPolicy::interval), forever,
/// until [`disconnect`] is called.
///
/// ## Example
///
/// ```rust,no_run
/// use embedws::{ConnectionConfig, WebSocketClient};
/// use embedws::transport::TcpTransport;
///
/// let mut client = WebSocketClient::new(TcpTransport::new(), Default::default());
/// client.set_on_open(|session| {
///     let _ = session.send("hello");
/// });
/// client.set_on_message(|_session, text| println!("{text}"));
/// client.connect(ConnectionConfig::new("echo.example.com", 80).path("/ws"));
///
/// loop {
///     client.poll();
///     std::thread::sleep(std::time::Duration::from_millis(10));
/// }
/// ```
///
/// [`poll`]: WebSocketClient::poll
/// [`disconnect`]: WebSocketClient::disconnect
pub struct WebSocketClient<T, C = SystemClock> {
    transport: T,
    clock: C,
    config: Config,
    target: Option<ConnectionConfig>,
    state: ConnectionState,
    retry: RetryTimer,
    assembler: MessageAssembler,
    handlers: Handlers,
    diag: Box<dyn DiagnosticSink>,
}

impl<T: Transport> WebSocketClient<T, SystemClock> {
    /// Create a client on the system clock.
    pub fn new(transport: T, config: Config) -> Self {
        Self::with_clock(transport, SystemClock::new(), config)
    }
}

impl<T: Transport, C: Clock> WebSocketClient<T, C> {
    /// Create a client with an explicit clock.
    pub fn with_clock(transport: T, clock: C, config: Config) -> Self {
        Self {
            transport,
            clock,
            retry: RetryTimer::new(config.retry.interval),
            assembler: MessageAssembler::new(config.limits.clone()),
            config,
            target: None,
            state: ConnectionState::Unconfigured,
            handlers: Handlers::default(),
            diag: Box::new(LogSink),
        }
    }

    /// Store the connection target and make the first attempt due now.
    ///
    /// No socket is opened here; the next [`poll`](Self::poll) connects.
    /// Calling again replaces the target and restarts retry timing. An open
    /// connection is closed first.
    pub fn connect(&mut self, target: ConnectionConfig) {
        if self.transport.connected() {
            self.transport.close();
        }
        self.diag.emit(
            Level::Debug,
            format_args!("target {}:{}{}", target.host, target.port, target.path),
        );
        self.target = Some(target);
        self.assembler.reset();
        self.retry.arm_now(self.clock.now());
        self.set_state(ConnectionState::Idle);
    }

    /// Whether the transport reports an open connection.
    pub fn connected(&self) -> bool {
        self.transport.connected()
    }

    /// Close the transport and stop reconnecting.
    ///
    /// No close frame is sent. Polling does nothing until the next
    /// [`connect`](Self::connect).
    pub fn disconnect(&mut self) {
        self.transport.close();
        self.assembler.reset();
        self.set_state(ConnectionState::Closed);
    }

    /// Drive the client: connect when a retry is due, or read and act on at
    /// most one frame.
    ///
    /// Errors are reported through the on-error handler, never returned.
    pub fn poll(&mut self) {
        match self.state {
            ConnectionState::Unconfigured
            | ConnectionState::Handshaking
            | ConnectionState::Closed => {}
            ConnectionState::Idle => self.attempt_connection(),
            ConnectionState::Open => {
                if !self.transport.connected() {
                    self.diag
                        .emit(Level::Info, format_args!("connection dropped by peer"));
                    self.assembler.reset();
                    self.set_state(ConnectionState::Idle);
                    self.attempt_connection();
                } else if self.transport.available() >= MIN_HEADER_LEN {
                    self.read_frame();
                }
            }
        }
    }

    /// Alias of [`poll`](Self::poll).
    pub fn monitor(&mut self) {
        self.poll();
    }

    /// Send `text` as one masked text frame.
    ///
    /// # Errors
    ///
    /// - `Error::NotConnected` unless the client is open
    /// - `Error::MessageTooLarge` if `text` exceeds `limits.max_message_size`
    /// - `Error::Io` if the transport write fails
    pub fn send(&mut self, text: &str) -> Result<()> {
        if !self.state.can_send() {
            return Err(Error::NotConnected);
        }
        Session::new(&mut self.transport, &self.config.limits, self.diag.as_ref()).send(text)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Target given to the last [`connect`](Self::connect), if any.
    pub fn connection_config(&self) -> Option<&ConnectionConfig> {
        self.target.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn set_on_open<F>(&mut self, handler: F)
    where
        F: FnMut(&mut Session<'_>) + Send + 'static,
    {
        self.handlers.on_open = Some(Box::new(handler));
    }

    pub fn set_on_message<F>(&mut self, handler: F)
    where
        F: FnMut(&mut Session<'_>, &str) + Send + 'static,
    {
        self.handlers.on_message = Some(Box::new(handler));
    }

    pub fn set_on_close<F>(&mut self, handler: F)
    where
        F: FnMut(&CloseFrame) + Send + 'static,
    {
        self.handlers.on_close = Some(Box::new(handler));
    }

    pub fn set_on_error<F>(&mut self, handler: F)
    where
        F: FnMut(&Error) + Send + 'static,
    {
        self.handlers.on_error = Some(Box::new(handler));
    }

    /// Offer every handshake response line to `inspector`. An error fails
    /// the handshake.
    pub fn set_header_inspector<F>(&mut self, inspector: F)
    where
        F: FnMut(&str) -> Result<()> + Send + 'static,
    {
        let inspector: HeaderInspector = Box::new(inspector);
        self.handlers.header_inspector = Some(inspector);
    }

    /// Replace the diagnostic sink (default: [`LogSink`]).
    pub fn set_diagnostics(&mut self, sink: impl DiagnosticSink + 'static) {
        self.diag = Box::new(sink);
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            self.diag
                .emit(Level::Debug, format_args!("state {} -> {}", self.state, state));
            self.state = state;
        }
    }

    fn attempt_connection(&mut self) {
        let now = self.clock.now();
        if !self.retry.is_due(now) {
            return;
        }
        self.retry.rearm(now);
        self.set_state(ConnectionState::Handshaking);

        match self.open_connection() {
            Ok(()) => {
                self.set_state(ConnectionState::Open);
                let mut session =
                    Session::new(&mut self.transport, &self.config.limits, self.diag.as_ref());
                self.handlers.open(&mut session);
            }
            Err(err) => {
                self.report(&err);
                self.transport.close();
                self.set_state(ConnectionState::Idle);
            }
        }
    }

    fn open_connection(&mut self) -> Result<()> {
        let Some(target) = self.target.as_ref() else {
            return Err(Error::NotConnected);
        };

        self.diag.emit(
            Level::Info,
            format_args!("connecting to {}:{}", target.address, target.port),
        );
        self.transport
            .connect(&target.address, target.port)
            .map_err(|e| Error::TransportConnect(e.to_string()))?;

        let key = match self.config.handshake {
            HandshakeMode::Lenient => DEFAULT_KEY.to_string(),
            HandshakeMode::Strict => generate_key()?,
        };
        let mut request = HandshakeRequest::new(&target.path, &target.host, target.port);
        request.origin.clone_from(&self.config.origin);
        request.key = key;
        request.protocol.clone_from(&target.protocol);
        send_handshake(&mut self.transport, &request, self.diag.as_ref())?;

        let timeouts = &self.config.timeouts;
        wait_for_response(&mut self.transport, &self.clock, timeouts)?;

        let mut reader = ByteReader::new(
            &mut self.transport,
            &self.clock,
            timeouts.read_poll_interval,
            timeouts.read,
        );
        let response = read_handshake(
            &mut reader,
            &self.config.limits,
            self.handlers.header_inspector.as_mut(),
            self.diag.as_ref(),
        )?;

        if self.config.handshake == HandshakeMode::Strict {
            response.verify(&request.key)?;
        }
        self.diag.emit(
            Level::Info,
            format_args!("handshake complete: {}", response.status_line),
        );
        Ok(())
    }

    fn read_frame(&mut self) {
        let timeouts = &self.config.timeouts;
        let mut reader = ByteReader::new(
            &mut self.transport,
            &self.clock,
            timeouts.read_poll_interval,
            timeouts.read,
        );
        let frame = Frame::read_from(&mut reader, &self.config.limits)
            .and_then(|frame| frame.validate().map(|()| frame));

        match frame {
            Ok(frame) => self.handle_frame(frame),
            Err(err) => self.fail(err),
        }
    }

    fn handle_frame(&mut self, frame: Frame) {
        self.diag.emit(
            Level::Trace,
            format_args!(
                "frame {} fin={} len={}",
                frame.opcode,
                frame.fin,
                frame.payload().len()
            ),
        );

        match frame.opcode {
            OpCode::Ping => {
                self.diag.emit(Level::Debug, format_args!("ping, sending pong"));
                if let Err(err) = self.transport.write(&EMPTY_PONG) {
                    self.fail(err.into());
                }
            }
            OpCode::Pong => {
                self.diag.emit(Level::Debug, format_args!("pong"));
            }
            OpCode::Close => self.handle_close(frame.payload()),
            OpCode::Text | OpCode::Binary | OpCode::Continuation => {
                match self.assembler.push(frame) {
                    Ok(Some(message)) => self.dispatch(&message),
                    Ok(None) => {}
                    Err(err) => self.fail(err),
                }
            }
        }
    }

    fn dispatch(&mut self, message: &AssembledMessage) {
        match message.opcode {
            OpCode::Text => match message.as_text() {
                Ok(text) => {
                    let mut session = Session::new(
                        &mut self.transport,
                        &self.config.limits,
                        self.diag.as_ref(),
                    );
                    self.handlers.message(&mut session, text);
                }
                Err(err) => self.report(&err),
            },
            OpCode::Binary => {
                self.report(&Error::UnsupportedFeature(
                    "binary messages not supported".into(),
                ));
            }
            other => self.fail(Error::ProtocolViolation(format!(
                "Unexpected message opcode: {other}"
            ))),
        }
    }

    fn handle_close(&mut self, payload: &[u8]) {
        let close = match CloseFrame::from_payload(payload) {
            Ok(close) => close,
            Err(err) => return self.fail(err),
        };

        self.diag.emit(
            Level::Info,
            format_args!("server closed: {} {}", close.code.as_u16(), close.reason),
        );
        self.handlers.close(&close);
        self.assembler.reset();
        self.transport.close();

        if self.config.retry.reconnect_after_close {
            self.set_state(ConnectionState::Idle);
        } else {
            self.set_state(ConnectionState::Closed);
        }
    }

    /// Report without tearing the connection down.
    fn report(&mut self, err: &Error) {
        let level = if err.is_fatal() {
            Level::Error
        } else {
            Level::Warn
        };
        self.diag.emit(level, format_args!("{err}"));
        self.handlers.error(err);
    }

    /// Report, drop the connection and fall back to retrying.
    fn fail(&mut self, err: Error) {
        self.report(&err);
        self.assembler.reset();
        self.transport.close();
        self.set_state(ConnectionState::Idle);
    }
}

impl<T, C> std::fmt::Debug for WebSocketClient<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketClient")
            .field("state", &self.state)
            .field("target", &self.target)
            .field("retry", &self.retry)
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}
