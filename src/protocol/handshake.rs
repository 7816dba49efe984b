//! Opening handshake (RFC 6455 section 4.1).
//!
//! The request is a fixed HTTP/1.1 upgrade template. The response is read
//! line by line up to the blank line that ends the headers. By default
//! nothing in the response is checked: any line-terminated response counts as
//! a successful upgrade, and the server's `Sec-WebSocket-Accept` is never
//! verified. Such a connection must not be treated as authenticated.
//! [`HandshakeMode::Strict`](crate::config::HandshakeMode::Strict) sends a
//! fresh nonce and verifies the response with [`HandshakeResponse::verify`].

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use sha1::{Digest, Sha1};

use crate::config::{Limits, Timeouts};
use crate::diagnostics::{DiagnosticSink, Level};
use crate::error::{Error, Result};
use crate::events::HeaderInspector;
use crate::protocol::frame::ByteSource;
use crate::time::Clock;
use crate::transport::Transport;

/// The WebSocket GUID used in the Sec-WebSocket-Accept calculation (RFC 6455).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Placeholder `Sec-WebSocket-Key` sent in lenient mode.
pub const DEFAULT_KEY: &str = "1VTFj/CydlBCZDucDqw8eA==";

/// Default `Origin` header value.
pub const DEFAULT_ORIGIN: &str = "SparkWebSocketClient";

/// Protocol version sent in `Sec-WebSocket-Version`.
pub const WS_VERSION: u8 = 13;

/// Computes the Sec-WebSocket-Accept value from the client's Sec-WebSocket-Key.
///
/// The accept key is calculated as: Base64(SHA-1(key + GUID))
///
/// # Example
///
/// ```
/// use embedws::protocol::handshake::compute_accept_key;
///
/// let key = "dGhlIHNhbXBsZSBub25jZQ==";
/// let accept = compute_accept_key(key);
/// assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// Generate a random 16-byte nonce, base64 encoded.
///
/// # Errors
///
/// Returns `Error::Rng` if the random source is unavailable.
pub fn generate_key() -> Result<String> {
    let mut nonce = [0u8; 16];
    getrandom::getrandom(&mut nonce)?;
    Ok(BASE64.encode(nonce))
}

fn validate_header_value(header_name: &str, value: &str) -> Result<()> {
    if value.contains('\r') || value.contains('\n') {
        return Err(Error::InvalidHeaderValue {
            header: header_name.to_string(),
            reason: "contains CR or LF characters".to_string(),
        });
    }
    Ok(())
}

/// Client upgrade request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    /// Request path.
    pub path: String,
    /// Host name for the `Host` header.
    pub host: String,
    /// Port for the `Host` header.
    pub port: u16,
    /// `Origin` header value.
    pub origin: String,
    /// `Sec-WebSocket-Key` header value.
    pub key: String,
    /// Optional `Sec-WebSocket-Protocol` header value.
    pub protocol: Option<String>,
}

impl HandshakeRequest {
    /// Request with the placeholder key and default origin.
    #[must_use]
    pub fn new(path: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            path: path.into(),
            host: host.into(),
            port,
            origin: DEFAULT_ORIGIN.to_string(),
            key: DEFAULT_KEY.to_string(),
            protocol: None,
        }
    }

    /// Write the HTTP request to a buffer.
    ///
    /// # Errors
    /// Returns `Error::InvalidHeaderValue` if any substituted value contains CR/LF.
    pub fn write(&self, buf: &mut Vec<u8>) -> Result<()> {
        validate_header_value("Request-Path", &self.path)?;
        validate_header_value("Host", &self.host)?;
        validate_header_value("Origin", &self.origin)?;
        validate_header_value("Sec-WebSocket-Key", &self.key)?;

        buf.extend_from_slice(format!("GET {} HTTP/1.1\r\n", self.path).as_bytes());
        buf.extend_from_slice(b"Upgrade: websocket\r\n");
        buf.extend_from_slice(b"Connection: Upgrade\r\n");
        buf.extend_from_slice(format!("Host: {}:{}\r\n", self.host, self.port).as_bytes());
        buf.extend_from_slice(format!("Origin: {}\r\n", self.origin).as_bytes());
        buf.extend_from_slice(format!("Sec-WebSocket-Key: {}\r\n", self.key).as_bytes());
        buf.extend_from_slice(format!("Sec-WebSocket-Version: {WS_VERSION}\r\n").as_bytes());

        if let Some(ref proto) = self.protocol {
            validate_header_value("Sec-WebSocket-Protocol", proto)?;
            buf.extend_from_slice(format!("Sec-WebSocket-Protocol: {}\r\n", proto).as_bytes());
        }

        buf.extend_from_slice(b"\r\n");
        Ok(())
    }
}

/// Server response as read off the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandshakeResponse {
    /// First response line.
    pub status_line: String,
    /// Header lines split at the first colon, names and values trimmed.
    pub headers: Vec<(String, String)>,
}

impl HandshakeResponse {
    fn push_line(&mut self, line: String) {
        if self.status_line.is_empty() && self.headers.is_empty() {
            self.status_line = line;
        } else if let Some((name, value)) = line.split_once(':') {
            self.headers
                .push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    /// First header with the given name, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Check the response against the key that was sent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandshake`] if:
    /// - The status is not `101 Switching Protocols`.
    /// - The `Upgrade` header is missing or not `websocket`.
    /// - The `Connection` header is missing or does not contain `upgrade`.
    /// - `Sec-WebSocket-Accept` is missing or does not match `key`.
    pub fn verify(&self, key: &str) -> Result<()> {
        if !self.status_line.starts_with("HTTP/1.1 101") {
            return Err(Error::InvalidHandshake(format!(
                "Expected 101 status, got: {}",
                self.status_line
            )));
        }

        let upgrade = self
            .header("upgrade")
            .ok_or_else(|| Error::InvalidHandshake("Missing Upgrade header".into()))?;
        if !upgrade.eq_ignore_ascii_case("websocket") {
            return Err(Error::InvalidHandshake(format!(
                "Invalid Upgrade header: {}",
                upgrade
            )));
        }

        let connection = self
            .header("connection")
            .ok_or_else(|| Error::InvalidHandshake("Missing Connection header".into()))?;
        if !connection.to_ascii_lowercase().contains("upgrade") {
            return Err(Error::InvalidHandshake(format!(
                "Invalid Connection header: {}",
                connection
            )));
        }

        let accept = self.header("sec-websocket-accept").ok_or_else(|| {
            Error::InvalidHandshake("Missing Sec-WebSocket-Accept header".into())
        })?;
        if accept != compute_accept_key(key) {
            return Err(Error::InvalidHandshake(
                "Sec-WebSocket-Accept does not match the key sent".into(),
            ));
        }

        Ok(())
    }
}

/// Format `request` and write it to the transport in one write.
///
/// # Errors
///
/// Returns `Error::InvalidHeaderValue` for unsafe values or `Error::Io` if
/// the write fails.
pub fn send_handshake<T: Transport + ?Sized>(
    transport: &mut T,
    request: &HandshakeRequest,
    diag: &dyn DiagnosticSink,
) -> Result<()> {
    let mut buf = Vec::with_capacity(256);
    request.write(&mut buf)?;
    diag.emit(
        Level::Debug,
        format_args!("handshake request:\n{}", String::from_utf8_lossy(&buf)),
    );
    transport.write(&buf)?;
    Ok(())
}

/// Wait for the first response byte, checking availability
/// `timeouts.handshake_max_polls` times, `timeouts.handshake_poll_interval`
/// apart.
///
/// # Errors
///
/// Returns `Error::HandshakeTimeout` if nothing arrives.
pub fn wait_for_response<T, C>(transport: &mut T, clock: &C, timeouts: &Timeouts) -> Result<()>
where
    T: Transport + ?Sized,
    C: Clock + ?Sized,
{
    let mut attempts = 0;
    while transport.available() == 0 {
        if attempts >= timeouts.handshake_max_polls {
            return Err(Error::HandshakeTimeout { attempts });
        }
        attempts += 1;
        clock.sleep(timeouts.handshake_poll_interval);
    }
    Ok(())
}

/// Read response lines up to and including the blank line.
///
/// Each non-blank line is offered to `inspector`, which may reject the
/// handshake. Total bytes read are bounded by `limits.max_handshake_size`.
///
/// # Errors
///
/// - `Error::HandshakeTooLarge` if the response exceeds the limit
/// - any error returned by `inspector`
/// - any error of the underlying source
pub fn read_handshake<S: ByteSource + ?Sized>(
    src: &mut S,
    limits: &Limits,
    mut inspector: Option<&mut HeaderInspector>,
    diag: &dyn DiagnosticSink,
) -> Result<HandshakeResponse> {
    let mut response = HandshakeResponse::default();
    let mut consumed = 0usize;

    loop {
        let line = read_line(src, limits, &mut consumed)?;
        if line.is_empty() {
            diag.emit(Level::Debug, format_args!("[blank line]"));
            return Ok(response);
        }
        diag.emit(Level::Debug, format_args!("{line}"));

        if let Some(inspect) = inspector.as_mut() {
            inspect(&line)?;
        }
        response.push_line(line);
    }
}

/// Read one LF-terminated line, dropping CR characters.
fn read_line<S: ByteSource + ?Sized>(
    src: &mut S,
    limits: &Limits,
    consumed: &mut usize,
) -> Result<String> {
    let mut line = Vec::new();
    loop {
        let byte = src.next_byte()?;
        *consumed += 1;
        limits.check_handshake_size(*consumed)?;

        match byte {
            b'\n' => return Ok(String::from_utf8_lossy(&line).into_owned()),
            b'\r' => {}
            other => line.push(other),
        }
    }
}
