//! Error types for the WebSocket client engine.
//!
//! Every failure the engine can hit while polling is reported through the
//! on-error handler as one of these values; `send` returns them directly.

use thiserror::Error;

/// Result type alias for WebSocket operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during WebSocket operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The transport could not open a connection to the target.
    #[error("Transport connect failure: {0}")]
    TransportConnect(String),

    /// No handshake response arrived within the bounded wait.
    #[error("Handshake timeout after {attempts} polls")]
    HandshakeTimeout {
        /// Number of availability polls performed.
        attempts: u32,
    },

    /// Invalid or rejected WebSocket handshake.
    #[error("Handshake failure: {0}")]
    InvalidHandshake(String),

    /// Handshake response exceeds the configured maximum.
    #[error("Handshake too large: {size} bytes (max: {max})")]
    HandshakeTooLarge {
        /// Bytes received so far.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Header value contains characters that would corrupt the request.
    #[error("Invalid value for header {header}: {reason}")]
    InvalidHeaderValue {
        /// Header name.
        header: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Protocol violation detected.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Feature the client deliberately does not implement.
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// Invalid UTF-8 in text message.
    #[error("Invalid UTF-8 in text message")]
    InvalidUtf8,

    /// Frame size exceeds configured maximum.
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge {
        /// Declared frame size.
        size: u64,
        /// Maximum allowed size.
        max: usize,
    },

    /// Message size exceeds configured maximum.
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge {
        /// Actual message size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Too many fragments in a single message.
    #[error("Too many fragments: {count} (max: {max})")]
    TooManyFragments {
        /// Actual fragment count.
        count: usize,
        /// Maximum allowed fragments.
        max: usize,
    },

    /// Reserved opcode used.
    #[error("Unexpected opcode: {0:#x}")]
    ReservedOpcode(u8),

    /// Control frame fragmented (RFC violation).
    #[error("Control frames cannot be fragmented")]
    FragmentedControlFrame,

    /// Control frame payload too large (>125 bytes).
    #[error("Control frame payload too large: {0} bytes (max: 125)")]
    ControlFrameTooLarge(usize),

    /// Reserved bits set without extension.
    #[error("Reserved bits set without negotiated extension")]
    ReservedBitsSet,

    /// Incomplete frame data.
    #[error("Incomplete frame: need {needed} more bytes")]
    IncompleteFrame {
        /// Number of additional bytes needed.
        needed: usize,
    },

    /// The transport failed where an octet was expected.
    #[error("Transport read fault: {0}")]
    TransportRead(String),

    /// A started frame or handshake response did not complete in time.
    #[error("Read timed out before the frame completed")]
    ReadTimeout,

    /// Writing to the transport failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// The connection is not open.
    #[error("Not connected")]
    NotConnected,

    /// The system random source failed.
    #[error("Random source failure: {0}")]
    Rng(String),
}

impl Error {
    /// Whether this error tears down the current connection.
    ///
    /// Non-fatal errors drop the offending message and leave the
    /// connection open.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Error::UnsupportedFeature(_) | Error::InvalidUtf8)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(_: std::str::Utf8Error) -> Self {
        Error::InvalidUtf8
    }
}

impl From<getrandom::Error> for Error {
    fn from(err: getrandom::Error) -> Self {
        Error::Rng(err.to_string())
    }
}
