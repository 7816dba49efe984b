//! Configuration and limits for the WebSocket client.

use std::net::IpAddr;
use std::time::Duration;

use crate::protocol::handshake::DEFAULT_ORIGIN;
use crate::transport::Address;

/// Resource limits for a connection.
///
/// These bound every allocation the engine makes on behalf of the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum payload size of a single incoming frame in bytes.
    ///
    /// Checked against the declared length before anything is allocated.
    ///
    /// Default: 1 MB
    pub max_frame_size: usize,

    /// Maximum size of a complete message in bytes.
    ///
    /// This applies to the total size after reassembling all fragments, and
    /// to outgoing messages.
    ///
    /// Default: 4 MB
    pub max_message_size: usize,

    /// Maximum number of fragments in a single message.
    ///
    /// Default: 128
    pub max_fragment_count: usize,

    /// Maximum size of the handshake response in bytes.
    ///
    /// Default: 8 KB (8192)
    pub max_handshake_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_frame_size: 1024 * 1024,       // 1 MB
            max_message_size: 4 * 1024 * 1024, // 4 MB
            max_fragment_count: 128,
            max_handshake_size: 8192,
        }
    }
}

impl Limits {
    /// Create new limits with custom values.
    #[must_use]
    pub const fn new(
        max_frame_size: usize,
        max_message_size: usize,
        max_fragment_count: usize,
        max_handshake_size: usize,
    ) -> Self {
        Self {
            max_frame_size,
            max_message_size,
            max_fragment_count,
            max_handshake_size,
        }
    }

    /// Create limits suitable for small embedded systems.
    ///
    /// - Max frame: 16 KB
    /// - Max message: 64 KB
    /// - Max fragments: 16
    /// - Max handshake: 2 KB
    #[must_use]
    pub const fn embedded() -> Self {
        Self {
            max_frame_size: 16 * 1024,
            max_message_size: 64 * 1024,
            max_fragment_count: 16,
            max_handshake_size: 2048,
        }
    }

    /// Validate that message size is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageTooLarge`](crate::Error::MessageTooLarge) if `size` exceeds the configured maximum.
    pub const fn check_message_size(&self, size: usize) -> Result<(), crate::Error> {
        if size > self.max_message_size {
            Err(crate::Error::MessageTooLarge {
                size,
                max: self.max_message_size,
            })
        } else {
            Ok(())
        }
    }

    /// Validate a declared frame length.
    ///
    /// Takes the raw wire length so that 64-bit lengths are checked before
    /// they are narrowed to `usize`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FrameTooLarge`](crate::Error::FrameTooLarge) if `size` exceeds the configured maximum.
    pub const fn check_frame_size(&self, size: u64) -> Result<(), crate::Error> {
        if size > self.max_frame_size as u64 {
            Err(crate::Error::FrameTooLarge {
                size,
                max: self.max_frame_size,
            })
        } else {
            Ok(())
        }
    }

    /// Validate that fragment count is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooManyFragments`](crate::Error::TooManyFragments) if `count` exceeds the configured maximum.
    pub const fn check_fragment_count(&self, count: usize) -> Result<(), crate::Error> {
        if count > self.max_fragment_count {
            Err(crate::Error::TooManyFragments {
                count,
                max: self.max_fragment_count,
            })
        } else {
            Ok(())
        }
    }

    /// Validate that handshake size is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandshakeTooLarge`](crate::Error::HandshakeTooLarge) if `size` exceeds the configured maximum.
    pub const fn check_handshake_size(&self, size: usize) -> Result<(), crate::Error> {
        if size > self.max_handshake_size {
            Err(crate::Error::HandshakeTooLarge {
                size,
                max: self.max_handshake_size,
            })
        } else {
            Ok(())
        }
    }
}

/// Timing configuration for blocking waits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeouts {
    /// Delay between availability checks while waiting for the first byte of
    /// the handshake response.
    ///
    /// Default: 50 ms
    pub handshake_poll_interval: Duration,

    /// Number of availability checks before the handshake times out.
    ///
    /// Default: 300 (about 15 seconds with the default interval)
    pub handshake_max_polls: u32,

    /// Delay between availability checks while a started frame or response
    /// line is still arriving.
    ///
    /// Default: 1 ms
    pub read_poll_interval: Duration,

    /// Maximum wait for a started frame or handshake response to complete.
    ///
    /// `None` waits indefinitely.
    /// Default: None
    pub read: Option<Duration>,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            handshake_poll_interval: Duration::from_millis(50),
            handshake_max_polls: 300,
            read_poll_interval: Duration::from_millis(1),
            read: None,
        }
    }
}

/// Reconnection policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Minimum delay between two connection attempts.
    ///
    /// Default: 3000 ms
    pub interval: Duration,

    /// Schedule a reconnect after the server sends a close frame instead of
    /// staying closed.
    ///
    /// Default: false
    pub reconnect_after_close: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(3000),
            reconnect_after_close: false,
        }
    }
}

/// How the opening handshake is performed and checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HandshakeMode {
    /// Fixed `Sec-WebSocket-Key`; any response ending in a blank line is
    /// accepted.
    ///
    /// The server's accept key is never verified in this mode.
    #[default]
    Lenient,
    /// Fresh nonce per attempt; status line, upgrade headers and
    /// `Sec-WebSocket-Accept` are verified.
    Strict,
}

/// WebSocket client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Resource limits.
    pub limits: Limits,

    /// Timing configuration.
    pub timeouts: Timeouts,

    /// Reconnection policy.
    pub retry: RetryPolicy,

    /// Handshake validation mode.
    ///
    /// Default: [`HandshakeMode::Lenient`]
    pub handshake: HandshakeMode,

    /// Value of the `Origin` request header.
    ///
    /// Default: `SparkWebSocketClient`
    pub origin: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            timeouts: Timeouts::default(),
            retry: RetryPolicy::default(),
            handshake: HandshakeMode::default(),
            origin: DEFAULT_ORIGIN.to_string(),
        }
    }
}

impl Config {
    /// Create a new configuration with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom limits.
    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set timeout configuration.
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Bound the wait for a started frame or handshake response.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.read = Some(timeout);
        self
    }

    /// Set the delay between connection attempts.
    #[must_use]
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry.interval = interval;
        self
    }

    /// Reconnect after a server close frame.
    #[must_use]
    pub fn with_reconnect_after_close(mut self, reconnect: bool) -> Self {
        self.retry.reconnect_after_close = reconnect;
        self
    }

    /// Set the handshake mode.
    #[must_use]
    pub fn with_handshake_mode(mut self, mode: HandshakeMode) -> Self {
        self.handshake = mode;
        self
    }

    /// Set the `Origin` header value.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Configuration for small devices: embedded limits and a bounded read.
    #[must_use]
    pub fn embedded() -> Self {
        Self {
            limits: Limits::embedded(),
            ..Default::default()
        }
        .with_read_timeout(Duration::from_secs(10))
    }
}

/// Where and how to connect. Captured by `connect()` and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Address handed to the transport.
    pub address: Address,
    /// Host name sent in the `Host` header.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Request path.
    pub path: String,
    /// Protocol token sent as `Sec-WebSocket-Protocol`, if any.
    pub protocol: Option<String>,
}

impl ConnectionConfig {
    /// Target a host name; the transport resolves it.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        Self {
            address: Address::Host(host.clone()),
            host,
            port,
            path: "/".to_string(),
            protocol: None,
        }
    }

    /// Target a pre-resolved address, still sending `host` in the `Host` header.
    #[must_use]
    pub fn with_ip(ip: IpAddr, host: impl Into<String>, port: u16) -> Self {
        Self {
            address: Address::Ip(ip),
            host: host.into(),
            port,
            path: "/".to_string(),
            protocol: None,
        }
    }

    /// Set the request path.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the protocol token.
    #[must_use]
    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }
}
