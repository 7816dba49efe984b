//! Client connection lifecycle.

/// Where the client is in its connect / open / retry cycle.
///
/// ```text
/// Unconfigured --connect()--> Idle --retry due--> Handshaking --ok--> Open
///                              ^                       |               |
///                              +-------- failure ------+               |
///                              +------ peer drop, fatal error ---------+
/// Open --close frame--> Closed
/// any  --disconnect()--> Closed --connect()--> Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ConnectionState {
    /// No connection target has been given yet.
    #[default]
    Unconfigured,
    /// Not connected; waiting for the retry timer.
    Idle,
    /// Connect and handshake in progress.
    ///
    /// Only visible from inside `poll()`; a caller reading `state()` between
    /// polls never sees it.
    Handshaking,
    /// Handshake complete; frames are exchanged.
    Open,
    /// Closed by `disconnect()` or by the server. Polling does nothing.
    Closed,
}

impl ConnectionState {
    /// Check if sending data is allowed in this state.
    ///
    /// Returns `true` only for `Open` state.
    #[must_use]
    #[inline]
    pub const fn can_send(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    /// Whether `poll()` will ever attempt a connection from this state
    /// without another `connect()`.
    ///
    /// `Handshaking` is included for completeness only: `poll()` enters and
    /// leaves it within a single call, so callers never observe it.
    #[must_use]
    #[inline]
    pub const fn is_active(&self) -> bool {
        matches!(
            self,
            ConnectionState::Idle | ConnectionState::Handshaking | ConnectionState::Open
        )
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Unconfigured => write!(f, "Unconfigured"),
            ConnectionState::Idle => write!(f, "Idle"),
            ConnectionState::Handshaking => write!(f, "Handshaking"),
            ConnectionState::Open => write!(f, "Open"),
            ConnectionState::Closed => write!(f, "Closed"),
        }
    }
}
