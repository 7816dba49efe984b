//! Client connection management and state machine.
//!
//! [`WebSocketClient`] ties the pieces together: it paces connection attempts
//! with a [`RetryTimer`], runs the opening handshake, then decodes one frame
//! per [`poll`](WebSocketClient::poll) and dispatches completed messages to
//! the registered handlers.
//!
//! ## Connection Lifecycle
//!
//! 1. **Unconfigured** - Nothing to connect to yet
//! 2. **Idle** - Waiting for the retry timer
//! 3. **Handshaking** - Transport connect and HTTP upgrade in progress
//! 4. **Open** - Frames flow in both directions
//! 5. **Closed** - Stopped by `disconnect()` or a server close frame

mod client;
mod retry;
mod state;

pub use client::WebSocketClient;
pub use retry::RetryTimer;
pub use state::ConnectionState;
