//! # embedws - Poll-driven WebSocket client for small devices
//!
//! `embedws` is an RFC 6455 WebSocket client built around a single
//! cooperative [`poll`](WebSocketClient::poll) loop. It never spawns threads
//! or touches sockets directly: the network is a [`Transport`], time is a
//! [`Clock`], and everything the client has to say goes through a
//! [`DiagnosticSink`](diagnostics::DiagnosticSink).
//!
//! ## Features
//!
//! - **Automatic reconnection** at a fixed interval until `disconnect()`
//! - **Fragmented message reassembly** with interleaved control frames
//! - **Bounded resources** through [`Limits`] on frames, messages and handshakes
//! - **Optional strict handshake** with nonce generation and accept-key checks
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use embedws::{Config, ConnectionConfig, WebSocketClient};
//! use embedws::transport::TcpTransport;
//!
//! let mut client = WebSocketClient::new(TcpTransport::new(), Config::embedded());
//! client.set_on_message(|session, text| {
//!     let _ = session.send(text);
//! });
//! client.set_on_error(|err| eprintln!("websocket error: {err}"));
//! client.connect(ConnectionConfig::new("192.168.1.20", 8080).path("/device"));
//!
//! loop {
//!     client.poll();
//! }
//! ```
//!
//! ## Security
//!
//! The default handshake sends a fixed `Sec-WebSocket-Key` and accepts any
//! response that ends in a blank line. Use
//! [`HandshakeMode::Strict`](config::HandshakeMode::Strict) when the server
//! must prove it speaks WebSocket. There is no TLS.

pub mod config;
pub mod connection;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod message;
pub mod protocol;
pub mod time;
pub mod transport;

pub use config::{Config, ConnectionConfig, HandshakeMode, Limits, RetryPolicy, Timeouts};
pub use connection::{ConnectionState, WebSocketClient};
pub use error::{Error, Result};
pub use events::Session;
pub use message::{CloseCode, CloseFrame};
pub use protocol::{Frame, OpCode, compute_accept_key};
pub use time::{Clock, SystemClock};
pub use transport::{Address, Transport};
