//! Byte-stream transport consumed by the client.
//!
//! The engine never touches sockets directly. Everything it needs from the
//! network is expressed by [`Transport`]; [`TcpTransport`] is the stock
//! implementation over `std::net`.

mod reader;
mod tcp;

pub use reader::ByteReader;
pub use tcp::TcpTransport;

use std::fmt;
use std::io;
use std::net::IpAddr;

/// Connection target handed to [`Transport::connect`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    /// Host name, resolved by the transport.
    Host(String),
    /// Pre-resolved address.
    Ip(IpAddr),
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Host(host) => f.write_str(host),
            Address::Ip(ip) => write!(f, "{ip}"),
        }
    }
}

/// Bidirectional byte stream with a non-blocking availability query.
pub trait Transport {
    /// Open a connection, replacing any existing one.
    ///
    /// # Errors
    ///
    /// Returns the resolution or connect failure.
    fn connect(&mut self, address: &Address, port: u16) -> io::Result<()>;

    /// Whether the connection is believed to be open.
    fn connected(&self) -> bool;

    /// Number of bytes that can be read without blocking.
    fn available(&mut self) -> usize;

    /// Read one byte. Only called after [`Transport::available`] reported data.
    ///
    /// # Errors
    ///
    /// Returns an error when no byte could be produced.
    fn read_byte(&mut self) -> io::Result<u8>;

    /// Write all of `data`.
    ///
    /// # Errors
    ///
    /// Returns the underlying write failure.
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Close the connection. Safe to call when already closed.
    fn close(&mut self);
}
