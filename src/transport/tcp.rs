use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use bytes::{Buf, BytesMut};

use crate::transport::{Address, Transport};

const READ_CHUNK: usize = 512;

/// [`Transport`] over a blocking [`TcpStream`].
///
/// `available()` briefly switches the socket to non-blocking mode and drains
/// whatever the kernel holds into an internal buffer. End of stream or a read
/// error marks the transport disconnected.
#[derive(Debug, Default)]
pub struct TcpTransport {
    stream: Option<TcpStream>,
    buffer: BytesMut,
    connect_timeout: Option<Duration>,
    open: bool,
}

impl TcpTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound each connect attempt.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    fn resolve(address: &Address, port: u16) -> io::Result<Vec<SocketAddr>> {
        match address {
            Address::Ip(ip) => Ok(vec![SocketAddr::new(*ip, port)]),
            Address::Host(host) => Ok((host.as_str(), port).to_socket_addrs()?.collect()),
        }
    }

    fn open_stream(&self, addr: &SocketAddr) -> io::Result<TcpStream> {
        match self.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(addr, timeout),
            None => TcpStream::connect(addr),
        }
    }

    fn fill(&mut self) {
        let Some(stream) = self.stream.as_mut() else {
            return;
        };
        if stream.set_nonblocking(true).is_err() {
            self.open = false;
            return;
        }

        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => {
                    self.open = false;
                    break;
                }
                Ok(n) => {
                    self.buffer.extend_from_slice(&chunk[..n]);
                    break;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(_) => {
                    self.open = false;
                    break;
                }
            }
        }

        if stream.set_nonblocking(false).is_err() {
            self.open = false;
        }
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self, address: &Address, port: u16) -> io::Result<()> {
        self.close();

        let mut last_err = io::Error::new(
            io::ErrorKind::NotFound,
            format!("{address} did not resolve to any address"),
        );
        for addr in Self::resolve(address, port)? {
            match self.open_stream(&addr) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    self.stream = Some(stream);
                    self.open = true;
                    return Ok(());
                }
                Err(e) => last_err = e,
            }
        }
        Err(last_err)
    }

    fn connected(&self) -> bool {
        self.open
    }

    fn available(&mut self) -> usize {
        if self.buffer.is_empty() && self.open {
            self.fill();
        }
        self.buffer.len()
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        if self.available() == 0 {
            return Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                "no data available",
            ));
        }
        Ok(self.buffer.get_u8())
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))?;
        let result = stream.write_all(data).and_then(|()| stream.flush());
        if result.is_err() {
            self.open = false;
        }
        result
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        self.buffer.clear();
        self.open = false;
    }
}
