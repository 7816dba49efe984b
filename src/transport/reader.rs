use std::time::Duration;

use crate::error::{Error, Result};
use crate::protocol::frame::ByteSource;
use crate::time::Clock;
use crate::transport::Transport;

/// Blocking [`ByteSource`] over a [`Transport`].
///
/// Waits for each byte by polling [`Transport::available`] and sleeping on the
/// clock between checks. With a deadline the wait fails with
/// `Error::ReadTimeout` once the clock passes it; without one it waits for as
/// long as the transport stays connected.
pub struct ByteReader<'a, T: ?Sized, C: ?Sized> {
    transport: &'a mut T,
    clock: &'a C,
    poll_interval: Duration,
    deadline: Option<Duration>,
}

impl<'a, T, C> ByteReader<'a, T, C>
where
    T: Transport + ?Sized,
    C: Clock + ?Sized,
{
    /// `timeout` is measured from now and covers every byte read through
    /// this reader.
    pub fn new(
        transport: &'a mut T,
        clock: &'a C,
        poll_interval: Duration,
        timeout: Option<Duration>,
    ) -> Self {
        let deadline = timeout.map(|t| clock.now() + t);
        Self {
            transport,
            clock,
            poll_interval,
            deadline,
        }
    }
}

impl<T, C> ByteSource for ByteReader<'_, T, C>
where
    T: Transport + ?Sized,
    C: Clock + ?Sized,
{
    fn next_byte(&mut self) -> Result<u8> {
        loop {
            if self.transport.available() > 0 {
                return self
                    .transport
                    .read_byte()
                    .map_err(|e| Error::TransportRead(e.to_string()));
            }
            if !self.transport.connected() {
                return Err(Error::TransportRead(
                    "connection closed mid-frame".into(),
                ));
            }
            if let Some(deadline) = self.deadline {
                if self.clock.now() >= deadline {
                    return Err(Error::ReadTimeout);
                }
            }
            self.clock.sleep(self.poll_interval);
        }
    }
}
