//! Message reassembly from fragmented data frames (RFC 6455 section 5.4).

use bytes::{Bytes, BytesMut};

use crate::config::Limits;
use crate::error::{Error, Result};
use crate::protocol::{Frame, OpCode};

/// Reassembles fragmented WebSocket messages.
///
/// Holds at most one in-progress message. The opcode of its first fragment
/// is remembered until the final fragment arrives; while it is set, only
/// continuation frames are accepted.
#[derive(Debug)]
pub struct MessageAssembler {
    buffer: BytesMut,
    fragment_count: usize,
    opcode: Option<OpCode>,
    limits: Limits,
}

impl MessageAssembler {
    pub fn new(limits: Limits) -> Self {
        Self {
            buffer: BytesMut::new(),
            fragment_count: 0,
            opcode: None,
            limits,
        }
    }

    /// Add a data frame to the message being assembled.
    /// Returns Some(complete_message) when FIN=1, None otherwise.
    ///
    /// Control frames are ignored; they never belong to a message.
    ///
    /// # Errors
    ///
    /// - `Error::ProtocolViolation` for a continuation with no message in
    ///   progress, or a new message before the previous one finished
    /// - `Error::MessageTooLarge` / `Error::TooManyFragments` when a limit is hit
    ///
    /// The in-progress message is left untouched on error; callers reset.
    pub fn push(&mut self, frame: Frame) -> Result<Option<AssembledMessage>> {
        if frame.opcode.is_control() {
            return Ok(None);
        }

        let opcode = match (frame.opcode, self.opcode) {
            (OpCode::Continuation, None) => {
                return Err(Error::ProtocolViolation(
                    "Received a continuation frame with no message in progress".into(),
                ));
            }
            (OpCode::Continuation, Some(first)) => first,
            (_, Some(_)) => {
                return Err(Error::ProtocolViolation(
                    "Expected continuation frame".into(),
                ));
            }
            (first, None) => first,
        };

        self.limits
            .check_fragment_count(self.fragment_count + 1)?;
        self.limits
            .check_message_size(self.buffer.len() + frame.payload().len())?;

        self.opcode = Some(opcode);
        self.buffer.extend_from_slice(frame.payload());
        self.fragment_count += 1;

        if frame.fin {
            let payload = self.buffer.split().freeze();
            self.reset();
            Ok(Some(AssembledMessage { opcode, payload }))
        } else {
            Ok(None)
        }
    }

    /// Whether a continuation frame is expected next.
    pub fn is_assembling(&self) -> bool {
        self.opcode.is_some()
    }

    /// Bytes buffered for the in-progress message.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Discard any in-progress message.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.fragment_count = 0;
        self.opcode = None;
    }
}

/// A fully assembled WebSocket message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledMessage {
    /// Opcode of the first fragment.
    pub opcode: OpCode,
    pub payload: Bytes,
}

impl AssembledMessage {
    /// Borrow the payload as text.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUtf8` if the payload is not UTF-8.
    pub fn as_text(&self) -> Result<&str> {
        Ok(std::str::from_utf8(&self.payload)?)
    }
}
