//! WebSocket frame decoding and encoding (RFC 6455 section 5.2).
//!
//! Decoding pulls bytes one at a time from a [`ByteSource`], which lets the
//! same code run against a blocking transport or an in-memory buffer.

use bytes::BufMut;

use crate::config::Limits;
use crate::error::{Error, Result};
use crate::protocol::OpCode;
use crate::protocol::mask::{IDENTITY_MASK, apply_mask, apply_mask_fast};

/// Maximum payload size for control frames (RFC 6455).
pub const MAX_CONTROL_FRAME_PAYLOAD: usize = 125;

/// Smallest possible frame header: flags/opcode byte plus length byte.
pub const MIN_HEADER_LEN: usize = 2;

const FIN_BIT: u8 = 0x80;
const RSV1_BIT: u8 = 0x40;
const RSV2_BIT: u8 = 0x20;
const RSV3_BIT: u8 = 0x10;
const MASK_BIT: u8 = 0x80;
const LEN_MASK: u8 = 0x7F;
const LEN_16: u8 = 126;
const LEN_64: u8 = 127;
/// Payload bytes pulled from a source per read.
const READ_CHUNK: usize = 4096;

/// A source of frame bytes.
pub trait ByteSource {
    /// Return the next byte, waiting for it if necessary.
    ///
    /// # Errors
    ///
    /// Implementations fail when the byte can never arrive.
    fn next_byte(&mut self) -> Result<u8>;

    /// Fill `buf` completely.
    ///
    /// # Errors
    ///
    /// Propagates the first failure of [`ByteSource::next_byte`].
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        for slot in buf.iter_mut() {
            *slot = self.next_byte()?;
        }
        Ok(())
    }
}

/// [`ByteSource`] over an in-memory buffer.
#[derive(Debug, Clone)]
pub struct SliceSource<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    /// Start reading at the beginning of `buf`.
    #[must_use]
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes consumed so far.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}

impl ByteSource for SliceSource<'_> {
    fn next_byte(&mut self) -> Result<u8> {
        let byte = *self
            .buf
            .get(self.pos)
            .ok_or(Error::IncompleteFrame { needed: 1 })?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        if self.remaining() < buf.len() {
            return Err(Error::IncompleteFrame {
                needed: buf.len() - self.remaining(),
            });
        }
        buf.copy_from_slice(&self.buf[self.pos..self.pos + buf.len()]);
        self.pos += buf.len();
        Ok(())
    }
}

/// On-wire encoding of a payload length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadLength {
    /// 0-125, carried in the 7-bit field.
    Inline(u8),
    /// 126-65535, 7-bit field = 126 followed by 16 bits.
    Extended16(u16),
    /// Larger lengths, 7-bit field = 127 followed by 64 bits.
    Extended64(u64),
}

impl PayloadLength {
    /// Pick the shortest encoding for `len`.
    #[must_use]
    pub const fn for_len(len: u64) -> Self {
        if len <= MAX_CONTROL_FRAME_PAYLOAD as u64 {
            PayloadLength::Inline(len as u8)
        } else if len <= u16::MAX as u64 {
            PayloadLength::Extended16(len as u16)
        } else {
            PayloadLength::Extended64(len)
        }
    }

    /// The length value.
    #[must_use]
    pub const fn value(self) -> u64 {
        match self {
            PayloadLength::Inline(len) => len as u64,
            PayloadLength::Extended16(len) => len as u64,
            PayloadLength::Extended64(len) => len,
        }
    }

    /// Number of extended length bytes following the second header byte.
    #[must_use]
    pub const fn extended_len(self) -> usize {
        match self {
            PayloadLength::Inline(_) => 0,
            PayloadLength::Extended16(_) => 2,
            PayloadLength::Extended64(_) => 8,
        }
    }

    fn selector(self) -> u8 {
        match self {
            PayloadLength::Inline(len) => len,
            PayloadLength::Extended16(_) => LEN_16,
            PayloadLength::Extended64(_) => LEN_64,
        }
    }

    fn read_from<S: ByteSource + ?Sized>(selector: u8, src: &mut S) -> Result<Self> {
        match selector {
            LEN_16 => {
                let mut raw = [0u8; 2];
                src.read_exact(&mut raw)?;
                Ok(PayloadLength::Extended16(u16::from_be_bytes(raw)))
            }
            LEN_64 => {
                let mut raw = [0u8; 8];
                src.read_exact(&mut raw)?;
                Ok(PayloadLength::Extended64(u64::from_be_bytes(raw)))
            }
            inline => Ok(PayloadLength::Inline(inline)),
        }
    }
}

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Final fragment flag.
    pub fin: bool,
    /// Reserved bit 1.
    pub rsv1: bool,
    /// Reserved bit 2.
    pub rsv2: bool,
    /// Reserved bit 3.
    pub rsv3: bool,
    /// Frame opcode.
    pub opcode: OpCode,
    /// Masking key, if the mask bit was set.
    pub mask: Option<[u8; 4]>,
    /// Declared payload length.
    pub payload_len: PayloadLength,
}

impl FrameHeader {
    /// Read a complete header, including extended length and mask key.
    ///
    /// # Errors
    ///
    /// - `Error::ReservedOpcode` if the opcode is not defined by RFC 6455
    /// - any error of the underlying source
    pub fn read_from<S: ByteSource + ?Sized>(src: &mut S) -> Result<Self> {
        let byte0 = src.next_byte()?;
        let opcode = OpCode::from_header_byte(byte0)?;

        let byte1 = src.next_byte()?;
        let payload_len = PayloadLength::read_from(byte1 & LEN_MASK, src)?;

        let mask = if byte1 & MASK_BIT != 0 {
            let mut key = [0u8; 4];
            src.read_exact(&mut key)?;
            Some(key)
        } else {
            None
        };

        Ok(Self {
            fin: byte0 & FIN_BIT != 0,
            rsv1: byte0 & RSV1_BIT != 0,
            rsv2: byte0 & RSV2_BIT != 0,
            rsv3: byte0 & RSV3_BIT != 0,
            opcode,
            mask,
            payload_len,
        })
    }
}

/// A WebSocket frame as defined in RFC 6455.
///
/// ## Frame Structure
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
/// |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
/// |N|V|V|V|       |S|             |   (if payload len==126/127)   |
/// | |1|2|3|       |K|             |                               |
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |                         Masking key (if present)              |
/// +---------------------------------------------------------------+
/// |                     Payload data                              |
/// +---------------------------------------------------------------+
/// ```
///
/// The payload is always held unmasked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Final fragment flag. True if this is the last fragment of a message.
    pub fin: bool,
    /// Reserved bit 1. Must be 0 unless extension is negotiated.
    pub rsv1: bool,
    /// Reserved bit 2. Must be 0 unless extension is negotiated.
    pub rsv2: bool,
    /// Reserved bit 3. Must be 0 unless extension is negotiated.
    pub rsv3: bool,
    /// Frame opcode defining the interpretation of payload data.
    pub opcode: OpCode,
    payload: Vec<u8>,
}

impl Frame {
    /// Create a new frame with the given parameters.
    #[must_use]
    pub fn new(fin: bool, opcode: OpCode, payload: Vec<u8>) -> Self {
        Self {
            fin,
            rsv1: false,
            rsv2: false,
            rsv3: false,
            opcode,
            payload,
        }
    }

    /// Create a final text frame.
    #[must_use]
    pub fn text(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Text, data.into())
    }

    #[cfg(test)]
    pub(crate) fn ping(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Ping, data.into())
    }

    /// Get the payload bytes.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Read one complete frame from `src` and unmask its payload.
    ///
    /// The declared length is checked against `limits.max_frame_size`
    /// before anything is allocated, and the payload buffer only grows as
    /// bytes actually arrive.
    ///
    /// # Errors
    ///
    /// - `Error::ReservedOpcode` if the opcode is not defined by RFC 6455
    /// - `Error::FrameTooLarge` if the declared length exceeds the limit
    /// - any error of the underlying source
    pub fn read_from<S: ByteSource + ?Sized>(src: &mut S, limits: &Limits) -> Result<Self> {
        let header = FrameHeader::read_from(src)?;
        let declared = header.payload_len.value();
        limits.check_frame_size(declared)?;

        let len = usize::try_from(declared).map_err(|_| Error::FrameTooLarge {
            size: declared,
            max: limits.max_frame_size,
        })?;
        let mut payload = Vec::with_capacity(len.min(READ_CHUNK));
        let mut chunk = [0u8; READ_CHUNK];
        let mut remaining = len;
        while remaining > 0 {
            let n = remaining.min(READ_CHUNK);
            src.read_exact(&mut chunk[..n])?;
            payload.extend_from_slice(&chunk[..n]);
            remaining -= n;
        }
        apply_mask_fast(&mut payload, header.mask.unwrap_or(IDENTITY_MASK));

        Ok(Self::from_header(header, payload))
    }

    /// Parse a frame from a buffer.
    ///
    /// Returns the parsed frame and the number of bytes consumed.
    ///
    /// ## Errors
    ///
    /// - `Error::IncompleteFrame` if not enough data is available
    /// - `Error::ReservedOpcode` if a reserved opcode is used
    pub fn parse(buf: &[u8]) -> Result<(Self, usize)> {
        let mut src = SliceSource::new(buf);
        let header = FrameHeader::read_from(&mut src)?;
        let declared = header.payload_len.value();

        let remaining = src.remaining() as u64;
        if declared > remaining {
            let needed = usize::try_from(declared - remaining).unwrap_or(usize::MAX);
            return Err(Error::IncompleteFrame { needed });
        }

        // declared <= remaining, so it fits in usize
        let mut payload = vec![0u8; declared as usize];
        src.read_exact(&mut payload)?;
        apply_mask_fast(&mut payload, header.mask.unwrap_or(IDENTITY_MASK));

        Ok((Self::from_header(header, payload), src.position()))
    }

    fn from_header(header: FrameHeader, payload: Vec<u8>) -> Self {
        Self {
            fin: header.fin,
            rsv1: header.rsv1,
            rsv2: header.rsv2,
            rsv3: header.rsv3,
            opcode: header.opcode,
            payload,
        }
    }

    /// Validate the frame according to RFC 6455.
    ///
    /// # Errors
    ///
    /// - `Error::ReservedBitsSet` if RSV bits are set without extension
    /// - `Error::FragmentedControlFrame` if control frame has FIN=0
    /// - `Error::ControlFrameTooLarge` if control frame payload > 125 bytes
    pub fn validate(&self) -> Result<()> {
        if self.rsv1 || self.rsv2 || self.rsv3 {
            return Err(Error::ReservedBitsSet);
        }

        if self.opcode.is_control() {
            if !self.fin {
                return Err(Error::FragmentedControlFrame);
            }
            if self.payload.len() > MAX_CONTROL_FRAME_PAYLOAD {
                return Err(Error::ControlFrameTooLarge(self.payload.len()));
            }
        }

        Ok(())
    }

    /// Append the encoded frame to `out`.
    ///
    /// With a mask key the key is written ahead of the payload and every
    /// payload byte is XORed with `mask[i % 4]`.
    pub fn write(&self, out: &mut Vec<u8>, mask: Option<[u8; 4]>) {
        let payload_len = PayloadLength::for_len(self.payload.len() as u64);
        out.reserve(self.wire_size(mask.is_some()));

        let mut byte0 = self.opcode.as_u8();
        if self.fin {
            byte0 |= FIN_BIT;
        }
        if self.rsv1 {
            byte0 |= RSV1_BIT;
        }
        if self.rsv2 {
            byte0 |= RSV2_BIT;
        }
        if self.rsv3 {
            byte0 |= RSV3_BIT;
        }
        out.put_u8(byte0);

        let mut byte1 = payload_len.selector();
        if mask.is_some() {
            byte1 |= MASK_BIT;
        }
        out.put_u8(byte1);

        match payload_len {
            PayloadLength::Inline(_) => {}
            PayloadLength::Extended16(len) => out.put_u16(len),
            PayloadLength::Extended64(len) => out.put_u64(len),
        }

        let payload_start = match mask {
            Some(key) => {
                out.put_slice(&key);
                out.len()
            }
            None => out.len(),
        };
        out.put_slice(&self.payload);

        if let Some(key) = mask {
            apply_mask(&mut out[payload_start..], key);
        }
    }

    /// Encode into a fresh buffer.
    #[must_use]
    pub fn to_bytes(&self, mask: Option<[u8; 4]>) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.wire_size(mask.is_some()));
        self.write(&mut out, mask);
        out
    }

    /// Calculate the size needed to write this frame.
    #[must_use]
    pub fn wire_size(&self, masked: bool) -> usize {
        let extended = PayloadLength::for_len(self.payload.len() as u64).extended_len();
        let mask_size = if masked { 4 } else { 0 };
        MIN_HEADER_LEN + extended + mask_size + self.payload.len()
    }
}
