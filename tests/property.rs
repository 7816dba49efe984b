//! Property-based tests for the frame codec and reassembler.
//!
//! These tests use proptest to fuzz frame encoding, decoding and reassembly.

use embedws::config::Limits;
use embedws::diagnostics::NoopSink;
use embedws::protocol::frame::PayloadLength;
use embedws::protocol::handshake::read_handshake;
use embedws::protocol::{
    Frame, MessageAssembler, OpCode, SliceSource, apply_mask, apply_mask_fast,
};
use proptest::prelude::*;

fn control_opcode_strategy() -> impl Strategy<Value = OpCode> {
    prop_oneof![Just(OpCode::Close), Just(OpCode::Ping), Just(OpCode::Pong)]
}

fn encode(frame: &Frame, mask: Option<[u8; 4]>) -> Vec<u8> {
    let mut buf = Vec::new();
    frame.write(&mut buf, mask);
    buf
}

proptest! {
    // =========================================================================
    // Property 1: Short text messages survive a masked encode/decode
    // =========================================================================
    #[test]
    fn test_short_text_roundtrip(
        text in "\\PC{0,40}",
        mask in any::<[u8; 4]>()
    ) {
        prop_assume!(text.len() <= 125);
        let buf = encode(&Frame::text(text.clone()), Some(mask));
        prop_assert_eq!(buf.len(), 2 + 4 + text.len());

        let (parsed, consumed) = Frame::parse(&buf).unwrap();
        prop_assert_eq!(consumed, buf.len());
        prop_assert!(parsed.fin);
        prop_assert_eq!(parsed.opcode, OpCode::Text);
        prop_assert_eq!(parsed.payload(), text.as_bytes());
    }

    // =========================================================================
    // Property 2: The length form follows the payload size
    // =========================================================================
    #[test]
    fn test_length_form_selection(len in 0u64..200_000) {
        let form = PayloadLength::for_len(len);
        match len {
            0..=125 => {
                prop_assert_eq!(form, PayloadLength::Inline(len as u8));
            }
            126..=65535 => {
                prop_assert_eq!(form, PayloadLength::Extended16(len as u16));
            }
            _ => {
                prop_assert_eq!(form, PayloadLength::Extended64(len));
            }
        }
        prop_assert_eq!(form.value(), len);
    }

    #[test]
    fn test_encoded_header_matches_length_form(
        payload in prop::collection::vec(any::<u8>(), 0..70_000)
    ) {
        let buf = encode(&Frame::new(true, OpCode::Binary, payload.clone()), None);
        let (selector, header_len) = match payload.len() {
            0..=125 => (payload.len() as u8, 2),
            126..=65535 => (126, 4),
            _ => (127, 10),
        };
        prop_assert_eq!(buf[1], selector);
        prop_assert_eq!(buf.len(), header_len + payload.len());

        let (parsed, _) = Frame::parse(&buf).unwrap();
        prop_assert_eq!(parsed.payload().len(), payload.len());
    }

    // =========================================================================
    // Property 3: Masking is reversible (XOR is self-inverse)
    // =========================================================================
    #[test]
    fn test_mask_reversible(
        data in prop::collection::vec(any::<u8>(), 0..2000),
        mask in any::<[u8; 4]>()
    ) {
        let mut masked = data.clone();
        apply_mask(&mut masked, mask);
        apply_mask(&mut masked, mask);
        prop_assert_eq!(data, masked);
    }

    #[test]
    fn test_fast_mask_matches_bytewise(
        data in prop::collection::vec(any::<u8>(), 0..300),
        mask in any::<[u8; 4]>()
    ) {
        let mut slow = data.clone();
        let mut fast = data;
        apply_mask(&mut slow, mask);
        apply_mask_fast(&mut fast, mask);
        prop_assert_eq!(slow, fast);
    }

    // =========================================================================
    // Property 4: Control frame size limit
    // =========================================================================
    #[test]
    fn test_control_frame_size_limit(
        opcode in control_opcode_strategy(),
        len in 0usize..256
    ) {
        let frame = Frame::new(true, opcode, vec![0x5A; len]);
        prop_assert_eq!(frame.validate().is_ok(), len <= 125);
    }

    // =========================================================================
    // Property 5: Truncated input is reported, never misparsed
    // =========================================================================
    #[test]
    fn test_incomplete_frame_detection(
        payload in prop::collection::vec(any::<u8>(), 1..500),
        masked in any::<bool>(),
        truncate_by in 1..50usize
    ) {
        let mask = masked.then_some([0x12, 0x34, 0x56, 0x78]);
        let buf = encode(&Frame::text(payload), mask);
        let truncated_len = buf.len().saturating_sub(truncate_by);
        prop_assert!(Frame::parse(&buf[..truncated_len]).is_err());
    }

    // =========================================================================
    // Property 6: Arbitrary bytes never panic the decoders
    // =========================================================================
    #[test]
    fn test_decode_arbitrary_bytes(data in prop::collection::vec(any::<u8>(), 0..600)) {
        let _ = Frame::parse(&data);
        let mut src = SliceSource::new(&data);
        let _ = Frame::read_from(&mut src, &Limits::embedded());
    }

    #[test]
    fn test_handshake_arbitrary_bytes(data in prop::collection::vec(any::<u8>(), 0..600)) {
        let mut src = SliceSource::new(&data);
        let _ = read_handshake(&mut src, &Limits::embedded(), None, &NoopSink);
    }

    // =========================================================================
    // Property 7: Fragmented messages reassemble to the concatenation
    // =========================================================================
    #[test]
    fn test_fragments_reassemble(
        chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 1..8)
    ) {
        let mut assembler = MessageAssembler::new(Limits::default());
        let last = chunks.len() - 1;
        let mut delivered = Vec::new();

        for (i, chunk) in chunks.iter().enumerate() {
            let opcode = if i == 0 { OpCode::Binary } else { OpCode::Continuation };
            let frame = Frame::new(i == last, opcode, chunk.clone());
            if let Some(message) = assembler.push(frame).unwrap() {
                delivered.push(message);
            }
        }

        prop_assert_eq!(delivered.len(), 1);
        prop_assert_eq!(delivered[0].opcode, OpCode::Binary);
        prop_assert_eq!(delivered[0].payload.to_vec(), chunks.concat());
        prop_assert!(!assembler.is_assembling());
    }

    // =========================================================================
    // Property 8: Back-to-back frames parse in order
    // =========================================================================
    #[test]
    fn test_sequential_frame_parsing(
        payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..100), 1..5)
    ) {
        let mut buf = Vec::new();
        for payload in &payloads {
            Frame::new(true, OpCode::Text, payload.clone()).write(&mut buf, None);
        }

        let mut offset = 0;
        for (i, original) in payloads.iter().enumerate() {
            let result = Frame::parse(&buf[offset..]);
            prop_assert!(result.is_ok(), "failed to parse frame {}: {:?}", i, result);
            let (parsed, consumed) = result.unwrap();
            prop_assert_eq!(parsed.payload(), original.as_slice(), "frame {} payload mismatch", i);
            offset += consumed;
        }
        prop_assert_eq!(offset, buf.len(), "not all bytes consumed");
    }
}

#[cfg(test)]
mod targeted_tests {
    use super::*;

    #[test]
    fn test_length_boundaries() {
        for (len, selector) in [
            (0, 0),
            (125, 125),
            (126, 126),
            (65535, 126),
            (65536, 127),
        ] {
            let buf = encode(&Frame::new(true, OpCode::Binary, vec![0xAB; len]), None);
            assert_eq!(buf[1], selector, "length {len}");
            let (parsed, _) = Frame::parse(&buf).unwrap();
            assert_eq!(parsed.payload().len(), len);
        }
    }

    #[test]
    fn test_zero_and_ff_masks() {
        for mask in [[0, 0, 0, 0], [0xFF; 4]] {
            let buf = encode(&Frame::text("test payload"), Some(mask));
            let (parsed, _) = Frame::parse(&buf).unwrap();
            assert_eq!(parsed.payload(), b"test payload");
        }
    }
}
