//! Incremental frame decoder
//!
//! The decoder is handed the whole unconsumed input buffer on every call. It
//! keeps no header state between calls, only the accumulator of the logical
//! message in progress, so calling it again with identical input yields the
//! same answer. Physical frames already merged into the accumulator stay in
//! the buffer until the message completes; the caller then trims exactly
//! [`Message::consumed`] bytes.

use crate::frame::{parse_header, Cursor};
use crate::message::MessageAccumulator;
use crate::{FrameError, Message};

/// Outcome of a decode pass that did not hit a protocol error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeState {
    /// More bytes are needed before anything can be decided
    Reading,
    /// A full logical message is available
    MessageComplete(Message),
}

/// Stateful decoder for one connection's incoming frames
#[derive(Debug, Default)]
pub struct FrameDecoder {
    partial: Option<MessageAccumulator>,
    max_message_size: Option<usize>,
}

impl FrameDecoder {
    /// Create a decoder without a message size limit
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject logical messages larger than `limit` bytes
    pub fn max_message_size(mut self, limit: Option<usize>) -> Self {
        self.max_message_size = limit;
        self
    }

    /// Whether a fragmented message is partially assembled
    pub fn in_progress(&self) -> bool {
        self.partial.is_some()
    }

    /// Raw bytes at the front of the buffer already merged into the
    /// message in progress
    pub fn pending_consumed(&self) -> usize {
        self.partial.as_ref().map_or(0, MessageAccumulator::consumed)
    }

    /// Drop any partially assembled message
    pub fn reset(&mut self) {
        self.partial = None;
    }

    /// Decode from the start of the unconsumed input buffer.
    ///
    /// Non-final frames are merged into the accumulator and decoding carries
    /// on with the next frame, until either a final frame completes the
    /// message or the buffer runs out.
    pub fn decode(&mut self, buf: &[u8]) -> Result<DecodeState, FrameError> {
        loop {
            let offset = self.pending_consumed();
            let Some(frame) = buf.get(offset..) else {
                return Ok(DecodeState::Reading);
            };

            let header = match parse_header(frame) {
                Ok(Some(header)) => header,
                Ok(None) => return Ok(DecodeState::Reading),
                Err(err) => {
                    self.reset();
                    return Err(err);
                }
            };

            if let Some(limit) = self.max_message_size {
                let current = self.partial.as_ref().map_or(0, |p| p.payload_len()) as u64;
                let size = current.saturating_add(header.payload_len);
                if size > limit as u64 {
                    self.reset();
                    return Err(FrameError::MessageTooLarge { size, limit });
                }
            }

            let mut cursor = Cursor::new(frame);
            if cursor.take(header.header_len).is_none()
                || header.payload_len > cursor.remaining() as u64
            {
                return Ok(DecodeState::Reading);
            }
            // Bounded by `remaining()` above.
            let payload_len = header.payload_len as usize;
            let Some(payload) = cursor.take(payload_len) else {
                return Ok(DecodeState::Reading);
            };

            let mut acc = self.partial.take().unwrap_or_else(MessageAccumulator::new);
            acc.append(payload, header.mask, cursor.position());
            tracing::trace!(
                fin = header.fin,
                opcode = header.opcode,
                masked = header.mask.is_some(),
                payload_len,
                consumed = acc.consumed(),
                "Decoded frame"
            );

            if header.fin {
                return Ok(DecodeState::MessageComplete(acc.finish()));
            }
            self.partial = Some(acc);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::encoder::encode_frame;
    use crate::frame::apply_mask;
    use bytes::Bytes;
    use proptest::prelude::*;

    /// Build a client-style frame
    pub(crate) fn client_frame(payload: &[u8], fin: bool, mask: Option<[u8; 4]>) -> Vec<u8> {
        let mut frame = vec![if fin { 0x81 } else { 0x01 }];
        let mask_bit = if mask.is_some() { 0x80 } else { 0 };
        match payload.len() {
            len @ 0..=125 => frame.push(mask_bit | len as u8),
            len @ 126..=65535 => {
                frame.push(mask_bit | 126);
                frame.extend_from_slice(&(len as u16).to_be_bytes());
            }
            len => {
                frame.push(mask_bit | 127);
                frame.extend_from_slice(&(len as u64).to_be_bytes());
            }
        }
        let mut body = payload.to_vec();
        if let Some(mask) = mask {
            frame.extend_from_slice(&mask);
            apply_mask(&mut body, mask);
        }
        frame.extend_from_slice(&body);
        frame
    }

    fn expect_message(state: DecodeState) -> Message {
        match state {
            DecodeState::MessageComplete(message) => message,
            DecodeState::Reading => panic!("expected a complete message"),
        }
    }

    #[test]
    fn test_encoded_payloads_decode_back() {
        for size in [0usize, 5, 125, 126, 65535, 65536, 70_000] {
            let payload: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
            let encoded = encode_frame(&payload).unwrap();

            let mut decoder = FrameDecoder::new();
            let message = expect_message(decoder.decode(&encoded).unwrap());
            assert_eq!(message.payload(), &Bytes::from(payload), "size {size}");
            assert_eq!(message.consumed(), encoded.len(), "size {size}");
            assert!(!decoder.in_progress());
        }
    }

    #[test]
    fn test_masked_frame_is_unmasked() {
        let frame = client_frame(b"[\"PING\"]", true, Some([0xde, 0xad, 0xbe, 0xef]));
        let message = expect_message(FrameDecoder::new().decode(&frame).unwrap());
        assert_eq!(message.as_text(), Some("[\"PING\"]"));
        assert_eq!(message.consumed(), 2 + 4 + 8);
    }

    #[test]
    fn test_empty_masked_frame_completes() {
        let frame = client_frame(b"", true, Some([1, 2, 3, 4]));
        assert_eq!(frame.len(), 6);
        let message = expect_message(FrameDecoder::new().decode(&frame).unwrap());
        assert!(message.is_empty());
        assert_eq!(message.consumed(), 6);
    }

    #[test]
    fn test_frames_shorter_than_eight_bytes_complete() {
        let frame = client_frame(b"x", true, Some([5, 5, 5, 5]));
        assert_eq!(frame.len(), 7);
        let mut decoder = FrameDecoder::new();
        for end in 0..frame.len() {
            assert_eq!(decoder.decode(&frame[..end]).unwrap(), DecodeState::Reading);
        }
        let message = expect_message(decoder.decode(&frame).unwrap());
        assert_eq!(message.as_text(), Some("x"));
        assert_eq!(message.consumed(), 7);
    }

    #[test]
    fn test_short_reads_only_yield_reading() {
        let frame = client_frame(&[7u8; 300], true, Some([9, 8, 7, 6]));
        let mut decoder = FrameDecoder::new();
        for end in 0..frame.len() {
            assert_eq!(decoder.decode(&frame[..end]).unwrap(), DecodeState::Reading);
        }
        let message = expect_message(decoder.decode(&frame).unwrap());
        assert_eq!(message.payload().as_ref(), &[7u8; 300][..]);
    }

    #[test]
    fn test_fragmented_message_across_reads() {
        let mask = Some([0x11, 0x22, 0x33, 0x44]);
        let parts: [&[u8]; 3] = [b"[\"SET\",", b"\"k\",", b"\"v\"]"];
        let mut buffer = Vec::new();
        let mut decoder = FrameDecoder::new();

        for (i, part) in parts.iter().enumerate() {
            let fin = i == parts.len() - 1;
            buffer.extend_from_slice(&client_frame(part, fin, mask));
            let state = decoder.decode(&buffer).unwrap();
            if fin {
                let message = expect_message(state);
                assert_eq!(message.as_text(), Some("[\"SET\",\"k\",\"v\"]"));
                assert_eq!(message.consumed(), buffer.len());
                assert_eq!(message.frames(), 3);
            } else {
                assert_eq!(state, DecodeState::Reading);
                assert!(decoder.in_progress());
                // Same input again must not merge the frame twice.
                assert_eq!(decoder.decode(&buffer).unwrap(), DecodeState::Reading);
            }
        }
    }

    #[test]
    fn test_pipelined_messages() {
        let mut buffer = client_frame(b"first", true, Some([1, 1, 1, 1]));
        buffer.extend_from_slice(&client_frame(&[b'x'; 200], true, Some([2, 2, 2, 2])));
        let total = buffer.len();

        let mut decoder = FrameDecoder::new();
        let first = expect_message(decoder.decode(&buffer).unwrap());
        assert_eq!(first.as_text(), Some("first"));
        buffer.drain(..first.consumed());

        let second = expect_message(decoder.decode(&buffer).unwrap());
        assert_eq!(second.len(), 200);
        buffer.drain(..second.consumed());

        assert_eq!(first.consumed() + second.consumed(), total);
        assert!(buffer.is_empty());
        assert_eq!(decoder.decode(&buffer).unwrap(), DecodeState::Reading);
    }

    #[test]
    fn test_huge_declared_length_waits_for_data() {
        let mut frame = vec![0x81, 0x80 | 127];
        frame.extend_from_slice(&(1u64 << 63).to_be_bytes());
        frame.extend_from_slice(&[0, 0, 0, 0, b'a', b'b']);
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.decode(&frame).unwrap(), DecodeState::Reading);

        let mut frame = vec![0x81, 127];
        frame.extend_from_slice(&u64::MAX.to_be_bytes());
        assert_eq!(decoder.decode(&frame).unwrap(), DecodeState::Reading);
    }

    #[test]
    fn test_message_size_limit() {
        let mut decoder = FrameDecoder::new().max_message_size(Some(8));
        let mut buffer = client_frame(b"12345", false, None);
        assert_eq!(decoder.decode(&buffer).unwrap(), DecodeState::Reading);

        buffer.extend_from_slice(&client_frame(b"6789", true, None));
        assert_eq!(
            decoder.decode(&buffer),
            Err(FrameError::MessageTooLarge { size: 9, limit: 8 })
        );
        assert!(!decoder.in_progress());

        let mut frame = vec![0x81, 127];
        frame.extend_from_slice(&(1u64 << 40).to_be_bytes());
        assert!(matches!(
            FrameDecoder::new().max_message_size(Some(1024)).decode(&frame),
            Err(FrameError::MessageTooLarge { .. })
        ));
    }

    #[test]
    fn test_reset_drops_partial_message() {
        let mut decoder = FrameDecoder::new();
        let buffer = client_frame(b"part", false, None);
        decoder.decode(&buffer).unwrap();
        assert_eq!(decoder.pending_consumed(), buffer.len());
        decoder.reset();
        assert!(!decoder.in_progress());
        assert_eq!(decoder.pending_consumed(), 0);
    }

    proptest! {
        #[test]
        fn test_fragmentation_into_n_frames(
            payload in proptest::collection::vec(any::<u8>(), 1..2048),
            cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..8),
            mask in proptest::option::of(any::<[u8; 4]>()),
        ) {
            let mut bounds: Vec<usize> = cuts.iter().map(|i| i.index(payload.len())).collect();
            bounds.push(0);
            bounds.push(payload.len());
            bounds.sort_unstable();
            bounds.dedup();
            let pieces: Vec<&[u8]> = bounds.windows(2).map(|w| &payload[w[0]..w[1]]).collect();

            let mut decoder = FrameDecoder::new();
            let mut buffer = Vec::new();
            for (i, piece) in pieces.iter().enumerate() {
                let fin = i == pieces.len() - 1;
                buffer.extend_from_slice(&client_frame(piece, fin, mask));
                let state = decoder.decode(&buffer).unwrap();
                if fin {
                    let message = expect_message(state);
                    prop_assert_eq!(message.payload().as_ref(), &payload[..]);
                    prop_assert_eq!(message.consumed(), buffer.len());
                } else {
                    prop_assert_eq!(state, DecodeState::Reading);
                }
            }
        }

        #[test]
        fn test_arbitrary_input_never_panics(buf in proptest::collection::vec(any::<u8>(), 0..256)) {
            let mut decoder = FrameDecoder::new();
            if let Ok(DecodeState::MessageComplete(message)) = decoder.decode(&buf) {
                prop_assert!(message.consumed() <= buf.len());
            }
        }
    }
}
