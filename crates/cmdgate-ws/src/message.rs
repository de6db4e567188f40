//! Logical WebSocket messages and their accumulator

use crate::frame::{apply_mask, MASK_LEN};
use bytes::{Bytes, BytesMut};

/// A complete logical message, reassembled from one or more physical frames
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    payload: Bytes,
    consumed: usize,
    frames: usize,
}

impl Message {
    /// Unmasked payload
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Consume the message, returning its payload
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Raw bytes this message occupied in the input buffer, headers included
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Number of physical frames merged into this message
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Payload length
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Get the payload as text if it is valid UTF-8
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

/// In-progress logical message.
///
/// Payload bytes are stored unmasked. `consumed` is the sum of header, mask
/// and payload sizes of every physical frame appended so far.
#[derive(Debug, Default)]
pub(crate) struct MessageAccumulator {
    payload: BytesMut,
    consumed: usize,
    frames: usize,
}

impl MessageAccumulator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn consumed(&self) -> usize {
        self.consumed
    }

    pub(crate) fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Append the payload of one physical frame occupying `frame_len` raw bytes
    pub(crate) fn append(&mut self, payload: &[u8], mask: Option<[u8; MASK_LEN]>, frame_len: usize) {
        let start = self.payload.len();
        self.payload.extend_from_slice(payload);
        if let Some(mask) = mask {
            apply_mask(&mut self.payload[start..], mask);
        }
        self.consumed += frame_len;
        self.frames += 1;
    }

    pub(crate) fn finish(self) -> Message {
        Message {
            payload: self.payload.freeze(),
            consumed: self.consumed,
            frames: self.frames,
        }
    }
}
