//! Frame header wire format (RFC 6455, section 5.2)
//!
//! ```text
//!  byte 0:  FIN(1) | RSV(3) | opcode(4)
//!  byte 1:  MASK(1) | payload length(7)
//!  [2 or 8 bytes of extended length, big-endian]
//!  [4 bytes masking key]
//!  payload
//! ```

use crate::FrameError;

/// FIN bit in the first header byte
pub const FIN_BIT: u8 = 0x80;
/// MASK bit in the second header byte
pub const MASK_BIT: u8 = 0x80;
/// 7-bit length field in the second header byte
pub const LENGTH_FIELD: u8 = 0x7f;
/// Largest payload length carried directly in the 7-bit field
pub const MAX_DIRECT_LEN: u8 = 125;
/// Length field value announcing a 16-bit extended length
pub const LEN_16: u8 = 126;
/// Length field value announcing a 64-bit extended length
pub const LEN_64: u8 = 127;
/// Size of the masking key
pub const MASK_LEN: usize = 4;

/// Parsed header of one physical frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Final fragment of a logical message
    pub fin: bool,
    /// Opcode bits, recorded but not interpreted
    pub opcode: u8,
    /// Masking key, if the payload is masked
    pub mask: Option<[u8; MASK_LEN]>,
    /// Declared payload length
    pub payload_len: u64,
    /// Bytes before the payload, masking key included
    pub header_len: usize,
}

impl FrameHeader {
    /// Header, mask and payload size, if it fits in memory
    pub fn frame_len(&self) -> Option<usize> {
        usize::try_from(self.payload_len)
            .ok()
            .and_then(|len| len.checked_add(self.header_len))
    }
}

/// Read-only cursor over a byte prefix.
///
/// Every read is bounds-checked and yields `None` instead of a value when it
/// would run past the end of the prefix.
#[derive(Debug)]
pub(crate) struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub(crate) fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        let bytes = self.buf.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    fn array<const N: usize>(&mut self) -> Option<[u8; N]> {
        self.take(N)?.try_into().ok()
    }

    pub(crate) fn u8(&mut self) -> Option<u8> {
        self.array::<1>().map(|[b]| b)
    }

    pub(crate) fn u16_be(&mut self) -> Option<u16> {
        self.array().map(u16::from_be_bytes)
    }

    pub(crate) fn u64_be(&mut self) -> Option<u64> {
        self.array().map(u64::from_be_bytes)
    }
}

/// Parse a frame header from the start of `buf`.
///
/// Returns `Ok(None)` while `buf` is too short to hold the whole header.
pub fn parse_header(buf: &[u8]) -> Result<Option<FrameHeader>, FrameError> {
    let mut cursor = Cursor::new(buf);
    let (Some(b0), Some(b1)) = (cursor.u8(), cursor.u8()) else {
        return Ok(None);
    };

    let payload_len = match b1 & LENGTH_FIELD {
        len @ 0..=MAX_DIRECT_LEN => Some(u64::from(len)),
        LEN_16 => cursor.u16_be().map(u64::from),
        LEN_64 => cursor.u64_be(),
        other => return Err(FrameError::InvalidLength(other)),
    };
    let Some(payload_len) = payload_len else {
        return Ok(None);
    };

    let mask = if b1 & MASK_BIT != 0 {
        match cursor.array::<MASK_LEN>() {
            Some(mask) => Some(mask),
            None => return Ok(None),
        }
    } else {
        None
    };

    Ok(Some(FrameHeader {
        fin: b0 & FIN_BIT != 0,
        opcode: b0 & 0x0f,
        mask,
        payload_len,
        header_len: cursor.position(),
    }))
}

/// XOR `payload` with the repeating 4-byte `mask`, in place.
///
/// Masking is an involution: applying the same mask twice restores the
/// original bytes.
pub fn apply_mask(payload: &mut [u8], mask: [u8; MASK_LEN]) {
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= mask[i % MASK_LEN];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_direct_length_unmasked() {
        let header = parse_header(&[0x81, 0x05, b'h']).unwrap().unwrap();
        assert!(header.fin);
        assert_eq!(header.opcode, 0x1);
        assert_eq!(header.mask, None);
        assert_eq!(header.payload_len, 5);
        assert_eq!(header.header_len, 2);
        assert_eq!(header.frame_len(), Some(7));
    }

    #[test]
    fn test_extended_16_masked() {
        let buf = [0x01, 0x80 | 126, 0x01, 0x00, 1, 2, 3, 4];
        let header = parse_header(&buf).unwrap().unwrap();
        assert!(!header.fin);
        assert_eq!(header.mask, Some([1, 2, 3, 4]));
        assert_eq!(header.payload_len, 256);
        assert_eq!(header.header_len, 8);
    }

    #[test]
    fn test_extended_64() {
        let mut buf = vec![0x82, 127];
        buf.extend_from_slice(&70_000u64.to_be_bytes());
        let header = parse_header(&buf).unwrap().unwrap();
        assert_eq!(header.payload_len, 70_000);
        assert_eq!(header.header_len, 10);
    }

    #[test]
    fn test_truncated_headers_need_more_data() {
        assert_eq!(parse_header(&[]), Ok(None));
        assert_eq!(parse_header(&[0x81]), Ok(None));
        assert_eq!(parse_header(&[0x81, 126, 0x01]), Ok(None));
        assert_eq!(parse_header(&[0x81, 127, 0, 0, 0, 0, 0]), Ok(None));
        assert_eq!(parse_header(&[0x81, 0x80 | 3, 9, 9]), Ok(None));
    }

    #[test]
    fn test_huge_declared_length_does_not_fit() {
        let mut buf = vec![0x81, 127];
        buf.extend_from_slice(&(1u64 << 63).to_be_bytes());
        let header = parse_header(&buf).unwrap().unwrap();
        assert_eq!(header.payload_len, 1 << 63);
        assert!(header.frame_len().map_or(true, |len| len > buf.len()));
    }

    #[test]
    fn test_cursor_never_reads_past_end() {
        let mut cursor = Cursor::new(&[1, 2, 3]);
        assert_eq!(cursor.u16_be(), Some(0x0102));
        assert_eq!(cursor.u16_be(), None);
        assert_eq!(cursor.remaining(), 1);
        assert_eq!(cursor.take(usize::MAX), None);
        assert_eq!(cursor.u8(), Some(3));
        assert_eq!(cursor.remaining(), 0);
    }

    proptest! {
        #[test]
        fn test_mask_roundtrip(
            payload in proptest::collection::vec(any::<u8>(), 0..512),
            mask in any::<[u8; 4]>(),
        ) {
            let mut data = payload.clone();
            apply_mask(&mut data, mask);
            apply_mask(&mut data, mask);
            prop_assert_eq!(data, payload);
        }

        #[test]
        fn test_parse_header_never_panics(buf in proptest::collection::vec(any::<u8>(), 0..32)) {
            if let Ok(Some(header)) = parse_header(&buf) {
                prop_assert!(header.header_len <= buf.len());
            }
        }
    }
}
