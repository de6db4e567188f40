//! Outgoing frame encoder
//!
//! Server frames are always final, always unmasked, and always carry the
//! text-frame first byte `0x81`.

use crate::frame::{FIN_BIT, LEN_16, LEN_64, MAX_DIRECT_LEN};
use crate::{Result, WebSocketError};

/// First byte of every frame the server sends: FIN + text opcode
pub const SERVER_FRAME_BYTE0: u8 = FIN_BIT | 0x1;

/// Header size for a server frame carrying `payload_len` bytes
pub fn header_len(payload_len: usize) -> usize {
    if payload_len <= usize::from(MAX_DIRECT_LEN) {
        2
    } else if payload_len <= usize::from(u16::MAX) {
        4
    } else {
        10
    }
}

/// Wrap `payload` in a single server frame.
///
/// Memory for the frame is reserved up front; if that fails nothing is
/// produced and [`WebSocketError::AllocationFailed`] is returned.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>> {
    let len = payload.len();
    let frame_len = header_len(len)
        .checked_add(len)
        .ok_or(WebSocketError::AllocationFailed(usize::MAX))?;

    let mut frame = Vec::new();
    frame
        .try_reserve_exact(frame_len)
        .map_err(|_| WebSocketError::AllocationFailed(frame_len))?;

    frame.push(SERVER_FRAME_BYTE0);
    if len <= usize::from(MAX_DIRECT_LEN) {
        frame.push(len as u8);
    } else if let Ok(len16) = u16::try_from(len) {
        frame.push(LEN_16);
        frame.extend_from_slice(&len16.to_be_bytes());
    } else {
        frame.push(LEN_64);
        frame.extend_from_slice(&(len as u64).to_be_bytes());
    }
    frame.extend_from_slice(payload);

    Ok(frame)
}
