//! Raw (RESP) message format
//!
//! Messages are RESP multi-bulk arrays (`*2\r\n$3\r\nGET\r\n$1\r\nk\r\n`) or
//! inline commands (`GET k`). Replies are RESP-encoded.

use super::FormatAdapter;
use crate::{Command, Reply};
use bytes::{BufMut, Bytes, BytesMut};

/// RESP format adapter
#[derive(Debug, Clone, Copy, Default)]
pub struct RawFormat;

impl FormatAdapter for RawFormat {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn extract(&self, payload: &[u8]) -> Option<Command> {
        let args = if payload.first() == Some(&b'*') {
            parse_multibulk(payload)?
        } else {
            parse_inline(payload)
        };
        if args.is_empty() {
            return None;
        }
        Some(Command::new(args))
    }

    fn format_reply(&self, _command: &Command, reply: &Reply) -> Bytes {
        let mut out = BytesMut::new();
        encode_reply(reply, &mut out);
        out.freeze()
    }
}

fn parse_inline(payload: &[u8]) -> Vec<Bytes> {
    payload
        .split(|b| b.is_ascii_whitespace())
        .filter(|arg| !arg.is_empty())
        .map(Bytes::copy_from_slice)
        .collect()
}

/// Split off one CRLF-terminated line
fn line(input: &[u8]) -> Option<(&[u8], &[u8])> {
    let end = input.windows(2).position(|w| w == b"\r\n")?;
    Some((&input[..end], &input[end + 2..]))
}

fn prefixed_len(line: &[u8], prefix: u8) -> Option<usize> {
    let (&first, digits) = line.split_first()?;
    if first != prefix {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

fn parse_multibulk(payload: &[u8]) -> Option<Vec<Bytes>> {
    let (header, mut rest) = line(payload)?;
    let count = prefixed_len(header, b'*')?;

    // Every element needs at least "$0\r\n\r\n".
    if count > rest.len() / 6 {
        return None;
    }

    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        let (header, body) = line(rest)?;
        let len = prefixed_len(header, b'$')?;
        let data = body.get(..len)?;
        if body.get(len..len.checked_add(2)?)? != b"\r\n" {
            return None;
        }
        args.push(Bytes::copy_from_slice(data));
        rest = &body[len + 2..];
    }
    Some(args)
}

fn encode_reply(reply: &Reply, out: &mut BytesMut) {
    match reply {
        Reply::Status(status) => {
            out.put_u8(b'+');
            out.put_slice(status.as_bytes());
            out.put_slice(b"\r\n");
        }
        Reply::Error(msg) => {
            out.put_u8(b'-');
            out.put_slice(msg.as_bytes());
            out.put_slice(b"\r\n");
        }
        Reply::Integer(n) => {
            out.put_slice(format!(":{n}\r\n").as_bytes());
        }
        Reply::Bulk(Some(data)) => {
            out.put_slice(format!("${}\r\n", data.len()).as_bytes());
            out.put_slice(data);
            out.put_slice(b"\r\n");
        }
        Reply::Bulk(None) => out.put_slice(b"$-1\r\n"),
        Reply::Array(items) => {
            out.put_slice(format!("*{}\r\n", items.len()).as_bytes());
            for item in items {
                encode_reply(item, out);
            }
        }
    }
}
