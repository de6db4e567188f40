//! HTTP/1.1 request head reader
//!
//! The gateway only ever needs the head of the upgrade request, so it reads
//! up to the blank line itself and hands everything after it to the
//! WebSocket connection as already-received input.

use bytes::BytesMut;
use cmdgate_ws::HandshakeRequest;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Response sent when a request cannot be upgraded
pub const BAD_REQUEST: &[u8] =
    b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

/// Error reading or parsing a request head
#[derive(Debug, Error)]
pub enum RequestError {
    /// The peer closed the connection before the head was complete
    #[error("Connection closed before the request head was complete")]
    Closed,

    /// The head did not end within the configured limit
    #[error("Request head exceeds {0} bytes")]
    TooLarge(usize),

    /// The head is not valid HTTP/1.x
    #[error("Malformed request head: {0}")]
    Malformed(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl RequestError {
    fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}

/// Parsed request line and headers
#[derive(Debug, Clone)]
pub struct RequestHead {
    /// Request method
    pub method: Method,
    /// Request target, verbatim
    pub path: String,
    /// Request headers
    pub headers: HeaderMap,
}

impl RequestHead {
    /// Whether the request asks for a WebSocket upgrade
    pub fn is_upgrade(&self) -> bool {
        cmdgate_ws::is_upgrade_request(&self.method, &self.headers)
    }

    /// The parts of the request the handshake needs
    pub fn into_handshake(self) -> HandshakeRequest {
        HandshakeRequest::new(self.path, self.headers)
    }
}

/// Offset just past the blank line ending the head, if it has arrived
pub fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEAD_TERMINATOR.len())
        .position(|w| w == HEAD_TERMINATOR)
        .map(|pos| pos + HEAD_TERMINATOR.len())
}

/// Parse a complete request head, terminator included or not
pub fn parse_head(head: &[u8]) -> Result<RequestHead, RequestError> {
    let text =
        std::str::from_utf8(head).map_err(|_| RequestError::malformed("head is not UTF-8"))?;
    let mut lines = text.split("\r\n");

    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split(' ');
    let (method, path, version) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(method), Some(path), Some(version), None) => (method, path, version),
        _ => return Err(RequestError::malformed("bad request line")),
    };
    if !version.starts_with("HTTP/1.") {
        return Err(RequestError::malformed(format!("unsupported version {version}")));
    }
    let method = Method::from_bytes(method.as_bytes())
        .map_err(|_| RequestError::malformed(format!("bad method {method}")))?;
    if path.is_empty() {
        return Err(RequestError::malformed("empty request target"));
    }

    let mut headers = HeaderMap::new();
    for line in lines.take_while(|line| !line.is_empty()) {
        if line.starts_with([' ', '\t']) {
            return Err(RequestError::malformed("folded header line"));
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| RequestError::malformed("header line without colon"))?;
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| RequestError::malformed(format!("bad header name {name:?}")))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|_| RequestError::malformed(format!("bad value for header {name}")))?;
        headers.append(name, value);
    }

    Ok(RequestHead {
        method,
        path: path.to_string(),
        headers,
    })
}

/// Read and parse a request head of at most `limit` bytes.
///
/// Returns the head and whatever the peer sent after it.
pub async fn read_head<R>(io: &mut R, limit: usize) -> Result<(RequestHead, BytesMut), RequestError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(limit.min(4096));
    loop {
        if let Some(end) = find_head_end(&buf) {
            if end > limit {
                return Err(RequestError::TooLarge(limit));
            }
            let rest = buf.split_off(end);
            return Ok((parse_head(&buf)?, rest));
        }
        if buf.len() >= limit {
            return Err(RequestError::TooLarge(limit));
        }

        buf.reserve(1024);
        if io.read_buf(&mut buf).await? == 0 {
            return Err(RequestError::Closed);
        }
    }
}
