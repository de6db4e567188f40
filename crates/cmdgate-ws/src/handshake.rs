//! WebSocket upgrade handshake

use crate::{Result, WebSocketError};
use bytes::{BufMut, Bytes, BytesMut};
use http::{header, HeaderMap};

/// GUID appended to the client key before hashing (RFC 6455, section 1.3)
const GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Bounds on the length of the base64 text in `Sec-WebSocket-Key`.
///
/// A 16-byte nonce encodes to 24 characters; the bounds are a loose
/// sanity check, not a validation of the nonce itself.
const MIN_KEY_LEN: usize = 16;
const MAX_KEY_LEN: usize = 32;

const SEC_WEBSOCKET_KEY: &str = "Sec-WebSocket-Key";
const SEC_WEBSOCKET_ORIGIN: &str = "Sec-WebSocket-Origin";

/// The parts of an HTTP request the upgrade depends on
#[derive(Debug, Clone)]
pub struct HandshakeRequest {
    /// Request path, kept verbatim (query string included)
    pub path: String,
    /// Request headers
    pub headers: HeaderMap,
}

impl HandshakeRequest {
    /// Create a handshake request from a path and its headers
    pub fn new(path: impl Into<String>, headers: HeaderMap) -> Self {
        Self {
            path: path.into(),
            headers,
        }
    }

    fn header(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Origin of the request, preferring `Origin` over `Sec-WebSocket-Origin`
    pub fn origin(&self) -> Option<&str> {
        self.header(header::ORIGIN)
            .or_else(|| self.header(SEC_WEBSOCKET_ORIGIN))
            .filter(|origin| !origin.is_empty())
    }
}

/// Build the `101 Switching Protocols` response for an upgrade request.
///
/// Fails when `Sec-WebSocket-Key` is missing or outside the accepted
/// length range, or when `Host` or the path is empty.
pub fn handshake_response(request: &HandshakeRequest) -> Result<Bytes> {
    let host = request.header(header::HOST).unwrap_or_default();
    if host.is_empty() || request.path.is_empty() {
        tracing::warn!(path = %request.path, "Missing headers for WebSocket handshake");
        return Err(WebSocketError::handshake_failed("missing Host header or path"));
    }

    let key = request
        .header(SEC_WEBSOCKET_KEY)
        .ok_or_else(|| WebSocketError::handshake_failed("missing Sec-WebSocket-Key header"))?;
    if !(MIN_KEY_LEN..=MAX_KEY_LEN).contains(&key.len()) {
        tracing::warn!(key_len = key.len(), "Invalid Sec-WebSocket-Key");
        return Err(WebSocketError::handshake_failed(format!(
            "Sec-WebSocket-Key must be {MIN_KEY_LEN} to {MAX_KEY_LEN} characters, got {}",
            key.len()
        )));
    }

    let accept = generate_accept_key(key);
    let origin = request.origin();

    let mut out = BytesMut::with_capacity(
        160 + accept.len() + host.len() + request.path.len() + origin.map_or(0, str::len),
    );
    out.put_slice(b"HTTP/1.1 101 Switching Protocols\r\n");
    out.put_slice(b"Upgrade: websocket\r\n");
    out.put_slice(b"Connection: Upgrade\r\n");
    out.put_slice(b"Sec-WebSocket-Accept: ");
    out.put_slice(accept.as_bytes());
    out.put_slice(b"\r\n");
    if let Some(origin) = origin {
        out.put_slice(b"Sec-WebSocket-Origin: ");
        out.put_slice(origin.as_bytes());
        out.put_slice(b"\r\n");
    }
    out.put_slice(b"Sec-WebSocket-Location: ws://");
    out.put_slice(host.as_bytes());
    out.put_slice(request.path.as_bytes());
    out.put_slice(b"\r\n\r\n");

    Ok(out.freeze())
}

/// Generate the Sec-WebSocket-Accept key from the client's Sec-WebSocket-Key
pub fn generate_accept_key(key: &str) -> String {
    use base64::Engine;
    use sha1::{Digest, Sha1};

    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(GUID.as_bytes());
    let hash = hasher.finalize();

    let mut accept = base64::engine::general_purpose::STANDARD.encode(hash);
    if accept.ends_with('\n') {
        accept.pop();
    }
    accept
}

/// Whether a request asks to be upgraded to WebSocket at all
///
/// Requires `GET` and an `Upgrade: websocket` header. Everything else about
/// the request is checked by [`handshake_response`].
pub fn is_upgrade_request(method: &http::Method, headers: &HeaderMap) -> bool {
    if method != http::Method::GET {
        return false;
    }

    headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|upgrade| upgrade.trim().eq_ignore_ascii_case("websocket"))
        .unwrap_or(false)
}
