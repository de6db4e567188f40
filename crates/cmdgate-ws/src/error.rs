//! WebSocket error types

use thiserror::Error;

/// Result type alias for protocol-core operations
pub type Result<T, E = WebSocketError> = std::result::Result<T, E>;

/// Malformed incoming frame
///
/// Any of these is fatal to the connection that produced it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The 7-bit length field holds a value with no defined meaning
    #[error("undefined payload length field: {0}")]
    InvalidLength(u8),

    /// The logical message grew past the configured limit
    #[error("message of {size} bytes exceeds the {limit} byte limit")]
    MessageTooLarge {
        /// Size the message would reach with the offending frame
        size: u64,
        /// Configured limit
        limit: usize,
    },
}

/// Error type for WebSocket operations
#[derive(Error, Debug)]
pub enum WebSocketError {
    /// WebSocket handshake failed; the upgrade is refused
    #[error("WebSocket handshake failed: {0}")]
    HandshakeFailed(String),

    /// Malformed frame on the wire
    #[error("WebSocket protocol error: {0}")]
    Protocol(#[from] FrameError),

    /// No format adapter serves the request path
    #[error("No message format for path {0:?}")]
    UnroutablePath(String),

    /// The format adapter could not turn the message into a command
    #[error("Failed to extract a command from a {0} byte message")]
    ExtractionFailed(usize),

    /// Memory for an outgoing frame could not be reserved
    #[error("Failed to allocate a {0} byte frame")]
    AllocationFailed(usize),

    /// The command-execution subsystem is unavailable
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Connection closed unexpectedly
    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl WebSocketError {
    /// Create a handshake failed error
    pub fn handshake_failed(msg: impl Into<String>) -> Self {
        Self::HandshakeFailed(msg.into())
    }

    /// Create an unroutable path error
    pub fn unroutable_path(path: impl Into<String>) -> Self {
        Self::UnroutablePath(path.into())
    }

    /// Create a backend unavailable error
    pub fn backend_unavailable(msg: impl Into<String>) -> Self {
        Self::BackendUnavailable(msg.into())
    }

    /// Whether the connection that raised this error must be torn down.
    ///
    /// Frame protocol errors and socket errors are fatal. Dispatch failures
    /// only drop the offending message. Handshake failures leave the
    /// connection in plain HTTP mode, and the caller decides its fate.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Protocol(_) | Self::IoError(_) | Self::ConnectionClosed
        )
    }
}
