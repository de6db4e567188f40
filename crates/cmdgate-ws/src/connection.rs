//! Per-connection WebSocket state
//!
//! [`WsConnection`] owns everything the protocol core keeps for one client:
//! the input buffer, the decoder with its message in progress, the output
//! queue with its write-readiness state, and the dispatcher with the sticky
//! backend session. It does no I/O itself; the caller feeds it bytes read
//! from the socket, replies from the reply channel, and write-readiness
//! notifications.

use crate::decoder::{DecodeState, FrameDecoder};
use crate::dispatch::Dispatcher;
use crate::encoder::encode_frame;
use crate::handshake::{handshake_response, HandshakeRequest};
use crate::scheduler::{Drain, NonBlockingWrite, WriteScheduler};
use crate::session::ReplyReceiver;
use crate::{Backend, Result, WsConfig};
use bytes::{Buf, BytesMut};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Bytes received from the socket and not yet consumed by the decoder
#[derive(Debug, Default)]
pub struct InputBuffer {
    buf: BytesMut,
}

impl InputBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes read from the socket
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Unconsumed bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Number of unconsumed bytes
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether every received byte has been consumed
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Trim `n` bytes from the front.
    ///
    /// `n` must be a count reported by the decoder for this buffer.
    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.buf.len(), "consume({n}) past end of input");
        self.buf.advance(n.min(self.buf.len()));
    }

    /// Direct access for reads straight into the buffer
    pub fn as_bytes_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }
}

/// An upgraded WebSocket connection
#[derive(Debug)]
pub struct WsConnection {
    input: InputBuffer,
    decoder: FrameDecoder,
    output: WriteScheduler,
    dispatcher: Dispatcher,
    messages: u64,
}

impl WsConnection {
    /// Answer an upgrade request and promote the connection to WebSocket.
    ///
    /// On success the `101` response is already queued for writing, and the
    /// returned receiver yields formatted replies from the backend. Each one
    /// must be handed back through [`WsConnection::send_reply`]. On failure
    /// the upgrade is refused and nothing is queued.
    pub fn upgrade(
        request: &HandshakeRequest,
        backend: Arc<dyn Backend>,
        config: &WsConfig,
    ) -> Result<(Self, ReplyReceiver)> {
        let response = handshake_response(request)?;
        let (replies, reply_rx) = mpsc::unbounded_channel();

        let mut output = WriteScheduler::new();
        output.enqueue(&response);

        let connection = Self {
            input: InputBuffer::new(),
            decoder: FrameDecoder::new().max_message_size(config.max_message_size),
            output,
            dispatcher: Dispatcher::new(&request.path, backend, config.database, replies),
            messages: 0,
        };
        tracing::debug!(path = %request.path, "Upgraded connection to WebSocket");
        Ok((connection, reply_rx))
    }

    /// Request path the connection was upgraded on
    pub fn path(&self) -> &str {
        self.dispatcher.path()
    }

    /// Messages received so far
    pub fn messages(&self) -> u64 {
        self.messages
    }

    /// Input buffer, for reads straight into it
    pub fn input_mut(&mut self) -> &mut InputBuffer {
        &mut self.input
    }

    /// Append freshly read bytes and process them.
    ///
    /// See [`WsConnection::process_input`].
    pub fn on_readable(&mut self, data: &[u8]) -> Result<usize> {
        self.input.extend(data);
        self.process_input()
    }

    /// Decode and dispatch every complete message in the input buffer.
    ///
    /// Returns how many messages were decoded. A frame protocol error is
    /// returned as is and the connection must be closed; dispatch failures
    /// only drop the offending message.
    pub fn process_input(&mut self) -> Result<usize> {
        let mut decoded = 0;
        while let DecodeState::MessageComplete(message) = self.decoder.decode(self.input.as_slice())? {
            self.input.consume(message.consumed());
            self.messages += 1;
            decoded += 1;

            if let Err(err) = self.dispatcher.dispatch(message.payload()) {
                if err.is_fatal() {
                    return Err(err);
                }
                tracing::debug!(path = %self.path(), error = %err, "Dropped WebSocket message");
            }
        }
        Ok(decoded)
    }

    /// Frame a formatted reply and queue it for writing.
    ///
    /// On allocation failure nothing is queued and the connection is left
    /// as it was.
    pub fn send_reply(&mut self, payload: &[u8]) -> Result<()> {
        let frame = encode_frame(payload)?;
        self.output.enqueue(&frame);
        Ok(())
    }

    /// Whether the caller must wait for write readiness
    pub fn wants_write(&self) -> bool {
        self.output.is_scheduled()
    }

    /// Bytes queued for writing
    pub fn pending_output(&self) -> usize {
        self.output.pending()
    }

    /// Handle a write-readiness notification.
    ///
    /// An error means the socket is broken and the connection must be closed.
    pub fn on_writable<W: NonBlockingWrite>(&mut self, io: &mut W) -> Result<Drain> {
        self.output.on_writable(io)
    }

    /// Tear down: drop the message in progress and queued output without
    /// writing it, and let the backend session go.
    pub fn close(&mut self) {
        self.decoder.reset();
        self.output.clear();
        self.dispatcher.close();
        tracing::debug!(path = %self.path(), messages = self.messages, "Closed WebSocket connection");
    }
}
