//! # cmdgate-ws
//!
//! Server-side WebSocket protocol core for the cmdgate command gateway.
//!
//! This crate turns an HTTP upgrade request into a WebSocket connection and
//! carries commands from clients to a command-execution backend and their
//! replies back. It does no socket I/O of its own: the server feeds it bytes
//! and readiness notifications and writes out what it queues.
//!
//! ## Features
//!
//! - **Handshake**: Builds the exact `101 Switching Protocols` response
//! - **Frame Decoding**: Reassembles fragmented, masked client messages from
//!   short reads and pipelined input
//! - **Frame Encoding**: Frames replies as single unmasked text frames
//! - **Write Scheduling**: Flushes output only on write readiness, with at
//!   most one outstanding registration per connection
//! - **Dispatch**: Routes messages by request path to a JSON or RESP format
//!   adapter and runs them on one sticky backend session per connection
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cmdgate_ws::prelude::*;
//!
//! let request = HandshakeRequest::new(path, headers);
//! let (mut conn, mut replies) = WsConnection::upgrade(&request, backend, &WsConfig::new())?;
//!
//! loop {
//!     tokio::select! {
//!         _ = socket.readable() => {
//!             let n = socket.try_read_buf(conn.input_mut().as_bytes_mut())?;
//!             conn.process_input()?;
//!         }
//!         Some(reply) = replies.recv() => conn.send_reply(&reply)?,
//!         _ = socket.writable(), if conn.wants_write() => {
//!             conn.on_writable(&mut &socket)?;
//!         }
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod command;
mod config;
mod connection;
mod decoder;
mod dispatch;
mod encoder;
mod error;
pub mod format;
pub mod frame;
mod handshake;
mod message;
mod scheduler;
mod session;

pub use command::{Backend, BackendError, BackendSession, Command, CommandOrigin, Reply};
pub use config::WsConfig;
pub use connection::{InputBuffer, WsConnection};
pub use decoder::{DecodeState, FrameDecoder};
pub use dispatch::Dispatcher;
pub use encoder::{encode_frame, header_len, SERVER_FRAME_BYTE0};
pub use error::{FrameError, Result, WebSocketError};
pub use handshake::{
    generate_accept_key, handshake_response, is_upgrade_request, HandshakeRequest,
};
pub use message::Message;
pub use scheduler::{Drain, NonBlockingWrite, WriteScheduler, WriteState};
pub use session::{ReplyReceiver, ReplySender, SessionHandle};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::format::{Format, FormatAdapter};
    pub use crate::{
        Backend, BackendError, BackendSession, Command, Drain, HandshakeRequest, Reply,
        WebSocketError, WsConfig, WsConnection,
    };
}
