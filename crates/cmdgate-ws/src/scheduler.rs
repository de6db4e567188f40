//! Write scheduling for a non-blocking socket
//!
//! Output is queued and flushed only when the socket reports it is
//! writable. A connection holds at most one outstanding write-readiness
//! registration at a time:
//!
//! ```text
//!            schedule()                 on_writable(): queue drained
//!   Idle ─────────────────► WriteScheduled ─────────────────────────► Idle
//!                              ▲       │
//!                              └───────┘ on_writable(): bytes left over
//! ```

use crate::{Result, WebSocketError};
use bytes::{Buf, BytesMut};
use std::io;

/// Write-readiness registration state of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteState {
    /// Nothing outstanding
    #[default]
    Idle,
    /// Waiting for the socket to become writable
    WriteScheduled,
}

/// Result of one flush attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drain {
    /// The queue is empty; the scheduler went idle
    Complete,
    /// Bytes remain; another write-readiness registration is outstanding
    Partial,
}

/// A socket that accepts writes without blocking
pub trait NonBlockingWrite {
    /// Write as much of `buf` as the socket accepts right now.
    ///
    /// Returns `ErrorKind::WouldBlock` when it accepts nothing.
    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize>;
}

impl NonBlockingWrite for tokio::net::TcpStream {
    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
        tokio::net::TcpStream::try_write(self, buf)
    }
}

impl NonBlockingWrite for &tokio::net::TcpStream {
    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
        tokio::net::TcpStream::try_write(*self, buf)
    }
}

/// Output queue plus its write-readiness state
#[derive(Debug, Default)]
pub struct WriteScheduler {
    queue: BytesMut,
    state: WriteState,
}

impl WriteScheduler {
    /// Create an idle scheduler with an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Current registration state
    pub fn state(&self) -> WriteState {
        self.state
    }

    /// Whether a write-readiness registration is outstanding
    pub fn is_scheduled(&self) -> bool {
        self.state == WriteState::WriteScheduled
    }

    /// Bytes waiting to be written
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Append bytes to the output queue and make sure a flush is scheduled
    pub fn enqueue(&mut self, bytes: &[u8]) {
        self.queue.extend_from_slice(bytes);
        self.schedule();
    }

    /// Register interest in write readiness.
    ///
    /// Returns `true` if this call created the registration and `false` if
    /// one was already outstanding.
    pub fn schedule(&mut self) -> bool {
        if self.is_scheduled() {
            return false;
        }
        self.state = WriteState::WriteScheduled;
        true
    }

    /// Handle a write-readiness notification with one non-blocking write.
    ///
    /// On a write error the queue is dropped and the error is returned; the
    /// connection must be closed.
    pub fn on_writable<W: NonBlockingWrite>(&mut self, io: &mut W) -> Result<Drain> {
        self.state = WriteState::Idle;
        if self.queue.is_empty() {
            return Ok(Drain::Complete);
        }

        match io.try_write(&self.queue) {
            Ok(0) => {
                self.clear();
                Err(WebSocketError::ConnectionClosed)
            }
            Ok(written) => {
                self.queue.advance(written);
                tracing::trace!(written, pending = self.queue.len(), "Flushed output");
                Ok(self.reschedule_if_pending())
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                Ok(self.reschedule_if_pending())
            }
            Err(err) => {
                self.clear();
                Err(WebSocketError::from(err))
            }
        }
    }

    /// Drop queued output without writing it
    pub fn clear(&mut self) {
        self.queue.clear();
        self.state = WriteState::Idle;
    }

    fn reschedule_if_pending(&mut self) -> Drain {
        if self.queue.is_empty() {
            Drain::Complete
        } else {
            self.schedule();
            Drain::Partial
        }
    }
}
