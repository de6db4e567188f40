//! Sticky backend sessions
//!
//! The first command a WebSocket connection dispatches opens a backend
//! session; every later command on that connection runs on the same one, in
//! order. The session lives in a worker task fed through a channel. Dropping
//! the [`SessionHandle`] closes the channel, the worker drains what is left,
//! releases the backend session and exits.
//!
//! A session that cannot connect, or whose backend connection breaks, stops
//! accepting jobs and answers every queued command with an error reply.
//! [`SessionHandle::is_closed`] then reports `true`, and the owner opens a new
//! session for its next command.

use crate::format::FormatAdapter;
use crate::{Backend, BackendError, Command, Reply};
use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Sender half of a connection's reply channel.
///
/// Payloads sent here are formatted replies awaiting WebSocket framing on
/// the owning connection.
pub type ReplySender = mpsc::UnboundedSender<Bytes>;

/// Receiver half of a connection's reply channel
pub type ReplyReceiver = mpsc::UnboundedReceiver<Bytes>;

struct Job {
    command: Command,
    adapter: Arc<dyn FormatAdapter>,
}

/// Handle to a connection's backend session.
///
/// Owned by the connection; commands only reference the session through it.
#[derive(Debug)]
pub struct SessionHandle {
    id: u64,
    jobs: mpsc::UnboundedSender<Job>,
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("command", &self.command)
            .field("adapter", &self.adapter.name())
            .finish()
    }
}

impl SessionHandle {
    /// Open a session on `database` whose replies go to `replies`.
    ///
    /// The backend connection itself is made by the worker task, so this
    /// never waits. Must be called from within a Tokio runtime.
    pub fn open(backend: Arc<dyn Backend>, database: u32, replies: ReplySender) -> Self {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        let (jobs, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_session(id, backend, database, rx, replies));
        tracing::debug!(session = id, database, "Opened backend session");
        Self { id, jobs }
    }

    /// Session identifier, unique within the process
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Queue a command; its formatted reply is sent to the reply channel.
    ///
    /// Returns `false` if the session worker has already stopped.
    pub fn submit(&self, command: Command, adapter: Arc<dyn FormatAdapter>) -> bool {
        self.jobs.send(Job { command, adapter }).is_ok()
    }

    /// Whether the worker has stopped accepting commands
    pub fn is_closed(&self) -> bool {
        self.jobs.is_closed()
    }
}

async fn run_session(
    id: u64,
    backend: Arc<dyn Backend>,
    database: u32,
    mut jobs: mpsc::UnboundedReceiver<Job>,
    replies: ReplySender,
) {
    let mut session = match backend.connect(database).await {
        Ok(session) => session,
        Err(err) => {
            tracing::error!(session = id, database, error = %err, "Failed to open backend session");
            fail_pending(&mut jobs, &replies, &err).await;
            return;
        }
    };

    while let Some(Job { command, adapter }) = jobs.recv().await {
        let reply = match session.execute(&command).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::warn!(session = id, error = %err, "Backend session broke");
                // Closed before the error goes out, so the owner sees it stopped.
                jobs.close();
                let _ = replies.send(adapter.format_reply(&command, &Reply::error(err.to_string())));
                fail_pending(&mut jobs, &replies, &err).await;
                break;
            }
        };
        if replies.send(adapter.format_reply(&command, &reply)).is_err() {
            // Connection is gone; nobody will read further replies.
            break;
        }
    }

    session.release().await;
    tracing::debug!(session = id, "Released backend session");
}

/// Stop taking jobs and answer every queued one with `err`
async fn fail_pending(
    jobs: &mut mpsc::UnboundedReceiver<Job>,
    replies: &ReplySender,
    err: &BackendError,
) {
    jobs.close();
    let reply = Reply::error(err.to_string());
    while let Some(Job { command, adapter }) = jobs.recv().await {
        let _ = replies.send(adapter.format_reply(&command, &reply));
    }
}
