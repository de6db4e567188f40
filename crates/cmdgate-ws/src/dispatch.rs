//! Message dispatch
//!
//! Routes each complete message to the format adapter chosen by the request
//! path, turns it into a command, and submits it on the connection's sticky
//! backend session. A session that has stopped is replaced by a fresh one on
//! the next message.

use crate::format::{Format, FormatAdapter};
use crate::session::{ReplySender, SessionHandle};
use crate::{Backend, CommandOrigin, Result, WebSocketError};
use std::sync::Arc;

/// Per-connection dispatcher
pub struct Dispatcher {
    path: String,
    adapter: Option<Arc<dyn FormatAdapter>>,
    backend: Arc<dyn Backend>,
    database: u32,
    replies: ReplySender,
    session: Option<SessionHandle>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("path", &self.path)
            .field("adapter", &self.adapter.as_ref().map(|a| a.name()))
            .field("database", &self.database)
            .field("session", &self.session)
            .finish()
    }
}

impl Dispatcher {
    /// Create the dispatcher for a connection upgraded on `path`
    pub fn new(
        path: impl Into<String>,
        backend: Arc<dyn Backend>,
        database: u32,
        replies: ReplySender,
    ) -> Self {
        let path = path.into();
        let adapter = Format::from_path(&path).map(Format::adapter);
        Self {
            path,
            adapter,
            backend,
            database,
            replies,
            session: None,
        }
    }

    /// Request path fixed at upgrade time
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The connection's backend session, once one has been opened
    pub fn session(&self) -> Option<&SessionHandle> {
        self.session.as_ref()
    }

    /// Dispatch one complete message payload.
    ///
    /// Errors are dispatch failures: the message is dropped but the
    /// connection stays usable. The reply arrives later on the connection's
    /// reply channel.
    pub fn dispatch(&mut self, payload: &[u8]) -> Result<()> {
        let adapter = self
            .adapter
            .clone()
            .ok_or_else(|| WebSocketError::unroutable_path(&self.path))?;

        let command = adapter
            .extract(payload)
            .ok_or(WebSocketError::ExtractionFailed(payload.len()))?
            .with_origin(CommandOrigin::WebSocket);

        if let Some(stopped) = self.session.as_ref().filter(|session| session.is_closed()) {
            tracing::debug!(session = stopped.id(), path = %self.path, "Backend session stopped, reopening");
            self.session = None;
        }

        let (backend, database, replies) = (&self.backend, self.database, &self.replies);
        let session = self
            .session
            .get_or_insert_with(|| SessionHandle::open(backend.clone(), database, replies.clone()));

        tracing::debug!(
            session = session.id(),
            format = adapter.name(),
            command = %command.name_lossy(),
            "Dispatching command"
        );
        if session.submit(command, adapter) {
            Ok(())
        } else {
            let id = session.id();
            self.session = None;
            Err(WebSocketError::backend_unavailable(format!(
                "session {id} has stopped"
            )))
        }
    }

    /// Drop the session handle, letting the backend release the session
    pub fn close(&mut self) {
        self.session = None;
    }
}
