//! Backend commands, replies, and the command-execution contract

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Where a command came from; decides how its reply is framed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandOrigin {
    /// Plain HTTP request
    #[default]
    Http,
    /// WebSocket message; replies are sent back as WebSocket frames
    WebSocket,
}

/// A backend command extracted from a client message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command arguments; the first one is the command name
    pub args: Vec<Bytes>,
    /// Origin tag
    pub origin: CommandOrigin,
}

impl Command {
    /// Create a command from its arguments
    pub fn new<I, A>(args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Bytes>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            origin: CommandOrigin::default(),
        }
    }

    /// Tag the command with its origin
    pub fn with_origin(mut self, origin: CommandOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Command name, as sent by the client
    pub fn name(&self) -> &[u8] {
        self.args.first().map(Bytes::as_ref).unwrap_or_default()
    }

    /// Command name as text, lossily decoded
    pub fn name_lossy(&self) -> String {
        String::from_utf8_lossy(self.name()).into_owned()
    }

    /// Whether the command was received over WebSocket
    pub fn is_websocket(&self) -> bool {
        self.origin == CommandOrigin::WebSocket
    }
}

/// Result of executing a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Status line, such as `OK` or `PONG`
    Status(String),
    /// Error reported by the backend
    Error(String),
    /// Integer result
    Integer(i64),
    /// Binary-safe string; `None` for a missing value
    Bulk(Option<Bytes>),
    /// Ordered list of replies
    Array(Vec<Reply>),
}

impl Reply {
    /// Status `OK`
    pub fn ok() -> Self {
        Self::Status("OK".to_string())
    }

    /// Create an error reply
    pub fn error(msg: impl Into<String>) -> Self {
        Self::Error(msg.into())
    }

    /// Create a bulk reply
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Self::Bulk(Some(data.into()))
    }

    /// Missing value
    pub fn nil() -> Self {
        Self::Bulk(None)
    }
}

/// Error type for the command-execution subsystem
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// No execution context could be created
    #[error("Failed to connect to backend: {0}")]
    ConnectFailed(String),

    /// The execution context broke while running a command
    #[error("Backend connection lost: {0}")]
    ConnectionLost(String),
}

/// The command-execution subsystem
///
/// # Example
///
/// ```rust,ignore
/// struct Echo;
///
/// #[async_trait]
/// impl Backend for Echo {
///     async fn connect(&self, _database: u32) -> Result<Box<dyn BackendSession>, BackendError> {
///         Ok(Box::new(EchoSession))
///     }
/// }
/// ```
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Open a dedicated execution context on `database`
    async fn connect(&self, database: u32) -> Result<Box<dyn BackendSession>, BackendError>;
}

/// A stable execution context bound to one client connection
#[async_trait]
pub trait BackendSession: Send {
    /// Run one command
    async fn execute(&mut self, command: &Command) -> Result<Reply, BackendError>;

    /// Release the context; called once when the owning connection is gone
    async fn release(&mut self) {}
}
