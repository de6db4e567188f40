//! WebSocket connection configuration

/// Configuration applied to every upgraded connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WsConfig {
    /// Database index new backend sessions are opened on
    pub database: u32,
    /// Largest logical message accepted, in payload bytes
    pub max_message_size: Option<usize>,
}

impl WsConfig {
    /// Create a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the database index for backend sessions
    pub fn database(mut self, database: u32) -> Self {
        self.database = database;
        self
    }

    /// Limit the size of logical messages
    pub fn max_message_size(mut self, limit: Option<usize>) -> Self {
        self.max_message_size = limit;
        self
    }
}
