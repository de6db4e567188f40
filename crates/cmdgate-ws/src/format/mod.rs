//! Message formats
//!
//! A format adapter turns a client message into a [`Command`] and a backend
//! [`Reply`] into the payload sent back to the client. The adapter is picked
//! once per connection from the request path.

mod json;
mod raw;

pub use json::JsonFormat;
pub use raw::RawFormat;

use crate::{Command, Reply};
use bytes::Bytes;
use std::sync::Arc;

/// Two-function contract every message format implements
pub trait FormatAdapter: Send + Sync + 'static {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Parse a message payload into a command, or `None` if it is not one
    fn extract(&self, payload: &[u8]) -> Option<Command>;

    /// Render the reply to `command` as a message payload
    fn format_reply(&self, command: &Command, reply: &Reply) -> Bytes;
}

/// Message formats selectable by request path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// JSON arrays in, JSON objects out
    Json,
    /// RESP in, RESP out
    Raw,
}

impl Format {
    /// Select the format served at `path`.
    ///
    /// `/` and paths starting with `/.json` use JSON, paths starting with
    /// `/.raw` use RESP. Any other path has no format.
    pub fn from_path(path: &str) -> Option<Self> {
        if path == "/" || path.starts_with("/.json") {
            Some(Self::Json)
        } else if path.starts_with("/.raw") {
            Some(Self::Raw)
        } else {
            None
        }
    }

    /// Shared adapter implementing this format
    pub fn adapter(self) -> Arc<dyn FormatAdapter> {
        match self {
            Self::Json => Arc::new(JsonFormat),
            Self::Raw => Arc::new(RawFormat),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path("/"), Some(Format::Json));
        assert_eq!(Format::from_path("/.json"), Some(Format::Json));
        assert_eq!(Format::from_path("/.json?jsonp=cb"), Some(Format::Json));
        assert_eq!(Format::from_path("/.raw"), Some(Format::Raw));
        assert_eq!(Format::from_path("/.rawx"), Some(Format::Raw));
        assert_eq!(Format::from_path("/GET/key"), None);
        assert_eq!(Format::from_path("/.msgpack"), None);
        assert_eq!(Format::from_path(""), None);
    }

    #[test]
    fn test_adapter_names() {
        assert_eq!(Format::Json.adapter().name(), "json");
        assert_eq!(Format::Raw.adapter().name(), "raw");
    }
}
