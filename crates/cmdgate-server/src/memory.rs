//! In-memory command backend
//!
//! A small key-value store shared by every connection. Each database index
//! is a separate keyspace; a session starts on the database it was opened
//! with and can move with `SELECT`.

use async_trait::async_trait;
use bytes::Bytes;
use cmdgate_ws::{Backend, BackendError, BackendSession, Command, Reply};
use dashmap::DashMap;
use std::sync::Arc;

/// Default number of databases
pub const DEFAULT_DATABASES: u32 = 16;

type Store = DashMap<(u32, Bytes), Bytes>;

/// Backend keeping all data in a shared concurrent map
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    store: Arc<Store>,
    databases: u32,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create an empty backend with [`DEFAULT_DATABASES`] databases
    pub fn new() -> Self {
        Self::with_databases(DEFAULT_DATABASES)
    }

    /// Create an empty backend with `databases` databases
    pub fn with_databases(databases: u32) -> Self {
        Self {
            store: Arc::new(DashMap::new()),
            databases,
        }
    }

    /// Number of keys across all databases
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether no database holds any key
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn connect(&self, database: u32) -> Result<Box<dyn BackendSession>, BackendError> {
        if database >= self.databases {
            return Err(BackendError::ConnectFailed(format!(
                "database {database} out of range (0..{})",
                self.databases
            )));
        }
        Ok(Box::new(MemorySession {
            store: self.store.clone(),
            database,
            databases: self.databases,
        }))
    }
}

struct MemorySession {
    store: Arc<Store>,
    database: u32,
    databases: u32,
}

fn wrong_arity(name: &str) -> Reply {
    Reply::error(format!(
        "ERR wrong number of arguments for '{}' command",
        name.to_ascii_lowercase()
    ))
}

fn parse_int<T: std::str::FromStr>(arg: &[u8]) -> Option<T> {
    std::str::from_utf8(arg).ok()?.parse().ok()
}

impl MemorySession {
    fn key(&self, key: &Bytes) -> (u32, Bytes) {
        (self.database, key.clone())
    }

    fn run(&mut self, name: &str, args: &[Bytes]) -> Reply {
        match (name, args) {
            ("PING", []) => Reply::Status("PONG".to_string()),
            ("PING", [msg]) | ("ECHO", [msg]) => Reply::bulk(msg.clone()),
            ("GET", [key]) => Reply::Bulk(self.store.get(&self.key(key)).map(|v| v.value().clone())),
            ("SET", [key, value]) => {
                self.store.insert(self.key(key), value.clone());
                Reply::ok()
            }
            ("DEL", keys) if !keys.is_empty() => {
                let removed = keys
                    .iter()
                    .filter(|key| self.store.remove(&self.key(key)).is_some())
                    .count();
                Reply::Integer(removed as i64)
            }
            ("EXISTS", keys) if !keys.is_empty() => {
                let found = keys
                    .iter()
                    .filter(|key| self.store.contains_key(&self.key(key)))
                    .count();
                Reply::Integer(found as i64)
            }
            ("INCR", [key]) => self.incr(key),
            ("SELECT", [index]) => match parse_int::<u32>(index) {
                Some(index) if index < self.databases => {
                    self.database = index;
                    Reply::ok()
                }
                Some(_) => Reply::error("ERR DB index is out of range"),
                None => Reply::error("ERR value is not an integer or out of range"),
            },
            ("PING" | "ECHO" | "GET" | "SET" | "DEL" | "EXISTS" | "INCR" | "SELECT", _) => {
                wrong_arity(name)
            }
            _ => Reply::error(format!("ERR unknown command '{name}'")),
        }
    }

    fn incr(&self, key: &Bytes) -> Reply {
        let mut entry = self.store.entry(self.key(key)).or_insert_with(|| Bytes::from_static(b"0"));
        match parse_int::<i64>(entry.value()).and_then(|n| n.checked_add(1)) {
            Some(n) => {
                *entry.value_mut() = Bytes::from(n.to_string());
                Reply::Integer(n)
            }
            None => Reply::error("ERR value is not an integer or out of range"),
        }
    }
}

#[async_trait]
impl BackendSession for MemorySession {
    async fn execute(&mut self, command: &Command) -> Result<Reply, BackendError> {
        let Some((name, args)) = command.args.split_first() else {
            return Ok(Reply::error("ERR empty command"));
        };
        let name = String::from_utf8_lossy(name).to_ascii_uppercase();
        Ok(self.run(&name, args))
    }

    async fn release(&mut self) {
        tracing::trace!(database = self.database, "Memory session released");
    }
}
