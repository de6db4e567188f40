//! # cmdgate-server
//!
//! WebSocket gateway in front of a command-execution backend.
//!
//! Accepts TCP connections, reads the HTTP upgrade request, and hands each
//! upgraded connection to the [`cmdgate_ws`] protocol core. Ships with an
//! in-memory backend so the gateway runs standalone.
//!
//! ```rust,ignore
//! use cmdgate_server::{Gateway, GatewayConfig, MemoryBackend};
//!
//! let gateway = Gateway::bind(GatewayConfig::default(), Arc::new(MemoryBackend::new())).await?;
//! gateway.serve().await?;
//! ```

pub mod config;
pub mod logging;
pub mod memory;
pub mod request;
mod server;

pub use config::{ConfigError, Environment, GatewayConfig};
pub use memory::MemoryBackend;
pub use server::{shutdown_signal, Gateway, ServerError};
