//! Tracing subscriber setup

use crate::config::{Environment, GatewayConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` if set, otherwise from the gateway
/// configuration. Does nothing if a subscriber is already installed.
pub fn init(config: &GatewayConfig, env: &Environment) {
    let _ = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_filter(env))),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
