use cmdgate_server::config::load_dotenv;
use cmdgate_server::{logging, shutdown_signal, Environment, Gateway, GatewayConfig, MemoryBackend};
use std::sync::Arc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    load_dotenv();
    let env = Environment::current();
    let config = GatewayConfig::from_env()?;
    logging::init(&config, &env);
    tracing::info!(environment = %env, database = config.database, "Starting cmdgate");

    let gateway = Gateway::bind(config, Arc::new(MemoryBackend::new())).await?;
    gateway
        .serve_with_shutdown(shutdown_signal(tokio::signal::ctrl_c()))
        .await?;
    Ok(())
}
