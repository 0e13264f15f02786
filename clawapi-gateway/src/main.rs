use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clawapi_gateway::server;
use clawapi_gateway::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration before tracing so the configured level applies
    let config = clawapi_core::Config::load()?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.settings.logging.level.clone().into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Configuration loaded from {}", config.paths.root().display());

    let bind_addr = config.bind_addr()?;
    if !config.is_loopback() {
        warn!(
            "Listening on {} exposes every stored session to the network",
            bind_addr
        );
    }

    let state = Arc::new(AppState::from_config(&config)?);
    let active = state.runtime.len();
    info!("{} provider(s) active", active);

    server::run(Arc::clone(&state), &bind_addr, shutdown_signal()).await?;

    drop(state);
    info!("Provider runtime torn down ({} provider(s))", active);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
