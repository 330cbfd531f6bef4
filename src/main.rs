use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use f1gpt_backend::core::config::service::parse_config;
use f1gpt_backend::core::config::{AppPaths, ConfigService};
use f1gpt_backend::core::logging;
use f1gpt_backend::server;
use f1gpt_backend::state::error::InitializationError;
use f1gpt_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    let config_service = ConfigService::new(Arc::new(AppPaths::new()));
    let raw_config = config_service
        .load_raw()
        .map_err(InitializationError::Config)?;
    let config = parse_config(raw_config.clone()).map_err(InitializationError::Config)?;

    logging::init(config.logging.dir.as_deref(), "server.log");
    if let Ok(path) = dotenv {
        tracing::info!("Loaded environment from {}", path.display());
    }
    tracing::debug!(
        "Effective config: {}",
        config_service.redact_sensitive_values(&raw_config)
    );

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::initialize(config)?;

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    let app: Router = server::router::router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        return;
    }
    tracing::info!("Shutdown signal received");
}
