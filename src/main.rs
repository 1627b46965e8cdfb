use anyhow::Result;
use clap::Parser;
use sol_token_dashboard::application::app::App;
use sol_token_dashboard::config::AppConfig;
use sol_token_dashboard::infrastructure::shutdown::ShutdownChannel;
use sol_token_dashboard::service;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::parse();
    tracing::info!("Using RPC endpoint {}", config.rpc_endpoint);

    let app = Arc::new(App::new(
        config.gateway(),
        config.listed_mints.clone(),
        config.explorer_cluster(),
    ));

    let shutdown = ShutdownChannel::default();

    // Start the API server
    let server_handle = tokio::spawn(service::api::start_server(
        shutdown.clone(),
        app,
        config.listen_port,
    ));

    // Wait for shutdown signal
    signal::ctrl_c().await?;
    tracing::warn!("Received Ctrl+C, shutting down...");
    shutdown.trigger();

    match server_handle.await? {
        Ok(()) => tracing::info!("Shutdown complete"),
        Err(e) => tracing::error!("API server error: {:?}", e),
    }
    Ok(())
}
