use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use carsearch_common::AppConfig;
use carsearch_core::SearchDeps;
use carsearch_server::routes;

#[derive(Parser)]
#[command(name = "carsearch-server", about = "Natural-language car search API")]
struct Cli {
    /// Listen host (overrides WEB_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Listen port (overrides WEB_PORT)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting carsearch-server");

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    config.log_redacted();

    let deps = Arc::new(SearchDeps::from_config(&config)?);
    let app = routes::build_router(deps, &config.allowed_origins);

    let host = cli.host.unwrap_or_else(|| config.web_host.clone());
    let port = cli.port.unwrap_or(config.web_port);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(addr = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}
