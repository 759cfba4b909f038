//! HearLearn Server - REST API and ingestion worker

use anyhow::{Context, Result};
use hearlearn_core::Config;
use hearlearn_server::{routes, state};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hearlearn_server=debug,hearlearn_core=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let addr = config.bind;

    // Create application state and start ingesting
    let state = state::AppState::new(&config).await?;
    let shutdown = CancellationToken::new();
    let worker = state.start_worker(shutdown.clone());

    // Build router
    let app = routes::create_router(state);

    // Start server
    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    worker.await.context("Ingestion worker panicked")?;
    tracing::info!("Server stopped");
    Ok(())
}
