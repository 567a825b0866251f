// crates/server/src/main.rs
//! Image-refine server binary.

use anyhow::{Context, Result};
use clap::Parser;
use image_refine_server::{create_app, init_metrics, AppState, Cli};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,image_refine_server=info,tower_http=info".into()),
        )
        .init();

    let config = Cli::parse().into_config();
    init_metrics();

    let addr = config.bind;
    tracing::info!(
        max_upload_bytes = config.max_upload_bytes,
        max_dimension = config.enhance.max_dimension,
        pacing_ms = config.plan.total_pacing().as_millis() as u64,
        "Configuration loaded"
    );

    let app = create_app(AppState::new(config));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("image-refine listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
