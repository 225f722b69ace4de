use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

mod api;
mod config;
mod error;
mod normalize;
mod ocr;
mod results;
mod service;
mod storage;

use crate::config::StaticConfig;
use crate::service::LectorService;
use crate::service::worker::start_ocr_worker;

// Re-export config crate types to avoid namespace collision
use ::config::{Config as ConfigBuilder, Environment, File};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_logging();

    info!("Starting Lector service v{}", env!("CARGO_PKG_VERSION"));

    let static_config: StaticConfig = ConfigBuilder::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(
            Environment::with_prefix("LECTOR")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    info!(
        host = %static_config.server.host,
        port = static_config.server.port,
        "Static configuration loaded"
    );

    // Ensure the storage root exists
    std::fs::create_dir_all(&static_config.storage.data_dir)?;

    let service = Arc::new(LectorService::new(static_config));

    // One process-wide stop signal: covers the queue wait and the OCR poll
    // loop of an in-flight job.
    let shutdown = CancellationToken::new();

    // Start the OCR worker
    let processor = service.ocr_processor()?;
    let worker = start_ocr_worker(service.queue.clone(), processor, shutdown.clone());

    // Build the router
    let app = api::router(service.clone());

    // Start the server
    let addr = format!(
        "{}:{}",
        service.config.server.host, service.config.server.port
    );
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    // The worker finishes its in-flight job, then exits; remaining queued
    // jobs are dropped with the process.
    worker.await?;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
    shutdown.cancel();
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let format = fmt::format()
        .with_target(true)
        .with_thread_ids(true)
        .compact();

    // Use RUST_LOG if set, otherwise default to info level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("lector_service=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter)
        .init();
}
