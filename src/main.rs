//! Luminaria Server
//!
//! A self-hosted server for bulk extraction of hand-painted serial codes
//! from street-light fixture photos. Photos are uploaded in bulk, driven in
//! batches through a remote vision-language OCR call, and downloaded back
//! renamed to their extracted codes.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use luminaria_server::config::Config;
use luminaria_server::db;
use luminaria_server::extraction::GeminiExtractor;
use luminaria_server::routes;
use luminaria_server::state::AppState;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "luminaria_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing::info!("Starting Luminaria Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Extraction model: {}", config.extraction.model);
    if config.extraction.api_key.is_some() {
        tracing::info!("Using the environment API key as fallback credential");
    }

    // Initialize database
    let db_pool = db::create_pool(&config.database.url)
        .await
        .expect("Failed to initialize database");
    tracing::info!("Database initialized at {}", config.database.url);

    // Create application state
    let extractor = Arc::new(GeminiExtractor::new(&config.extraction));
    let state = AppState::new(config.clone(), db_pool, extractor);

    match state.restore().await {
        Ok(count) => tracing::info!("Restored {} images from storage", count),
        Err(e) => tracing::warn!("Failed to restore persisted images: {}", e),
    }

    // Build router
    let app = routes::app(state);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .expect("Invalid server address");
    tracing::info!("Luminaria Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    tracing::info!("Server shutdown complete");
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
