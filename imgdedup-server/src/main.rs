//! imgdedup Server - REST API for perceptual duplicate detection
//!
//! Exposes imgdedup-core via HTTP endpoints:
//! - POST /upload - Submit an image; stored unless a near-duplicate exists
//! - GET /health, GET /ready - Monitoring
//! - GET /openapi.json - API description

use std::net::SocketAddr;
use std::sync::Arc;

use imgdedup_core::{DatabaseConfig, MemoryRepository, Repository, StorageLayout};
use imgdedup_server::{create_router_with_config, AppState, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let config = Config::from_env();

    StorageLayout::new(&config.storage).ensure_dirs()?;
    tracing::info!(
        upload_dir = %config.storage.upload_dir.display(),
        temp_dir = %config.storage.temp_dir.display(),
        "Storage ready"
    );

    let repo = connect_repository(&config.database).await?;
    tracing::info!(
        backend = repo.backend(),
        threshold = config.detection.similarity_threshold,
        scan_limit = config.detection.scan_limit,
        "Repository ready"
    );

    let state = AppState::new(repo, &config);
    let app = create_router_with_config(state, &config);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("imgdedup-server v{} listening on http://{}", env!("CARGO_PKG_VERSION"), addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

#[cfg(feature = "postgres")]
async fn connect_repository(
    database: &DatabaseConfig,
) -> Result<Arc<dyn Repository>, Box<dyn std::error::Error>> {
    match &database.url {
        Some(url) => {
            let repo = imgdedup_core::PostgresRepository::connect(
                url,
                database.max_connections,
                database.min_connections,
            )
            .await?;
            Ok(Arc::new(repo))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory repository (records are lost on restart)");
            Ok(Arc::new(MemoryRepository::new()))
        }
    }
}

#[cfg(not(feature = "postgres"))]
async fn connect_repository(
    database: &DatabaseConfig,
) -> Result<Arc<dyn Repository>, Box<dyn std::error::Error>> {
    if database.url.is_some() {
        tracing::warn!("DATABASE_URL ignored: built without the postgres feature");
    }
    tracing::warn!("Using in-memory repository (records are lost on restart)");
    Ok(Arc::new(MemoryRepository::new()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections");
}
