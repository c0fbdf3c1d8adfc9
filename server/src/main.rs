mod config;

use config::{ServerConfig, StoreBackend};
use datastore::{InMemoryStore, MongoStore, StoreError};
use resource_service::{SharedStore, create_router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Open the configured store. The store is created once here and shared by
/// every request for the lifetime of the process.
async fn connect_store(config: &ServerConfig) -> Result<SharedStore, StoreError> {
    match config.store {
        StoreBackend::MongoDb => {
            let store = MongoStore::connect(&config.mongodb_uri, &config.database).await?;
            info!(uri = %config.mongodb_uri, database = %config.database, "Connected to MongoDB");
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory store; data is lost on exit");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    info!(?config, "Configuration loaded");

    // No listener is started unless the store is reachable
    let store = connect_store(&config).await.map_err(|e| {
        error!(error = %e, "Error connecting to MongoDB");
        e
    })?;

    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!("Server running at http://localhost:{}", config.port);

    axum::serve(listener, create_router(store))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
