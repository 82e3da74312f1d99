use anyhow::{Context, Result};
use axum::serve;
use dotenvy::dotenv;
use link_manager::config::{AppConfig, StorageBackend};
use link_manager::memory::MemoryStore;
use link_manager::store::{Repository, Store};
use link_manager::{create_router, AppState};
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_TRACING_LEVEL: &str = "link_manager=debug,tower_http=info";

#[tokio::main]
async fn main() -> Result<()> {
    _ = dotenv();
    configure_tracing();
    let config = AppConfig::from_env()?;
    let store = create_store(&config).await?;
    tracing::info!("Using {} storage backend", store.backend_name());
    let repository = Repository::new(
        store,
        config.validation,
        Duration::from_millis(config.store_timeout_ms),
    );
    let router = create_router(AppState { repository }, &config.cors);
    let listener = create_listener(&config.server_address).await?;
    serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")
}

fn configure_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or(DEFAULT_TRACING_LEVEL.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn create_store(config: &AppConfig) -> Result<Store> {
    match config.storage_backend {
        StorageBackend::Memory => Ok(Store::Memory(MemoryStore::new())),
        StorageBackend::Postgres => {
            let db_connection_pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .acquire_timeout(Duration::from_millis(config.store_timeout_ms))
                .connect(&config.database_url)
                .await
                .context("Creating database connection pool failed")?;
            sqlx::migrate!("./migrations")
                .run(&db_connection_pool)
                .await
                .context("Running database migrations failed")?;
            tracing::info!("Database connected successfully");
            Ok(Store::Postgres(db_connection_pool))
        }
    }
}

async fn create_listener(server_address: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(server_address)
        .await
        .context("Creating tcp listener failed")?;
    tracing::info!("Listening on address: {}", server_address);
    Ok(listener)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Listening for shutdown signal failed: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
