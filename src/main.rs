mod api_doc;
mod app;
mod config;
mod dispatcher;
mod error;
mod handlers;
mod ids;
mod models;
mod operations;
mod response;
mod routes;
mod state;
mod store;

use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use config::{Config, StoreBackend};
use ids::UuidGenerator;
use state::AppState;
use store::{ItemStore, MemoryStore, SpannerStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("rust-spanner-items starting");

    let config = Config::from_env()?;
    config.log_startup();

    let store: Arc<dyn ItemStore> = match config.store_backend {
        StoreBackend::Spanner => {
            let spanner = config
                .spanner
                .as_ref()
                .context("Spanner backend selected without Spanner settings")?;
            Arc::new(SpannerStore::connect(spanner, &config.items_table).await?)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory item store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let app = app::build_router(AppState::new(store, Arc::new(UuidGenerator)));

    let addr = format!("{}:{}", config.service_host, config.service_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("rust-spanner-items stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
