//! Blog API Server
//!
//! Author: hephaex@gmail.com

use anyhow::Context;
use blog_api::{create_router, shutdown_signal, state::AppState};
use blog_core::config::LoggingConfig;
use blog_core::{AppConfig, PgStore};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "blog_api={level},blog_core={level},audit=info,tower_http=debug",
            level = logging.level
        )
        .into()
    });

    if logging.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Configuration errors are fatal before anything else starts
    let config = AppConfig::load().context("loading configuration")?;
    init_tracing(&config.logging);
    if config.auth.has_short_secret() {
        tracing::warn!("JWT_SECRET is shorter than 32 bytes");
    }

    let store = PgStore::connect(&config.database.url, config.database.max_connections)
        .await
        .context("connecting to PostgreSQL")?;
    store.migrate().await.context("running migrations")?;
    tracing::info!("Database ready");

    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState::with_store(config, Arc::new(store.clone()))
        .context("building application state")?
        .with_database(store);
    let state = Arc::new(state);

    let app = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Blog API Server starting on http://{}", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.clone(), ctrl_c()))
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
