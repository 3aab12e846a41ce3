//! Blog API - HTTP server
//!
//! Accounts with short-lived access tokens and rotating refresh tokens,
//! plus categories and articles on top.
//!
//! Author: hephaex@gmail.com

pub mod audit;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod services;
pub mod state;

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    routing::get,
    Router,
};
use blog_core::config::ServerConfig;
use handlers::health;
use state::AppState;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Build the full application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);
    let cors = build_cors_layer(&state.config.server);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics))
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            routes::count_requests,
        ))
        .layer(TimeoutLayer::new(timeout))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the configured origins; invalid entries are skipped
pub fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(3600))
}

/// Resolves after `signal`, marking the server not ready first
pub async fn shutdown_signal<F>(state: Arc<AppState>, signal: F)
where
    F: Future<Output = ()>,
{
    signal.await;
    state.set_ready(false);
    tracing::info!("Shutdown signal received, draining connections");
}

/// Router over an in-memory store, for integration tests
#[cfg(feature = "test-utils")]
pub fn create_router_for_testing() -> Router {
    create_router(Arc::new(test_state()))
}

/// Application state over an in-memory store with cheap password hashing
#[cfg(feature = "test-utils")]
pub fn test_state() -> AppState {
    use blog_core::memory::MemoryStore;
    use blog_core::{AppConfig, AuthConfig, PasswordHashConfig};

    let mut auth = AuthConfig::new("integration-test-secret-that-is-long-enough");
    auth.password = PasswordHashConfig {
        memory_cost_kib: 1024,
        time_cost: 1,
        parallelism: 1,
    };

    match AppState::with_store(AppConfig::new(auth), Arc::new(MemoryStore::new())) {
        Ok(state) => state,
        Err(e) => panic!("test state: {e}"),
    }
}
