//! Orderly API server.
//!
//! Serves the users, products, addresses, orders and reports API on port
//! 3000 (configurable).
//!
//! # Architecture
//!
//! - Axum web framework, JSON in and out
//! - `PostgreSQL` through `sqlx` for all entities
//! - Redis (or an in-process `moka` cache) for user and product reads
//!
//! Migrations are NOT run on startup. Run them explicitly via:
//! `cargo run -p orderly-cli -- migrate`

#![cfg_attr(not(test), forbid(unsafe_code))]

use orderly_server::config::ServerConfig;
use orderly_server::db::{self, Stores};
use orderly_server::shutdown::shutdown_signal;
use orderly_server::state::AppState;
use orderly_server::{cache, routes, telemetry};

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = ServerConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = telemetry::init_sentry(&config);
    telemetry::init_tracing(config.log_format, "orderly_server=info,tower_http=debug");

    let pool = db::create_pool(&config.database_url, config.database_max_connections)
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    let cache = cache::connect(config.redis_url.as_ref()).expect("Failed to create cache");
    let state = AppState::new(&Stores::postgres(&pool), cache);

    let app = routes::app(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    tracing::info!("orderly-server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}
