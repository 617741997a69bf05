//! Orderly command worker.
//!
//! Pops JSON commands off the `order` and `product` Redis lists and applies
//! them through the same services as the API server. Requires `REDIS_URL`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use secrecy::ExposeSecret;

use orderly_server::cache::{self, redis::create_pool};
use orderly_server::config::ServerConfig;
use orderly_server::db::{self, Stores};
use orderly_server::services::Services;
use orderly_server::shutdown::shutdown_signal;
use orderly_server::telemetry;
use orderly_server::worker::{CommandHandler, Consumer, RedisQueueSource};

#[tokio::main]
async fn main() {
    let config = ServerConfig::from_env().expect("Failed to load configuration");

    let _sentry_guard = telemetry::init_sentry(&config);
    telemetry::init_tracing(config.log_format, "orderly_server=info");

    let redis_url = config
        .redis_url
        .as_ref()
        .expect("REDIS_URL must be set for the worker");

    let pool = db::create_pool(&config.database_url, config.database_max_connections)
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    let cache = cache::connect(Some(redis_url)).expect("Failed to create cache");
    let services = Services::new(&Stores::postgres(&pool), cache);

    // Each blocked BLPOP holds one connection; keep it out of the cache pool.
    let queue_pool = create_pool(redis_url.expose_secret(), 2).expect("Failed to create queue pool");
    let source = RedisQueueSource::new(queue_pool);

    tracing::info!(
        concurrency = config.worker_concurrency,
        "orderly-worker consuming order and product queues"
    );
    let consumer = Consumer::new(CommandHandler::new(services), config.worker_concurrency);
    let handled = consumer.run(source, shutdown_signal()).await;
    tracing::info!(handled, "orderly-worker stopped");
}
