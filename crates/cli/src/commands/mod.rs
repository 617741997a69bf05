//! CLI subcommands.

pub mod migrate;
pub mod report;
pub mod send;

use thiserror::Error;

use orderly_server::cache::CacheError;
use orderly_server::services::ServiceError;
use orderly_server::worker::CommandError;

/// Errors from any subcommand.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Queue error: {0}")]
    Queue(#[from] CacheError),

    /// The payload would be dropped by the worker.
    #[error("Refusing to send: {0}")]
    InvalidCommand(#[from] CommandError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
