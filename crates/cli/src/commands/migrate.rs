//! Database migration command.
//!
//! Migrations live in `crates/server/migrations/` and are embedded into the
//! binary at compile time.

use secrecy::SecretString;

use super::CliError;

/// Run every pending migration against `database_url`.
///
/// # Errors
///
/// Returns `CliError` if the database is unreachable or a migration fails.
pub async fn run(database_url: &SecretString) -> Result<(), CliError> {
    tracing::info!("Connecting to database...");
    let pool = orderly_server::db::create_pool(database_url, 1).await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
