//! Daily report commands.
//!
//! `generate` is what the nightly scheduler runs (`0 0 * * *`). Re-running
//! it for the same day replaces that day's rows.

use std::sync::Arc;

use chrono::NaiveDate;
use secrecy::SecretString;

use orderly_server::db::{self, ReportRepository};
use orderly_server::services::ReportService;

use super::CliError;

async fn service(database_url: &SecretString) -> Result<ReportService, CliError> {
    let pool = db::create_pool(database_url, 2).await?;
    Ok(ReportService::new(Arc::new(ReportRepository::new(pool))))
}

/// Rebuild the report rows for `date`.
///
/// # Errors
///
/// Returns `CliError` if the database is unreachable or the rebuild fails.
pub async fn generate(database_url: &SecretString, date: NaiveDate) -> Result<(), CliError> {
    let rows = service(database_url).await?.generate(date).await?;
    tracing::info!("Reports for {date} created ({rows} orders)");
    Ok(())
}

/// Print the report rows for `date` as JSON lines.
///
/// # Errors
///
/// Returns `CliError` if the database is unreachable.
pub async fn show(database_url: &SecretString, date: NaiveDate) -> Result<(), CliError> {
    let reports = service(database_url).await?.list(date).await?;
    if reports.is_empty() {
        tracing::info!("No reports for {date}");
    }

    #[allow(clippy::print_stdout)]
    for report in &reports {
        println!("{}", serde_json::to_string(report)?);
    }
    Ok(())
}
