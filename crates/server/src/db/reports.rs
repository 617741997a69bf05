//! Report repository: reads report rows and runs the nightly aggregation.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

use super::{RepositoryError, ReportStore};
use crate::models::Report;

/// Repository for report database operations.
#[derive(Clone)]
pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    /// Create a new report repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportStore for ReportRepository {
    async fn list_by_date(&self, date: NaiveDate) -> Result<Vec<Report>, RepositoryError> {
        let reports = sqlx::query_as::<_, Report>(
            "SELECT id, report_at, order_id, count_product FROM reports \
             WHERE report_at = $1 ORDER BY id",
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(reports)
    }

    async fn generate(&self, date: NaiveDate) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Re-running for the same date replaces its rows
        sqlx::query("DELETE FROM reports WHERE report_at = $1")
            .bind(date)
            .execute(&mut *tx)
            .await?;

        let inserted = sqlx::query(
            "INSERT INTO reports (report_at, order_id, count_product) \
             SELECT $1, order_id, SUM(quantity)::BIGINT \
             FROM order_items GROUP BY order_id ORDER BY order_id",
        )
        .bind(date)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        Ok(inserted)
    }
}
