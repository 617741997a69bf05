//! Report service.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, instrument};

use super::ServiceError;
use crate::db::ReportStore;
use crate::models::Report;

#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn ReportStore>,
}

impl ReportService {
    #[must_use]
    pub fn new(store: Arc<dyn ReportStore>) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    pub async fn list(&self, date: NaiveDate) -> Result<Vec<Report>, ServiceError> {
        Ok(self.store.list_by_date(date).await?)
    }

    /// Rebuild the report rows for `date`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn generate(&self, date: NaiveDate) -> Result<u64, ServiceError> {
        let rows = self.store.generate(date).await?;
        info!(%date, rows, "Generated report");
        Ok(rows)
    }
}
