//! Report route handlers.

use axum::extract::State;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::Result;
use crate::extract::{Json, Query};
use crate::models::Report;
use crate::state::AppState;

/// Query parameters for `GET /report`.
#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    /// `YYYY-MM-DD`
    pub date: NaiveDate,
}

/// `GET /report?date=YYYY-MM-DD`
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Vec<Report>>> {
    Ok(Json(state.services().reports.list(query.date).await?))
}
