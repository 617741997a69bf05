//! Nightly order report rows.

use chrono::NaiveDate;
use orderly_core::{OrderId, ReportId};
use serde::{Deserialize, Serialize};

/// Total units ordered in one order, as of `report_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Report {
    pub id: ReportId,
    pub report_at: NaiveDate,
    pub order_id: OrderId,
    pub count_product: i64,
}
