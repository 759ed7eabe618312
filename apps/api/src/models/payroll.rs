use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::payroll::calc::LineItem;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PayrollRow {
    pub id: Uuid,
    pub company_id: Uuid,
    pub employee_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub base_cents: i64,
    pub line_items: Json<Vec<LineItem>>,
    pub bonus_cents: i64,
    pub deduction_cents: i64,
    pub gross_cents: i64,
    pub net_cents: i64,
    pub status: String,
    pub payslip_s3_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
