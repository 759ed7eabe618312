use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::attendance::time_calc::{BreakPeriod, Shift};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttendanceRecordRow {
    pub id: Uuid,
    pub company_id: Uuid,
    pub employee_id: Uuid,
    pub work_date: NaiveDate,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub breaks: Json<Vec<BreakPeriod>>,
    pub status: String,
    pub worked_minutes: i64,
    pub overtime_minutes: i64,
    pub total_hours: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AttendanceRecordRow {
    pub fn shift(&self) -> Shift {
        Shift {
            check_in: self.check_in,
            check_out: self.check_out,
            breaks: self.breaks.0.clone(),
        }
    }
}
