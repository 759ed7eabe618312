use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::attendance::time_calc::AttendancePolicy;
use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompanyRow {
    pub id: Uuid,
    pub name: String,
    pub utc_offset_minutes: i32,
    /// Local start of the working day, `HH:MM`.
    pub work_start: String,
    pub late_grace_minutes: i32,
    pub half_day_minutes: i32,
    pub full_day_minutes: i32,
    pub created_at: DateTime<Utc>,
}

impl CompanyRow {
    pub fn policy(&self) -> Result<AttendancePolicy, AppError> {
        let work_start = NaiveTime::parse_from_str(&self.work_start, "%H:%M").map_err(|e| {
            AppError::Internal(anyhow::anyhow!(
                "Company {} has an invalid work_start '{}': {e}",
                self.id,
                self.work_start
            ))
        })?;
        Ok(AttendancePolicy {
            work_start,
            late_grace_minutes: self.late_grace_minutes.into(),
            half_day_minutes: self.half_day_minutes.into(),
            full_day_minutes: self.full_day_minutes.into(),
        })
    }
}
