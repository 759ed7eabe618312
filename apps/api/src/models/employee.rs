use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmployeeRow {
    pub id: Uuid,
    pub company_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub position: String,
    pub department: String,
    pub base_salary_cents: i64,
    pub hire_date: NaiveDate,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EmployeeRow {
    /// Inactive employees cannot clock in or be put on a new payroll.
    pub fn ensure_active(&self) -> Result<(), AppError> {
        if self.active {
            Ok(())
        } else {
            Err(AppError::Validation(format!("Employee {} is inactive", self.id)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee(active: bool) -> EmployeeRow {
        EmployeeRow {
            id: Uuid::from_u128(9),
            company_id: Uuid::nil(),
            full_name: "Lucía Pérez".to_string(),
            email: "lucia@example.com".to_string(),
            position: "Analista".to_string(),
            department: "Finanzas".to_string(),
            base_salary_cents: 15_000_000,
            hire_date: NaiveDate::from_ymd_opt(2023, 1, 9).unwrap(),
            active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_ensure_active() {
        assert!(employee(true).ensure_active().is_ok());
        assert!(matches!(
            employee(false).ensure_active(),
            Err(AppError::Validation(msg)) if msg.contains("inactive")
        ));
    }
}
