pub mod handlers;

use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::employee::EmployeeRow;

/// Loads an employee and checks the caller may see its company.
pub async fn fetch_employee(
    pool: &PgPool,
    user: &CurrentUser,
    employee_id: Uuid,
) -> Result<EmployeeRow, AppError> {
    let employee = sqlx::query_as::<_, EmployeeRow>("SELECT * FROM employees WHERE id = $1")
        .bind(employee_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Employee {employee_id} not found")))?;
    user.ensure_company(employee.company_id)?;
    Ok(employee)
}
