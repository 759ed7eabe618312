pub mod calc;
pub mod handlers;
pub mod payslip;

use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{CurrentUser, Permission};
use crate::errors::AppError;
use crate::models::payroll::PayrollRow;
use crate::payroll::calc::PayrollStatus;

/// Loads a payroll the caller may see. Employees only see their own
/// released payrolls; anything else reads as missing.
pub async fn fetch_payroll(
    pool: &PgPool,
    user: &CurrentUser,
    payroll_id: Uuid,
) -> Result<PayrollRow, AppError> {
    let not_found = || AppError::NotFound(format!("Payroll {payroll_id} not found"));
    let payroll = sqlx::query_as::<_, PayrollRow>("SELECT * FROM payrolls WHERE id = $1")
        .bind(payroll_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(not_found)?;
    user.ensure_company(payroll.company_id)?;

    if !user.can(Permission::ManagePayroll) {
        user.require(Permission::ViewOwnPayroll)?;
        let status: PayrollStatus = payroll.status.parse()?;
        if !user.is_self(payroll.employee_id) || !status.is_released() {
            return Err(not_found());
        }
    }
    Ok(payroll)
}
