use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::types::Json as SqlJson;
use tracing::info;
use uuid::Uuid;

use crate::auth::{CurrentUser, Permission};
use crate::companies::fetch_company;
use crate::employees::fetch_employee;
use crate::errors::AppError;
use crate::models::payroll::PayrollRow;
use crate::payroll::calc::{compute_totals, LineItem, PayrollError, PayrollStatus};
use crate::payroll::fetch_payroll;
use crate::payroll::payslip::{payslip_key, render_payslip};
use crate::state::AppState;
use crate::storage::put_markdown;

#[derive(Debug, Deserialize)]
pub struct CreatePayrollRequest {
    pub employee_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    /// Defaults to the employee's base salary.
    pub base_cents: Option<i64>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

#[derive(Debug, Deserialize)]
pub struct ListPayrollsQuery {
    pub company_id: Option<Uuid>,
    pub employee_id: Option<Uuid>,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceItemsRequest {
    pub line_items: Vec<LineItem>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub status: String,
}

pub fn validate_period(start: NaiveDate, end: NaiveDate) -> Result<(), AppError> {
    if start > end {
        return Err(AppError::Validation(
            "period_start must not be after period_end".to_string(),
        ));
    }
    Ok(())
}

/// POST /api/v1/payrolls
pub async fn handle_create_payroll(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreatePayrollRequest>,
) -> Result<(StatusCode, Json<PayrollRow>), AppError> {
    user.require(Permission::ManagePayroll)?;
    validate_period(req.period_start, req.period_end)?;
    let employee = fetch_employee(&state.db, &user, req.employee_id).await?;
    employee.ensure_active()?;

    let base_cents = req.base_cents.unwrap_or(employee.base_salary_cents);
    let totals = compute_totals(base_cents, &req.line_items)?;

    let payroll = sqlx::query_as::<_, PayrollRow>(
        r#"
        INSERT INTO payrolls
            (id, company_id, employee_id, period_start, period_end, base_cents, line_items,
             bonus_cents, deduction_cents, gross_cents, net_cents, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(employee.company_id)
    .bind(employee.id)
    .bind(req.period_start)
    .bind(req.period_end)
    .bind(totals.base_cents)
    .bind(SqlJson(&req.line_items))
    .bind(totals.bonus_cents)
    .bind(totals.deduction_cents)
    .bind(totals.gross_cents)
    .bind(totals.net_cents)
    .bind(PayrollStatus::Draft.as_str())
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        AppError::from_insert(
            e,
            format!(
                "Employee {} already has a payroll for {} to {}",
                employee.id, req.period_start, req.period_end
            ),
        )
    })?;

    info!(
        "Draft payroll {} for employee {} ({} to {}), net {}",
        payroll.id, employee.id, payroll.period_start, payroll.period_end, payroll.net_cents
    );
    Ok((StatusCode::CREATED, Json(payroll)))
}

/// GET /api/v1/payrolls
pub async fn handle_list_payrolls(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<ListPayrollsQuery>,
) -> Result<Json<Vec<PayrollRow>>, AppError> {
    let (company_id, employee_id, released_only) = if user.can(Permission::ManagePayroll) {
        (user.resolve_company(params.company_id)?, params.employee_id, false)
    } else {
        user.require(Permission::ViewOwnPayroll)?;
        let own = user.target_employee(None)?;
        if params.employee_id.is_some_and(|id| id != own) {
            return Err(AppError::Forbidden);
        }
        (user.resolve_company(None)?, Some(own), true)
    };

    let rows = sqlx::query_as::<_, PayrollRow>(
        r#"
        SELECT * FROM payrolls
        WHERE company_id = $1
          AND ($2::uuid IS NULL OR employee_id = $2)
          AND ($3::date IS NULL OR period_start >= $3)
          AND ($4::date IS NULL OR period_end <= $4)
          AND (NOT $5 OR status <> 'draft')
        ORDER BY period_start DESC, employee_id
        "#,
    )
    .bind(company_id)
    .bind(employee_id)
    .bind(params.period_start)
    .bind(params.period_end)
    .bind(released_only)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// GET /api/v1/payrolls/:id
pub async fn handle_get_payroll(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(payroll_id): Path<Uuid>,
) -> Result<Json<PayrollRow>, AppError> {
    Ok(Json(fetch_payroll(&state.db, &user, payroll_id).await?))
}

/// PUT /api/v1/payrolls/:id/items
pub async fn handle_replace_items(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(payroll_id): Path<Uuid>,
    Json(req): Json<ReplaceItemsRequest>,
) -> Result<Json<PayrollRow>, AppError> {
    user.require(Permission::ManagePayroll)?;
    let payroll = fetch_payroll(&state.db, &user, payroll_id).await?;
    if payroll.status.parse::<PayrollStatus>()? != PayrollStatus::Draft {
        return Err(PayrollError::NotEditable.into());
    }
    let totals = compute_totals(payroll.base_cents, &req.line_items)?;

    // Guarded on status so a concurrent approval is never overwritten.
    let updated = sqlx::query_as::<_, PayrollRow>(
        r#"
        UPDATE payrolls
        SET line_items = $2, bonus_cents = $3, deduction_cents = $4,
            gross_cents = $5, net_cents = $6, updated_at = now()
        WHERE id = $1 AND status = 'draft'
        RETURNING *
        "#,
    )
    .bind(payroll_id)
    .bind(SqlJson(&req.line_items))
    .bind(totals.bonus_cents)
    .bind(totals.deduction_cents)
    .bind(totals.gross_cents)
    .bind(totals.net_cents)
    .fetch_optional(&state.db)
    .await?
    .ok_or(PayrollError::NotEditable)?;

    Ok(Json(updated))
}

/// POST /api/v1/payrolls/:id/status
pub async fn handle_transition(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(payroll_id): Path<Uuid>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<PayrollRow>, AppError> {
    user.require(Permission::ManagePayroll)?;
    let payroll = fetch_payroll(&state.db, &user, payroll_id).await?;
    let current: PayrollStatus = payroll.status.parse()?;
    let next = current.transition_to(req.status.parse()?)?;

    let payslip_s3_key = match next {
        PayrollStatus::Approved => {
            let employee = fetch_employee(&state.db, &user, payroll.employee_id).await?;
            let company = fetch_company(&state.db, &user, payroll.company_id).await?;
            let released = PayrollRow {
                status: next.as_str().to_string(),
                ..payroll.clone()
            };
            let key = payslip_key(&released);
            put_markdown(
                &state.s3,
                &state.config.s3_bucket,
                &key,
                render_payslip(&company, &employee, &released),
            )
            .await?;
            Some(key)
        }
        PayrollStatus::Paid => payroll.payslip_s3_key.clone(),
        PayrollStatus::Draft => None,
    };

    let updated = sqlx::query_as::<_, PayrollRow>(
        r#"
        UPDATE payrolls
        SET status = $3, payslip_s3_key = $4, updated_at = now()
        WHERE id = $1 AND status = $2
        RETURNING *
        "#,
    )
    .bind(payroll_id)
    .bind(current.as_str())
    .bind(next.as_str())
    .bind(payslip_s3_key)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| {
        AppError::Conflict(format!("Payroll {payroll_id} changed while updating its status"))
    })?;

    info!(
        "Payroll {payroll_id} moved {} -> {} by {}",
        current.as_str(),
        next.as_str(),
        user.user_id
    );
    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_period() {
        let may = |d| NaiveDate::from_ymd_opt(2024, 5, d).unwrap();
        assert!(validate_period(may(1), may(31)).is_ok());
        assert!(validate_period(may(15), may(15)).is_ok());
        assert!(validate_period(may(31), may(1)).is_err());
    }

    #[test]
    fn test_create_request_parses_line_items() {
        let req: CreatePayrollRequest = serde_json::from_str(
            r#"{
                "employee_id": "00000000-0000-0000-0000-000000000007",
                "period_start": "2024-05-01",
                "period_end": "2024-05-31",
                "line_items": [{"kind": "bonus", "label": "Overtime", "amount_cents": 5000}]
            }"#,
        )
        .unwrap();
        assert!(req.base_cents.is_none());
        assert_eq!(req.line_items.len(), 1);
        assert_eq!(req.line_items[0].amount_cents, 5000);
    }

    #[test]
    fn test_transition_rejects_unknown_status() {
        let req = TransitionRequest {
            status: "archived".to_string(),
        };
        assert!(matches!(
            req.status.parse::<PayrollStatus>(),
            Err(AppError::Validation(_))
        ));
    }
}
