use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::attendance::store::{find_record, list_records};
use crate::attendance::summary::{
    summarize, summarize_by_employee, AttendanceSummary, EmployeeAttendanceSummary,
};
use crate::attendance::time_calc::local_work_date;
use crate::auth::{CurrentUser, Permission, Role};
use crate::companies::fetch_company;
use crate::dashboard::{
    aggregate_payrolls, month_bounds, parse_month, PayrollAggregate, PayrollReport,
};
use crate::errors::AppError;
use crate::models::attendance::AttendanceRecordRow;
use crate::models::company::CompanyRow;
use crate::models::interview::InterviewRow;
use crate::models::payroll::PayrollRow;
use crate::payroll::handlers::validate_period;
use crate::state::AppState;

const UPCOMING_INTERVIEWS_LIMIT: i64 = 10;

#[derive(Deserialize)]
pub struct DashboardQuery {
    pub company_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct PayrollPeriodTotals {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    #[serde(flatten)]
    pub totals: PayrollAggregate,
}

/// Consultants get the platform view, or the employer view of one company
/// when they pass `company_id`.
#[derive(Debug, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum DashboardView {
    Consultant {
        company_count: i64,
        employee_count: i64,
        open_positions: i64,
    },
    Employer {
        company_id: Uuid,
        headcount: i64,
        open_positions: i64,
        upcoming_interviews: Vec<InterviewRow>,
        month_attendance: AttendanceSummary,
        latest_payroll: Option<PayrollPeriodTotals>,
    },
    Manager {
        company_id: Uuid,
        today: NaiveDate,
        team_attendance_today: AttendanceSummary,
        upcoming_interviews: Vec<InterviewRow>,
    },
    Employee {
        employee_id: Uuid,
        month_attendance: AttendanceSummary,
        today: Option<AttendanceRecordRow>,
        latest_payroll: Option<PayrollRow>,
    },
}

/// Runs a `SELECT COUNT(*)`, binding `$1` to the company when given.
async fn count(pool: &PgPool, sql: &str, company_id: Option<Uuid>) -> Result<i64, AppError> {
    let query = sqlx::query_scalar::<_, i64>(sql);
    let query = match company_id {
        Some(id) => query.bind(id),
        None => query,
    };
    Ok(query.fetch_one(pool).await?)
}

async fn upcoming_interviews(pool: &PgPool, company_id: Uuid) -> Result<Vec<InterviewRow>, AppError> {
    Ok(sqlx::query_as::<_, InterviewRow>(
        r#"
        SELECT * FROM interviews
        WHERE company_id = $1 AND status = 'scheduled' AND scheduled_at >= now()
        ORDER BY scheduled_at
        LIMIT $2
        "#,
    )
    .bind(company_id)
    .bind(UPCOMING_INTERVIEWS_LIMIT)
    .fetch_all(pool)
    .await?)
}

async fn latest_payroll_period(
    pool: &PgPool,
    company_id: Uuid,
) -> Result<Option<PayrollPeriodTotals>, AppError> {
    let latest: Option<(NaiveDate, NaiveDate)> = sqlx::query_as(
        r#"
        SELECT period_start, period_end FROM payrolls
        WHERE company_id = $1
        ORDER BY period_start DESC, period_end DESC
        LIMIT 1
        "#,
    )
    .bind(company_id)
    .fetch_optional(pool)
    .await?;
    let Some((period_start, period_end)) = latest else {
        return Ok(None);
    };

    let rows = sqlx::query_as::<_, PayrollRow>(
        "SELECT * FROM payrolls WHERE company_id = $1 AND period_start = $2 AND period_end = $3",
    )
    .bind(company_id)
    .bind(period_start)
    .bind(period_end)
    .fetch_all(pool)
    .await?;
    Ok(Some(PayrollPeriodTotals {
        period_start,
        period_end,
        totals: aggregate_payrolls(&rows)?.total,
    }))
}

fn company_today(company: &CompanyRow) -> Result<NaiveDate, AppError> {
    Ok(local_work_date(Utc::now(), company.utc_offset_minutes)?)
}

/// GET /api/v1/dashboard
pub async fn handle_dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<DashboardQuery>,
) -> Result<Json<DashboardView>, AppError> {
    let pool = &state.db;
    let view = match user.role {
        Role::Consultant if params.company_id.is_none() => DashboardView::Consultant {
            company_count: count(pool, "SELECT COUNT(*) FROM companies", None).await?,
            employee_count: count(pool, "SELECT COUNT(*) FROM employees WHERE active", None)
                .await?,
            open_positions: count(
                pool,
                "SELECT COUNT(*) FROM job_positions WHERE status = 'open'",
                None,
            )
            .await?,
        },
        Role::Consultant | Role::Employer => {
            let company_id = user.resolve_company(params.company_id)?;
            let company = fetch_company(pool, &user, company_id).await?;
            let (first, last) = month_bounds(company_today(&company)?);
            let records = list_records(pool, company_id, None, first, last).await?;
            DashboardView::Employer {
                company_id,
                headcount: count(
                    pool,
                    "SELECT COUNT(*) FROM employees WHERE active AND company_id = $1",
                    Some(company_id),
                )
                .await?,
                open_positions: count(
                    pool,
                    "SELECT COUNT(*) FROM job_positions WHERE status = 'open' AND company_id = $1",
                    Some(company_id),
                )
                .await?,
                upcoming_interviews: upcoming_interviews(pool, company_id).await?,
                month_attendance: summarize(&records),
                latest_payroll: latest_payroll_period(pool, company_id).await?,
            }
        }
        Role::Manager => {
            let company_id = user.resolve_company(params.company_id)?;
            let company = fetch_company(pool, &user, company_id).await?;
            let today = company_today(&company)?;
            let records = list_records(pool, company_id, None, today, today).await?;
            DashboardView::Manager {
                company_id,
                today,
                team_attendance_today: summarize(&records),
                upcoming_interviews: upcoming_interviews(pool, company_id).await?,
            }
        }
        Role::Employee => {
            let employee_id = user.target_employee(None)?;
            let company_id = user.resolve_company(None)?;
            let company = fetch_company(pool, &user, company_id).await?;
            let today = company_today(&company)?;
            let (first, last) = month_bounds(today);
            let records = list_records(pool, company_id, Some(employee_id), first, last).await?;
            let latest_payroll = sqlx::query_as::<_, PayrollRow>(
                r#"
                SELECT * FROM payrolls
                WHERE employee_id = $1 AND status <> 'draft'
                ORDER BY period_start DESC
                LIMIT 1
                "#,
            )
            .bind(employee_id)
            .fetch_optional(pool)
            .await?;
            DashboardView::Employee {
                employee_id,
                month_attendance: summarize(&records),
                today: find_record(pool, employee_id, today).await?,
                latest_payroll,
            }
        }
    };
    Ok(Json(view))
}

#[derive(Deserialize)]
pub struct AttendanceReportQuery {
    pub company_id: Option<Uuid>,
    /// `YYYY-MM`; defaults to the current month.
    pub month: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AttendanceReport {
    pub company_id: Uuid,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub employees: Vec<EmployeeAttendanceSummary>,
    pub total: AttendanceSummary,
}

/// GET /api/v1/reports/attendance
pub async fn handle_attendance_report(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<AttendanceReportQuery>,
) -> Result<Json<AttendanceReport>, AppError> {
    user.require(Permission::ViewReports)?;
    let company_id = user.resolve_company(params.company_id)?;
    let (from, to) = match params.month.as_deref() {
        Some(month) => parse_month(month)?,
        None => {
            let company = fetch_company(&state.db, &user, company_id).await?;
            month_bounds(company_today(&company)?)
        }
    };

    let roster: Vec<Uuid> = sqlx::query_scalar(
        "SELECT id FROM employees WHERE company_id = $1 AND active ORDER BY id",
    )
    .bind(company_id)
    .fetch_all(&state.db)
    .await?;
    let records = list_records(&state.db, company_id, None, from, to).await?;
    Ok(Json(AttendanceReport {
        company_id,
        from,
        to,
        employees: summarize_by_employee(roster, &records),
        total: summarize(&records),
    }))
}

#[derive(Deserialize)]
pub struct PayrollReportQuery {
    pub company_id: Option<Uuid>,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct PayrollReportResponse {
    pub company_id: Uuid,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    #[serde(flatten)]
    pub report: PayrollReport,
}

/// GET /api/v1/reports/payroll
pub async fn handle_payroll_report(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<PayrollReportQuery>,
) -> Result<Json<PayrollReportResponse>, AppError> {
    user.require(Permission::ViewReports)?;
    user.require(Permission::ManagePayroll)?;
    let company_id = user.resolve_company(params.company_id)?;
    if let (Some(start), Some(end)) = (params.period_start, params.period_end) {
        validate_period(start, end)?;
    }

    let rows = sqlx::query_as::<_, PayrollRow>(
        r#"
        SELECT * FROM payrolls
        WHERE company_id = $1
          AND ($2::date IS NULL OR period_start >= $2)
          AND ($3::date IS NULL OR period_end <= $3)
        "#,
    )
    .bind(company_id)
    .bind(params.period_start)
    .bind(params.period_end)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(PayrollReportResponse {
        company_id,
        period_start: params.period_start,
        period_end: params.period_end,
        report: aggregate_payrolls(&rows)?,
    }))
}
