//! Axum route handlers for the time clock.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::attendance::store::{
    find_open_record, find_record, find_record_by_id, insert_record, list_records, update_record,
    NewRecord,
};
use crate::attendance::summary::{summarize, AttendanceSummary};
use crate::attendance::time_calc::{
    break_minutes, ensure_no_other_open_shift, local_work_date, BreakPeriod, Shift, TimeCalcError,
};
use crate::auth::{CurrentUser, Permission};
use crate::companies::fetch_company;
use crate::employees::fetch_employee;
use crate::errors::AppError;
use crate::models::attendance::AttendanceRecordRow;
use crate::models::company::CompanyRow;
use crate::models::employee::EmployeeRow;
use crate::state::AppState;

/// Longest range a single listing may cover.
const MAX_RANGE_DAYS: i64 = 366;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockAction {
    CheckIn,
    StartBreak,
    EndBreak,
    CheckOut,
}

impl ClockAction {
    fn label(&self) -> &'static str {
        match self {
            ClockAction::CheckIn => "check-in",
            ClockAction::StartBreak => "break start",
            ClockAction::EndBreak => "break end",
            ClockAction::CheckOut => "check-out",
        }
    }

    fn apply(&self, shift: &mut Shift, at: DateTime<Utc>) -> Result<(), TimeCalcError> {
        match self {
            ClockAction::CheckIn => shift.check_in(at),
            ClockAction::StartBreak => shift.start_break(at),
            ClockAction::EndBreak => shift.end_break(at),
            ClockAction::CheckOut => shift.check_out(at),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ClockRequest {
    /// Clock someone else in or out. Requires team attendance rights.
    pub employee_id: Option<Uuid>,
    /// Backdated timestamp. Requires attendance edit rights.
    pub at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClockResponse {
    pub record: AttendanceRecordRow,
    pub on_break: bool,
    /// Break time so far; a shift still in progress is measured up to now.
    pub break_minutes: i64,
}

impl ClockResponse {
    pub fn new(record: AttendanceRecordRow, now: DateTime<Utc>) -> Self {
        let breaks = &record.breaks.0;
        let on_break = breaks.iter().any(BreakPeriod::is_open);
        let taken = match record.check_in {
            Some(check_in) => break_minutes(breaks, check_in, record.check_out.unwrap_or(now)),
            None => 0,
        };
        Self {
            record,
            on_break,
            break_minutes: taken,
        }
    }
}

/// Resolves who is being clocked and checks the caller may do it.
async fn clock_target(
    state: &AppState,
    user: &CurrentUser,
    req: &ClockRequest,
) -> Result<(EmployeeRow, CompanyRow, DateTime<Utc>), AppError> {
    let employee_id = user.target_employee(req.employee_id)?;
    user.require_self_or(employee_id, Permission::ViewTeamAttendance)?;
    let at = match req.at {
        Some(at) => {
            user.require(Permission::EditTeamAttendance)?;
            at
        }
        None => Utc::now(),
    };

    let employee = fetch_employee(&state.db, user, employee_id).await?;
    employee.ensure_active()?;
    let company = fetch_company(&state.db, user, employee.company_id).await?;
    Ok((employee, company, at))
}

async fn apply_clock_action(
    state: &AppState,
    user: &CurrentUser,
    req: ClockRequest,
    action: ClockAction,
) -> Result<AttendanceRecordRow, AppError> {
    let (employee, company, at) = clock_target(state, user, &req).await?;
    let policy = company.policy()?;

    let existing = match action {
        ClockAction::CheckIn => {
            let work_date = local_work_date(at, company.utc_offset_minutes)?;
            let open = find_open_record(&state.db, employee.id).await?;
            ensure_no_other_open_shift(open.map(|r| r.work_date), work_date)?;
            find_record(&state.db, employee.id, work_date).await?
        }
        _ => find_open_record(&state.db, employee.id).await?,
    };

    let record = match existing {
        Some(record) => {
            let mut shift = record.shift();
            action.apply(&mut shift, at)?;
            let evaluation = shift.evaluate(&policy, company.utc_offset_minutes)?;
            update_record(&state.db, record.id, &shift, &evaluation, req.notes.as_deref()).await?
        }
        None if action == ClockAction::CheckIn => {
            let mut shift = Shift::default();
            action.apply(&mut shift, at)?;
            let evaluation = shift.evaluate(&policy, company.utc_offset_minutes)?;
            insert_record(
                &state.db,
                NewRecord {
                    company_id: company.id,
                    employee_id: employee.id,
                    work_date: local_work_date(at, company.utc_offset_minutes)?,
                    shift: &shift,
                    evaluation: &evaluation,
                    notes: req.notes.as_deref(),
                },
            )
            .await?
        }
        None => return Err(TimeCalcError::NotCheckedIn.into()),
    };

    info!(
        "Attendance {} for employee {} at {} -> {}",
        action.label(),
        employee.id,
        at,
        record.status
    );
    Ok(record)
}

/// POST /api/v1/attendance/check-in
pub async fn handle_check_in(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<ClockRequest>,
) -> Result<(StatusCode, Json<ClockResponse>), AppError> {
    let record = apply_clock_action(&state, &user, req, ClockAction::CheckIn).await?;
    Ok((StatusCode::CREATED, Json(ClockResponse::new(record, Utc::now()))))
}

/// POST /api/v1/attendance/break/start
pub async fn handle_start_break(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<ClockRequest>,
) -> Result<Json<ClockResponse>, AppError> {
    let record = apply_clock_action(&state, &user, req, ClockAction::StartBreak).await?;
    Ok(Json(ClockResponse::new(record, Utc::now())))
}

/// POST /api/v1/attendance/break/end
pub async fn handle_end_break(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<ClockRequest>,
) -> Result<Json<ClockResponse>, AppError> {
    let record = apply_clock_action(&state, &user, req, ClockAction::EndBreak).await?;
    Ok(Json(ClockResponse::new(record, Utc::now())))
}

/// POST /api/v1/attendance/check-out
pub async fn handle_check_out(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<ClockRequest>,
) -> Result<Json<ClockResponse>, AppError> {
    let record = apply_clock_action(&state, &user, req, ClockAction::CheckOut).await?;
    Ok(Json(ClockResponse::new(record, Utc::now())))
}

#[derive(Debug, Deserialize)]
pub struct ListAttendanceQuery {
    pub company_id: Option<Uuid>,
    pub employee_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct AttendanceListResponse {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub records: Vec<AttendanceRecordRow>,
    pub summary: AttendanceSummary,
}

/// Defaults to the month-to-date of `today`; rejects inverted or huge ranges.
pub fn resolve_range(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate), AppError> {
    let to = to.unwrap_or(today);
    let from = from.unwrap_or_else(|| to.with_day(1).unwrap_or(to));
    if from > to {
        return Err(AppError::Validation("from must not be after to".to_string()));
    }
    if to - from > Duration::days(MAX_RANGE_DAYS) {
        return Err(AppError::Validation(format!(
            "Date range cannot exceed {MAX_RANGE_DAYS} days"
        )));
    }
    Ok((from, to))
}

/// GET /api/v1/attendance
pub async fn handle_list_attendance(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<ListAttendanceQuery>,
) -> Result<Json<AttendanceListResponse>, AppError> {
    let company_id = match params.employee_id {
        Some(employee_id) => {
            user.require_self_or(employee_id, Permission::ViewTeamAttendance)?;
            fetch_employee(&state.db, &user, employee_id).await?.company_id
        }
        None => {
            user.require(Permission::ViewTeamAttendance)?;
            user.resolve_company(params.company_id)?
        }
    };
    let (from, to) = resolve_range(params.from, params.to, Utc::now().date_naive())?;

    let records = list_records(&state.db, company_id, params.employee_id, from, to).await?;
    let summary = summarize(&records);
    Ok(Json(AttendanceListResponse {
        from,
        to,
        records,
        summary,
    }))
}

/// GET /api/v1/attendance/today
pub async fn handle_today(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Option<ClockResponse>>, AppError> {
    let employee_id = user.target_employee(None)?;
    let employee = fetch_employee(&state.db, &user, employee_id).await?;
    let company = fetch_company(&state.db, &user, employee.company_id).await?;
    let today = local_work_date(Utc::now(), company.utc_offset_minutes)?;

    let record = find_record(&state.db, employee_id, today).await?;
    Ok(Json(record.map(|r| ClockResponse::new(r, Utc::now()))))
}

#[derive(Debug, Deserialize)]
pub struct CorrectionRequest {
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    #[serde(default)]
    pub breaks: Vec<BreakPeriod>,
    pub notes: Option<String>,
}

/// PUT /api/v1/attendance/:id
pub async fn handle_correct_record(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(record_id): Path<Uuid>,
    Json(req): Json<CorrectionRequest>,
) -> Result<Json<ClockResponse>, AppError> {
    user.require(Permission::EditTeamAttendance)?;
    let record = find_record_by_id(&state.db, record_id).await?;
    let company = fetch_company(&state.db, &user, record.company_id).await?;

    let shift = Shift {
        check_in: req.check_in,
        check_out: req.check_out,
        breaks: req.breaks,
    };
    shift.validate()?;
    shift.ensure_work_date(record.work_date, company.utc_offset_minutes)?;
    let evaluation = shift.evaluate(&company.policy()?, company.utc_offset_minutes)?;
    let updated = update_record(
        &state.db,
        record_id,
        &shift,
        &evaluation,
        req.notes.as_deref(),
    )
    .await?;

    info!(
        "Attendance record {record_id} corrected by {} -> {}",
        user.user_id, updated.status
    );
    Ok(Json(ClockResponse::new(updated, Utc::now())))
}

#[derive(Debug, Deserialize)]
pub struct AbsenceRequest {
    pub employee_id: Uuid,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

/// POST /api/v1/attendance/absences
pub async fn handle_mark_absent(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<AbsenceRequest>,
) -> Result<(StatusCode, Json<AttendanceRecordRow>), AppError> {
    user.require(Permission::EditTeamAttendance)?;
    let employee = fetch_employee(&state.db, &user, req.employee_id).await?;
    let company = fetch_company(&state.db, &user, employee.company_id).await?;

    let shift = Shift::default();
    let evaluation = shift.evaluate(&company.policy()?, company.utc_offset_minutes)?;
    let record = insert_record(
        &state.db,
        NewRecord {
            company_id: company.id,
            employee_id: employee.id,
            work_date: req.date,
            shift: &shift,
            evaluation: &evaluation,
            notes: req.notes.as_deref(),
        },
    )
    .await?;

    info!("Employee {} marked absent on {}", employee.id, req.date);
    Ok((StatusCode::CREATED, Json(record)))
}
