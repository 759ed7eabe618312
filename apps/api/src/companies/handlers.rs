use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveTime;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::attendance::time_calc::AttendancePolicy;
use crate::auth::{CurrentUser, Permission, Role};
use crate::companies::fetch_company;
use crate::errors::AppError;
use crate::models::company::CompanyRow;
use crate::state::AppState;

const MIN_UTC_OFFSET_MINUTES: i32 = -12 * 60;
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Attendance policy as sent by clients; `work_start` is `HH:MM`.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyInput {
    pub work_start: String,
    pub late_grace_minutes: i64,
    pub half_day_minutes: i64,
    pub full_day_minutes: i64,
}

impl PolicyInput {
    pub fn into_policy(self) -> Result<AttendancePolicy, AppError> {
        let work_start = NaiveTime::parse_from_str(self.work_start.trim(), "%H:%M")
            .map_err(|_| AppError::Validation("work_start must be HH:MM".to_string()))?;
        let policy = AttendancePolicy {
            work_start,
            late_grace_minutes: self.late_grace_minutes,
            half_day_minutes: self.half_day_minutes,
            full_day_minutes: self.full_day_minutes,
        };
        policy.validate()?;
        Ok(policy)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCompanyRequest {
    pub name: String,
    pub utc_offset_minutes: Option<i32>,
    pub policy: Option<PolicyInput>,
}

fn validate_offset(offset: i32) -> Result<i32, AppError> {
    if (MIN_UTC_OFFSET_MINUTES..=MAX_UTC_OFFSET_MINUTES).contains(&offset) {
        Ok(offset)
    } else {
        Err(AppError::Validation(format!(
            "utc_offset_minutes must be between {MIN_UTC_OFFSET_MINUTES} and {MAX_UTC_OFFSET_MINUTES}"
        )))
    }
}

fn policy_columns(policy: &AttendancePolicy) -> Result<(String, i32, i32, i32), AppError> {
    let narrow = |v: i64| {
        i32::try_from(v).map_err(|_| AppError::Validation("policy value out of range".to_string()))
    };
    Ok((
        policy.work_start.format("%H:%M").to_string(),
        narrow(policy.late_grace_minutes)?,
        narrow(policy.half_day_minutes)?,
        narrow(policy.full_day_minutes)?,
    ))
}

/// POST /api/v1/companies
pub async fn handle_create_company(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateCompanyRequest>,
) -> Result<(StatusCode, Json<CompanyRow>), AppError> {
    user.require(Permission::ManageCompanies)?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    let offset = validate_offset(req.utc_offset_minutes.unwrap_or(0))?;
    let policy = match req.policy {
        Some(input) => input.into_policy()?,
        None => state.config.default_policy,
    };
    let (work_start, grace, half_day, full_day) = policy_columns(&policy)?;

    let company = sqlx::query_as::<_, CompanyRow>(
        r#"
        INSERT INTO companies
            (id, name, utc_offset_minutes, work_start, late_grace_minutes,
             half_day_minutes, full_day_minutes)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(offset)
    .bind(work_start)
    .bind(grace)
    .bind(half_day)
    .bind(full_day)
    .fetch_one(&state.db)
    .await?;

    info!("Company {} '{}' created by {}", company.id, company.name, user.user_id);
    Ok((StatusCode::CREATED, Json(company)))
}

/// GET /api/v1/companies
pub async fn handle_list_companies(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<CompanyRow>>, AppError> {
    let rows = if user.role == Role::Consultant {
        sqlx::query_as::<_, CompanyRow>("SELECT * FROM companies ORDER BY name")
            .fetch_all(&state.db)
            .await?
    } else {
        let company_id = user.company_id.ok_or(AppError::Forbidden)?;
        sqlx::query_as::<_, CompanyRow>("SELECT * FROM companies WHERE id = $1")
            .bind(company_id)
            .fetch_all(&state.db)
            .await?
    };
    Ok(Json(rows))
}

/// GET /api/v1/companies/:id
pub async fn handle_get_company(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(company_id): Path<Uuid>,
) -> Result<Json<CompanyRow>, AppError> {
    Ok(Json(fetch_company(&state.db, &user, company_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePolicyRequest {
    pub utc_offset_minutes: Option<i32>,
    #[serde(flatten)]
    pub policy: PolicyInput,
}

/// PATCH /api/v1/companies/:id/policy
pub async fn handle_update_policy(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(company_id): Path<Uuid>,
    Json(req): Json<UpdatePolicyRequest>,
) -> Result<Json<CompanyRow>, AppError> {
    user.require(Permission::ManageEmployees)?;
    let current = fetch_company(&state.db, &user, company_id).await?;

    let offset = validate_offset(req.utc_offset_minutes.unwrap_or(current.utc_offset_minutes))?;
    let policy = req.policy.into_policy()?;
    let (work_start, grace, half_day, full_day) = policy_columns(&policy)?;

    let company = sqlx::query_as::<_, CompanyRow>(
        r#"
        UPDATE companies
        SET utc_offset_minutes = $2, work_start = $3, late_grace_minutes = $4,
            half_day_minutes = $5, full_day_minutes = $6
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(company_id)
    .bind(offset)
    .bind(work_start)
    .bind(grace)
    .bind(half_day)
    .bind(full_day)
    .fetch_one(&state.db)
    .await?;

    info!("Attendance policy of company {company_id} updated by {}", user.user_id);
    Ok(Json(company))
}
