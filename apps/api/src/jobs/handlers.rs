use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sqlx::types::Json as SqlJson;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{CurrentUser, Permission};
use crate::companies::fetch_company;
use crate::errors::AppError;
use crate::jobs::analysis::{analyze_description, generate_ad, AdOptions, JobAnalysis};
use crate::jobs::{fetch_position, PositionStatus};
use crate::models::job::JobPositionRow;
use crate::state::AppState;

/// Largest PDF accepted for analysis.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct CreatePositionRequest {
    pub company_id: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    pub salary_min_cents: Option<i64>,
    pub salary_max_cents: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePositionRequest {
    pub title: Option<String>,
    pub department: Option<String>,
    pub description: Option<String>,
    pub requirements: Option<Vec<String>>,
    pub salary_min_cents: Option<i64>,
    pub salary_max_cents: Option<i64>,
    pub status: Option<String>,
    pub generated_ad: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListPositionsQuery {
    pub company_id: Option<Uuid>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct GeneratedAdResponse {
    pub position_id: Uuid,
    pub ad: String,
}

pub fn validate_position(
    title: &str,
    salary_min_cents: Option<i64>,
    salary_max_cents: Option<i64>,
) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::Validation("title cannot be empty".to_string()));
    }
    if salary_min_cents.is_some_and(|v| v < 0) || salary_max_cents.is_some_and(|v| v < 0) {
        return Err(AppError::Validation(
            "Salary bounds must not be negative".to_string(),
        ));
    }
    if let (Some(min), Some(max)) = (salary_min_cents, salary_max_cents) {
        if min > max {
            return Err(AppError::Validation(
                "salary_min_cents must not exceed salary_max_cents".to_string(),
            ));
        }
    }
    Ok(())
}

fn clean_requirements(requirements: Vec<String>) -> Vec<String> {
    requirements
        .into_iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect()
}

/// POST /api/v1/jobs
pub async fn handle_create_position(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreatePositionRequest>,
) -> Result<(StatusCode, Json<JobPositionRow>), AppError> {
    user.require(Permission::ManageJobs)?;
    let company_id = user.resolve_company(req.company_id)?;
    validate_position(&req.title, req.salary_min_cents, req.salary_max_cents)?;
    let status = match req.status.as_deref() {
        Some(s) => s.parse()?,
        None => PositionStatus::Draft,
    };

    let position = sqlx::query_as::<_, JobPositionRow>(
        r#"
        INSERT INTO job_positions
            (id, company_id, title, department, description, requirements,
             salary_min_cents, salary_max_cents, status, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(company_id)
    .bind(req.title.trim())
    .bind(req.department.trim())
    .bind(req.description.trim())
    .bind(SqlJson(clean_requirements(req.requirements)))
    .bind(req.salary_min_cents)
    .bind(req.salary_max_cents)
    .bind(status.as_str())
    .bind(user.user_id)
    .fetch_one(&state.db)
    .await?;

    info!("Job position {} '{}' created in {company_id}", position.id, position.title);
    Ok((StatusCode::CREATED, Json(position)))
}

/// GET /api/v1/jobs
pub async fn handle_list_positions(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<ListPositionsQuery>,
) -> Result<Json<Vec<JobPositionRow>>, AppError> {
    user.require(Permission::ManageJobs)?;
    let company_id = user.resolve_company(params.company_id)?;
    let status = params
        .status
        .as_deref()
        .map(str::parse::<PositionStatus>)
        .transpose()?;

    let rows = sqlx::query_as::<_, JobPositionRow>(
        r#"
        SELECT * FROM job_positions
        WHERE company_id = $1 AND ($2::text IS NULL OR status = $2)
        ORDER BY created_at DESC
        "#,
    )
    .bind(company_id)
    .bind(status.map(|s| s.as_str()))
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_position(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(position_id): Path<Uuid>,
) -> Result<Json<JobPositionRow>, AppError> {
    user.require(Permission::ManageJobs)?;
    Ok(Json(fetch_position(&state.db, &user, position_id).await?))
}

/// PATCH /api/v1/jobs/:id
pub async fn handle_update_position(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(position_id): Path<Uuid>,
    Json(req): Json<UpdatePositionRequest>,
) -> Result<Json<JobPositionRow>, AppError> {
    user.require(Permission::ManageJobs)?;
    let current = fetch_position(&state.db, &user, position_id).await?;

    let title = req.title.unwrap_or(current.title);
    let salary_min_cents = req.salary_min_cents.or(current.salary_min_cents);
    let salary_max_cents = req.salary_max_cents.or(current.salary_max_cents);
    validate_position(&title, salary_min_cents, salary_max_cents)?;
    let status = match req.status.as_deref() {
        Some(s) => s.parse()?,
        None => current.status.parse::<PositionStatus>()?,
    };
    let requirements = req
        .requirements
        .map(clean_requirements)
        .unwrap_or(current.requirements.0);
    let department = req.department.unwrap_or(current.department);
    let description = req.description.unwrap_or(current.description);

    let position = sqlx::query_as::<_, JobPositionRow>(
        r#"
        UPDATE job_positions
        SET title = $2, department = $3, description = $4, requirements = $5,
            salary_min_cents = $6, salary_max_cents = $7, status = $8,
            generated_ad = $9, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(position_id)
    .bind(title.trim())
    .bind(department.trim())
    .bind(description.trim())
    .bind(SqlJson(requirements))
    .bind(salary_min_cents)
    .bind(salary_max_cents)
    .bind(status.as_str())
    .bind(req.generated_ad.or(current.generated_ad))
    .fetch_one(&state.db)
    .await?;
    Ok(Json(position))
}

/// DELETE /api/v1/jobs/:id
pub async fn handle_delete_position(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(position_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    user.require(Permission::ManageJobs)?;
    fetch_position(&state.db, &user, position_id).await?;

    let interviews: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM interviews WHERE job_position_id = $1")
            .bind(position_id)
            .fetch_one(&state.db)
            .await?;
    if interviews > 0 {
        return Err(AppError::Conflict(format!(
            "Job position {position_id} has {interviews} interviews; close it instead"
        )));
    }

    sqlx::query("DELETE FROM job_positions WHERE id = $1")
        .bind(position_id)
        .execute(&state.db)
        .await?;
    info!("Job position {position_id} deleted by {}", user.user_id);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/jobs/analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<JobAnalysis>, AppError> {
    user.require(Permission::ManageJobs)?;
    Ok(Json(
        analyze_description(state.llm.as_ref(), &req.description).await?,
    ))
}

/// POST /api/v1/jobs/analyze/upload: multipart with a PDF in field `file`.
pub async fn handle_analyze_upload(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> Result<Json<JobAnalysis>, AppError> {
    user.require(Permission::ManageJobs)?;

    let mut pdf: Option<Bytes> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read upload: {e}")))?;
        pdf = Some(bytes);
        break;
    }
    let pdf = pdf.ok_or_else(|| AppError::Validation("Missing 'file' field".to_string()))?;
    if pdf.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::Validation(format!(
            "PDF exceeds {} MB",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        )));
    }

    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&pdf))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("PDF extraction task failed: {e}")))?
        .map_err(|e| {
            warn!("PDF extraction failed: {e:?}");
            AppError::UnprocessableEntity("Could not extract text from the PDF".to_string())
        })?;

    Ok(Json(analyze_description(state.llm.as_ref(), &text).await?))
}

/// POST /api/v1/jobs/:id/generate-ad
pub async fn handle_generate_ad(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(position_id): Path<Uuid>,
    body: Option<Json<AdOptions>>,
) -> Result<Json<GeneratedAdResponse>, AppError> {
    user.require(Permission::ManageJobs)?;
    let options = body.map(|Json(o)| o).unwrap_or_default();
    let position = fetch_position(&state.db, &user, position_id).await?;
    let company = fetch_company(&state.db, &user, position.company_id).await?;

    let ad = generate_ad(state.llm.as_ref(), &company.name, &position, &options).await?;

    sqlx::query("UPDATE job_positions SET generated_ad = $2, updated_at = now() WHERE id = $1")
        .bind(position_id)
        .bind(&ad)
        .execute(&state.db)
        .await?;

    info!("Generated ad for job position {position_id} ({} chars)", ad.len());
    Ok(Json(GeneratedAdResponse { position_id, ad }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_position_salary_range() {
        assert!(validate_position("Analyst", Some(100), Some(200)).is_ok());
        assert!(validate_position("Analyst", Some(200), Some(200)).is_ok());
        assert!(validate_position("Analyst", None, Some(200)).is_ok());
        assert!(validate_position("Analyst", Some(300), Some(200)).is_err());
        assert!(validate_position("Analyst", Some(-1), None).is_err());
        assert!(validate_position("  ", None, None).is_err());
    }

    #[test]
    fn test_clean_requirements_drops_blanks() {
        let cleaned = clean_requirements(vec![
            " Excel ".to_string(),
            "".to_string(),
            "   ".to_string(),
            "SQL".to_string(),
        ]);
        assert_eq!(cleaned, vec!["Excel", "SQL"]);
    }

    #[test]
    fn test_position_status_parsing() {
        assert_eq!("open".parse::<PositionStatus>().unwrap(), PositionStatus::Open);
        assert!("archived".parse::<PositionStatus>().is_err());
    }
}
