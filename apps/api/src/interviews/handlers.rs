use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use sqlx::types::Json as SqlJson;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::{CurrentUser, Permission, Role};
use crate::errors::AppError;
use crate::interviews::evaluation::{
    evaluate, slots_overlap, validate_duration, CriterionScore, InterviewStatus,
    DEFAULT_DURATION_MINUTES, MAX_DURATION_MINUTES,
};
use crate::interviews::fetch_interview;
use crate::jobs::fetch_position;
use crate::models::interview::InterviewRow;
use crate::models::user::UserRow;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ScheduleInterviewRequest {
    pub job_position_id: Uuid,
    pub candidate_name: String,
    pub candidate_email: String,
    pub interviewer_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListInterviewsQuery {
    pub company_id: Option<Uuid>,
    pub job_position_id: Option<Uuid>,
    pub status: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub scores: Vec<CriterionScore>,
    pub notes: Option<String>,
}

/// Interviewers must belong to the position's company; consultants may interview anywhere.
async fn check_interviewer(
    pool: &PgPool,
    interviewer_id: Uuid,
    company_id: Uuid,
) -> Result<(), AppError> {
    let interviewer = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
        .bind(interviewer_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::Validation(format!("Interviewer {interviewer_id} not found")))?;
    let is_consultant = interviewer.role.parse::<Role>()? == Role::Consultant;
    if !is_consultant && interviewer.company_id != Some(company_id) {
        return Err(AppError::Validation(format!(
            "Interviewer {interviewer_id} does not belong to this company"
        )));
    }
    Ok(())
}

/// Conflict when the interviewer already has a scheduled interview in the slot.
async fn check_availability(
    pool: &PgPool,
    interviewer_id: Uuid,
    scheduled_at: DateTime<Utc>,
    duration_minutes: i32,
) -> Result<(), AppError> {
    let window_start = scheduled_at - Duration::minutes(MAX_DURATION_MINUTES.into());
    let window_end = scheduled_at + Duration::minutes(duration_minutes.into());
    let nearby = sqlx::query_as::<_, InterviewRow>(
        r#"
        SELECT * FROM interviews
        WHERE interviewer_id = $1 AND status = 'scheduled'
          AND scheduled_at > $2 AND scheduled_at < $3
        "#,
    )
    .bind(interviewer_id)
    .bind(window_start)
    .bind(window_end)
    .fetch_all(pool)
    .await?;

    if let Some(clash) = nearby.iter().find(|other| {
        slots_overlap(
            scheduled_at,
            duration_minutes,
            other.scheduled_at,
            other.duration_minutes,
        )
    }) {
        return Err(AppError::Conflict(format!(
            "Interviewer already has interview {} at {}",
            clash.id, clash.scheduled_at
        )));
    }
    Ok(())
}

/// POST /api/v1/interviews
pub async fn handle_schedule_interview(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<ScheduleInterviewRequest>,
) -> Result<(StatusCode, Json<InterviewRow>), AppError> {
    user.require(Permission::ManageInterviews)?;
    let duration_minutes = req.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);
    validate_duration(duration_minutes)?;
    if req.candidate_name.trim().is_empty() {
        return Err(AppError::Validation("candidate_name cannot be empty".to_string()));
    }
    if !req.candidate_email.contains('@') {
        return Err(AppError::Validation(
            "A valid candidate_email is required".to_string(),
        ));
    }

    let position = fetch_position(&state.db, &user, req.job_position_id).await?;
    check_interviewer(&state.db, req.interviewer_id, position.company_id).await?;
    check_availability(&state.db, req.interviewer_id, req.scheduled_at, duration_minutes).await?;

    let interview = sqlx::query_as::<_, InterviewRow>(
        r#"
        INSERT INTO interviews
            (id, company_id, job_position_id, candidate_name, candidate_email,
             interviewer_id, scheduled_at, duration_minutes, status, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(position.company_id)
    .bind(position.id)
    .bind(req.candidate_name.trim())
    .bind(req.candidate_email.trim().to_lowercase())
    .bind(req.interviewer_id)
    .bind(req.scheduled_at)
    .bind(duration_minutes)
    .bind(InterviewStatus::Scheduled.as_str())
    .bind(req.notes)
    .fetch_one(&state.db)
    .await?;

    info!(
        "Interview {} scheduled for position {} at {}",
        interview.id, position.id, interview.scheduled_at
    );
    Ok((StatusCode::CREATED, Json(interview)))
}

/// GET /api/v1/interviews
pub async fn handle_list_interviews(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<ListInterviewsQuery>,
) -> Result<Json<Vec<InterviewRow>>, AppError> {
    user.require(Permission::ManageInterviews)?;
    let company_id = user.resolve_company(params.company_id)?;
    let status = params
        .status
        .as_deref()
        .map(str::parse::<InterviewStatus>)
        .transpose()?;

    let rows = sqlx::query_as::<_, InterviewRow>(
        r#"
        SELECT * FROM interviews
        WHERE company_id = $1
          AND ($2::uuid IS NULL OR job_position_id = $2)
          AND ($3::text IS NULL OR status = $3)
          AND ($4::timestamptz IS NULL OR scheduled_at >= $4)
          AND ($5::timestamptz IS NULL OR scheduled_at < $5)
        ORDER BY scheduled_at
        "#,
    )
    .bind(company_id)
    .bind(params.job_position_id)
    .bind(status.map(|s| s.as_str()))
    .bind(params.from)
    .bind(params.to)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// GET /api/v1/interviews/:id
pub async fn handle_get_interview(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(interview_id): Path<Uuid>,
) -> Result<Json<InterviewRow>, AppError> {
    user.require(Permission::ManageInterviews)?;
    Ok(Json(fetch_interview(&state.db, &user, interview_id).await?))
}

/// POST /api/v1/interviews/:id/status
pub async fn handle_update_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(interview_id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<InterviewRow>, AppError> {
    user.require(Permission::ManageInterviews)?;
    let interview = fetch_interview(&state.db, &user, interview_id).await?;
    let current: InterviewStatus = interview.status.parse()?;
    let next = current.transition_to(req.status.parse()?)?;

    let updated = sqlx::query_as::<_, InterviewRow>(
        r#"
        UPDATE interviews
        SET status = $3, notes = COALESCE($4, notes), updated_at = now()
        WHERE id = $1 AND status = $2
        RETURNING *
        "#,
    )
    .bind(interview_id)
    .bind(current.as_str())
    .bind(next.as_str())
    .bind(req.notes)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::Conflict(format!("Interview {interview_id} was updated concurrently")))?;

    info!("Interview {interview_id} moved {} -> {}", current.as_str(), next.as_str());
    Ok(Json(updated))
}

/// POST /api/v1/interviews/:id/evaluation
pub async fn handle_evaluate(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(interview_id): Path<Uuid>,
    Json(req): Json<EvaluateRequest>,
) -> Result<Json<InterviewRow>, AppError> {
    user.require(Permission::EvaluateInterviews)?;
    let interview = fetch_interview(&state.db, &user, interview_id).await?;
    let current: InterviewStatus = interview.status.parse()?;
    current.transition_to(InterviewStatus::Completed)?;
    let evaluation = evaluate(&req.scores)?;

    let updated = sqlx::query_as::<_, InterviewRow>(
        r#"
        UPDATE interviews
        SET status = 'completed', scores = $2, overall_score = $3, recommendation = $4,
            notes = COALESCE($5, notes), updated_at = now()
        WHERE id = $1 AND status = 'scheduled'
        RETURNING *
        "#,
    )
    .bind(interview_id)
    .bind(SqlJson(&req.scores))
    .bind(evaluation.overall_score)
    .bind(evaluation.recommendation.as_str())
    .bind(req.notes)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::Conflict(format!("Interview {interview_id} was updated concurrently")))?;

    info!(
        "Interview {interview_id} evaluated {:.2} ({})",
        evaluation.overall_score,
        evaluation.recommendation.as_str()
    );
    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_request_duration_is_optional() {
        let req: ScheduleInterviewRequest = serde_json::from_str(
            r#"{
                "job_position_id": "00000000-0000-0000-0000-000000000001",
                "candidate_name": "Marta Díaz",
                "candidate_email": "marta@example.com",
                "interviewer_id": "00000000-0000-0000-0000-000000000002",
                "scheduled_at": "2024-05-20T15:00:00Z"
            }"#,
        )
        .unwrap();
        assert_eq!(req.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES), 60);
    }

    #[test]
    fn test_evaluate_request_parses_scores() {
        let req: EvaluateRequest = serde_json::from_str(
            r#"{"scores": [{"criterion": "skills", "score": 4}, {"criterion": "values", "score": 5}]}"#,
        )
        .unwrap();
        let eval = evaluate(&req.scores).unwrap();
        assert_eq!(eval.overall_score, 4.5);
    }

    #[test]
    fn test_evaluate_request_rejects_fractional_scores() {
        let parsed = serde_json::from_str::<EvaluateRequest>(
            r#"{"scores": [{"criterion": "skills", "score": 4.5}]}"#,
        );
        assert!(parsed.is_err());
    }
}
