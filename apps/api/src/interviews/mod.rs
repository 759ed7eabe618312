pub mod evaluation;
pub mod handlers;

use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::interview::InterviewRow;

pub async fn fetch_interview(
    pool: &PgPool,
    user: &CurrentUser,
    interview_id: Uuid,
) -> Result<InterviewRow, AppError> {
    let interview = sqlx::query_as::<_, InterviewRow>("SELECT * FROM interviews WHERE id = $1")
        .bind(interview_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Interview {interview_id} not found")))?;
    user.ensure_company(interview.company_id)?;
    Ok(interview)
}
