pub mod analysis;
pub mod handlers;
pub mod prompts;

use std::str::FromStr;

use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::job::JobPositionRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionStatus {
    Draft,
    Open,
    Closed,
}

impl PositionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionStatus::Draft => "draft",
            PositionStatus::Open => "open",
            PositionStatus::Closed => "closed",
        }
    }
}

impl FromStr for PositionStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PositionStatus::Draft),
            "open" => Ok(PositionStatus::Open),
            "closed" => Ok(PositionStatus::Closed),
            other => Err(AppError::Validation(format!(
                "Unknown position status '{other}'"
            ))),
        }
    }
}

pub async fn fetch_position(
    pool: &PgPool,
    user: &CurrentUser,
    position_id: Uuid,
) -> Result<JobPositionRow, AppError> {
    let position =
        sqlx::query_as::<_, JobPositionRow>("SELECT * FROM job_positions WHERE id = $1")
            .bind(position_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job position {position_id} not found")))?;
    user.ensure_company(position.company_id)?;
    Ok(position)
}
