pub mod handlers;

use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::company::CompanyRow;

/// Loads a company the caller is allowed to see.
pub async fn fetch_company(
    pool: &PgPool,
    user: &CurrentUser,
    company_id: Uuid,
) -> Result<CompanyRow, AppError> {
    user.ensure_company(company_id)?;
    sqlx::query_as::<_, CompanyRow>("SELECT * FROM companies WHERE id = $1")
        .bind(company_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Company {company_id} not found")))
}
