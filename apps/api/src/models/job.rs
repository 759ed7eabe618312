use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobPositionRow {
    pub id: Uuid,
    pub company_id: Uuid,
    pub title: String,
    pub department: String,
    pub description: String,
    pub requirements: Json<Vec<String>>,
    pub salary_min_cents: Option<i64>,
    pub salary_max_cents: Option<i64>,
    pub status: String,
    pub generated_ad: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
