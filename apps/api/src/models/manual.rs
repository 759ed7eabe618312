use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ManualSectionRow {
    pub id: Uuid,
    pub company_id: Uuid,
    pub section_id: Uuid,
    pub version: i32,
    pub title: String,
    pub body: String,
    pub position: i32,
    pub archived: bool,
    pub edited_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ManualSnapshotRow {
    pub id: Uuid,
    pub company_id: Uuid,
    pub version: i32,
    pub s3_key: String,
    pub created_at: DateTime<Utc>,
}
