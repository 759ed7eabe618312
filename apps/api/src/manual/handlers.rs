use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::{CurrentUser, Permission};
use crate::companies::fetch_company;
use crate::errors::AppError;
use crate::manual::versioning::{
    commit_section, current_sections, latest_section, latest_version, sections_at_version,
    version_history, CommitParams,
};
use crate::models::manual::{ManualSectionRow, ManualSnapshotRow};
use crate::state::AppState;

const MAX_TITLE_CHARS: usize = 200;

#[derive(Deserialize)]
pub struct CompanyQuery {
    pub company_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct ManualResponse {
    /// `None` until the first section is written.
    pub version: Option<i32>,
    pub sections: Vec<ManualSectionRow>,
}

#[derive(Serialize)]
pub struct CommitResponse {
    pub version: i32,
    pub s3_key: String,
    pub section: ManualSectionRow,
}

#[derive(Debug, Deserialize)]
pub struct CreateSectionRequest {
    pub company_id: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct EditSectionRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub position: Option<i32>,
}

fn validate_title(title: &str) -> Result<(), AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Section title cannot be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::Validation(format!(
            "Section title cannot exceed {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(())
}

/// Latest live version of a section the caller may edit.
async fn live_section(
    state: &AppState,
    user: &CurrentUser,
    section_id: Uuid,
) -> Result<ManualSectionRow, AppError> {
    let section = latest_section(&state.db, section_id)
        .await?
        .filter(|s| !s.archived)
        .ok_or_else(|| AppError::NotFound(format!("Manual section {section_id} not found")))?;
    user.ensure_company(section.company_id)?;
    Ok(section)
}

/// GET /api/v1/manual
pub async fn handle_get_manual(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<CompanyQuery>,
) -> Result<Json<ManualResponse>, AppError> {
    user.require(Permission::ReadManual)?;
    let company_id = user.resolve_company(params.company_id)?;
    Ok(Json(ManualResponse {
        version: latest_version(&state.db, company_id).await?,
        sections: current_sections(&state.db, company_id).await?,
    }))
}

/// GET /api/v1/manual/history
pub async fn handle_manual_history(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<CompanyQuery>,
) -> Result<Json<Vec<ManualSnapshotRow>>, AppError> {
    user.require(Permission::ReadManual)?;
    let company_id = user.resolve_company(params.company_id)?;
    Ok(Json(version_history(&state.db, company_id).await?))
}

/// GET /api/v1/manual/version/:v
pub async fn handle_get_version(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(version): Path<i32>,
    Query(params): Query<CompanyQuery>,
) -> Result<Json<ManualResponse>, AppError> {
    user.require(Permission::ReadManual)?;
    let company_id = user.resolve_company(params.company_id)?;
    let latest = latest_version(&state.db, company_id).await?.unwrap_or(0);
    if version < 1 || version > latest {
        return Err(AppError::NotFound(format!("Manual version {version} not found")));
    }
    Ok(Json(ManualResponse {
        version: Some(version),
        sections: sections_at_version(&state.db, company_id, version).await?,
    }))
}

/// POST /api/v1/manual/sections
pub async fn handle_create_section(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateSectionRequest>,
) -> Result<(StatusCode, Json<CommitResponse>), AppError> {
    user.require(Permission::EditManual)?;
    validate_title(&req.title)?;
    let company_id = user.resolve_company(req.company_id)?;
    let company = fetch_company(&state.db, &user, company_id).await?;

    let position = match req.position {
        Some(p) => p,
        None => current_sections(&state.db, company_id)
            .await?
            .iter()
            .map(|s| s.position + 1)
            .max()
            .unwrap_or(0),
    };

    let committed = commit_section(
        &state.db,
        &state.s3,
        &state.config.s3_bucket,
        CommitParams {
            company_id,
            company_name: &company.name,
            section_id: Uuid::new_v4(),
            title: req.title.trim(),
            body: req.body.trim(),
            position,
            archived: false,
            edited_by: user.user_id,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CommitResponse {
            version: committed.version,
            s3_key: committed.s3_key,
            section: committed.section,
        }),
    ))
}

/// PUT /api/v1/manual/sections/:id
pub async fn handle_edit_section(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(section_id): Path<Uuid>,
    Json(req): Json<EditSectionRequest>,
) -> Result<Json<CommitResponse>, AppError> {
    user.require(Permission::EditManual)?;
    let current = live_section(&state, &user, section_id).await?;
    let company = fetch_company(&state.db, &user, current.company_id).await?;

    let title = req.title.unwrap_or(current.title);
    validate_title(&title)?;
    let body = req.body.unwrap_or(current.body);

    let committed = commit_section(
        &state.db,
        &state.s3,
        &state.config.s3_bucket,
        CommitParams {
            company_id: current.company_id,
            company_name: &company.name,
            section_id,
            title: title.trim(),
            body: body.trim(),
            position: req.position.unwrap_or(current.position),
            archived: false,
            edited_by: user.user_id,
        },
    )
    .await?;

    Ok(Json(CommitResponse {
        version: committed.version,
        s3_key: committed.s3_key,
        section: committed.section,
    }))
}

/// DELETE /api/v1/manual/sections/:id: archives; history keeps every version.
pub async fn handle_archive_section(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(section_id): Path<Uuid>,
) -> Result<Json<CommitResponse>, AppError> {
    user.require(Permission::EditManual)?;
    let current = live_section(&state, &user, section_id).await?;
    let company = fetch_company(&state.db, &user, current.company_id).await?;

    let committed = commit_section(
        &state.db,
        &state.s3,
        &state.config.s3_bucket,
        CommitParams {
            company_id: current.company_id,
            company_name: &company.name,
            section_id,
            title: &current.title,
            body: &current.body,
            position: current.position,
            archived: true,
            edited_by: user.user_id,
        },
    )
    .await?;

    info!("Manual section {section_id} archived at version {}", committed.version);
    Ok(Json(CommitResponse {
        version: committed.version,
        s3_key: committed.s3_key,
        section: committed.section,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_title() {
        assert!(validate_title("Vacaciones").is_ok());
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"x".repeat(MAX_TITLE_CHARS + 1)).is_err());
    }

    #[test]
    fn test_edit_request_fields_are_optional() {
        let req: EditSectionRequest = serde_json::from_str(r#"{"body": "Nuevo texto"}"#).unwrap();
        assert!(req.title.is_none());
        assert_eq!(req.body.as_deref(), Some("Nuevo texto"));
    }
}
