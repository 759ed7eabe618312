use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::assistant::{ask, AssistantAnswer};
use crate::auth::{CurrentUser, Permission};
use crate::companies::fetch_company;
use crate::errors::AppError;
use crate::manual::versioning::current_sections;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    pub company_id: Option<Uuid>,
}

/// POST /api/v1/assistant/ask
pub async fn handle_ask(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<AskRequest>,
) -> Result<Json<AssistantAnswer>, AppError> {
    user.require(Permission::UseAssistant)?;
    let company_id = user.resolve_company(req.company_id)?;
    let company = fetch_company(&state.db, &user, company_id).await?;
    let sections = current_sections(&state.db, company_id).await?;

    let reply = ask(state.llm.as_ref(), &company.name, &sections, &req.question).await?;
    info!(
        "Assistant answered {} for company {company_id} citing {} sections",
        user.user_id,
        reply.sources.len()
    );
    Ok(Json(reply))
}
