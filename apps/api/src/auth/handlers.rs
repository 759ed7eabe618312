use std::sync::OnceLock;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::extractor::BearerToken;
use crate::auth::password::{hash_password, validate_new_password, verify_password};
use crate::auth::roles::{CurrentUser, Permission, Role};
use crate::auth::session::{create_session, delete_session};
use crate::config::BootstrapConsultant;
use crate::errors::AppError;
use crate::models::user::UserRow;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: u64,
    pub user: CurrentUser,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub role: Role,
    pub company_id: Option<Uuid>,
    pub employee_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct CompanyQuery {
    pub company_id: Option<Uuid>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl TryFrom<&UserRow> for CurrentUser {
    type Error = AppError;

    fn try_from(row: &UserRow) -> Result<Self, AppError> {
        Ok(CurrentUser {
            user_id: row.id,
            email: row.email.clone(),
            display_name: row.display_name.clone(),
            role: row.role.parse()?,
            company_id: row.company_id,
            employee_id: row.employee_id,
        })
    }
}

/// Hash checked when the email is unknown, so both failure paths cost the same.
fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| hash_password("timing-equaliser"))
}

async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>, AppError> {
    Ok(
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await?,
    )
}

/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let email = normalize_email(&req.email);
    let row = find_user_by_email(&state.db, &email).await?;

    let password = req.password;
    let stored = row
        .as_ref()
        .map(|r| r.password_hash.clone())
        .unwrap_or_else(|| dummy_hash().to_string());
    // PBKDF2 is CPU-bound; keep it off the async workers.
    let verified = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password check panicked: {e}")))?;

    let row = match row {
        Some(row) if verified => row,
        _ => {
            info!("Failed login attempt for {email}");
            return Err(AppError::Unauthorized);
        }
    };

    let user = CurrentUser::try_from(&row)?;
    let token = create_session(&state.redis, &user, state.config.session_ttl_secs).await?;
    info!("User {} logged in as {}", user.user_id, user.role.as_str());

    Ok(Json(LoginResponse {
        token,
        expires_in: state.config.session_ttl_secs,
        user,
    }))
}

/// POST /api/v1/auth/logout
pub async fn handle_logout(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<StatusCode, AppError> {
    delete_session(&state.redis, &token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
pub async fn handle_me(user: CurrentUser) -> Json<CurrentUser> {
    Json(user)
}

/// Decides which company a new login belongs to.
fn company_for_new_user(
    creator: &CurrentUser,
    req: &CreateUserRequest,
) -> Result<Option<Uuid>, AppError> {
    if req.role == Role::Consultant {
        if creator.role != Role::Consultant {
            return Err(AppError::Forbidden);
        }
        return Ok(req.company_id);
    }
    creator.resolve_company(req.company_id).map(Some)
}

/// POST /api/v1/users
pub async fn handle_create_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserRow>), AppError> {
    user.require(Permission::ManageUsers)?;

    let email = normalize_email(&req.email);
    if !email.contains('@') {
        return Err(AppError::Validation("A valid email is required".to_string()));
    }
    if req.display_name.trim().is_empty() {
        return Err(AppError::Validation("display_name cannot be empty".to_string()));
    }
    validate_new_password(&req.password).map_err(AppError::Validation)?;

    let company_id = company_for_new_user(&user, &req)?;

    if let Some(employee_id) = req.employee_id {
        let owner: Option<Uuid> =
            sqlx::query_scalar("SELECT company_id FROM employees WHERE id = $1")
                .bind(employee_id)
                .fetch_optional(&state.db)
                .await?;
        match owner {
            Some(owner) if Some(owner) == company_id => {}
            Some(_) => {
                return Err(AppError::Validation(
                    "employee_id belongs to another company".to_string(),
                ))
            }
            None => return Err(AppError::NotFound(format!("Employee {employee_id} not found"))),
        }
    }

    let password = req.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing panicked: {e}")))?;

    let row = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (id, company_id, employee_id, email, password_hash, role, display_name)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(company_id)
    .bind(req.employee_id)
    .bind(&email)
    .bind(&password_hash)
    .bind(req.role.as_str())
    .bind(req.display_name.trim())
    .fetch_one(&state.db)
    .await
    .map_err(|e| AppError::from_insert(e, format!("A user with email {email} already exists")))?;

    info!(
        "User {} created {} account {}",
        user.user_id,
        req.role.as_str(),
        row.id
    );
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/v1/users
pub async fn handle_list_users(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<CompanyQuery>,
) -> Result<Json<Vec<UserRow>>, AppError> {
    user.require(Permission::ManageUsers)?;
    let company_id = user.resolve_company(params.company_id)?;
    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT * FROM users WHERE company_id = $1 ORDER BY display_name",
    )
    .bind(company_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// Seeds the first consultant when the users table is empty.
pub async fn bootstrap_consultant(
    pool: &PgPool,
    bootstrap: &BootstrapConsultant,
) -> anyhow::Result<()> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        return Ok(());
    }
    if let Err(msg) = validate_new_password(&bootstrap.password) {
        anyhow::bail!("BOOTSTRAP_CONSULTANT_PASSWORD rejected: {msg}");
    }

    let email = normalize_email(&bootstrap.email);
    sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash, role, display_name)
        VALUES ($1, $2, $3, 'consultant', 'Consultant')
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&email)
    .bind(hash_password(&bootstrap.password))
    .execute(pool)
    .await?;

    info!("Seeded bootstrap consultant {email}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn creator(role: Role, company: Option<Uuid>) -> CurrentUser {
        CurrentUser {
            user_id: Uuid::new_v4(),
            email: "boss@example.com".to_string(),
            display_name: "Boss".to_string(),
            role,
            company_id: company,
            employee_id: None,
        }
    }

    fn request(role: Role, company_id: Option<Uuid>) -> CreateUserRequest {
        CreateUserRequest {
            email: "new@example.com".to_string(),
            password: "password123".to_string(),
            display_name: "New".to_string(),
            role,
            company_id,
            employee_id: None,
        }
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ana.Perez@Example.COM "), "ana.perez@example.com");
    }

    #[test]
    fn test_employer_cannot_create_consultant() {
        let employer = creator(Role::Employer, Some(Uuid::new_v4()));
        assert!(matches!(
            company_for_new_user(&employer, &request(Role::Consultant, None)),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn test_employer_creates_in_own_company_only() {
        let own = Uuid::new_v4();
        let employer = creator(Role::Employer, Some(own));
        assert_eq!(
            company_for_new_user(&employer, &request(Role::Employee, None)).unwrap(),
            Some(own)
        );
        assert!(company_for_new_user(&employer, &request(Role::Manager, Some(Uuid::new_v4())))
            .is_err());
    }

    #[test]
    fn test_consultant_may_create_unscoped_consultant() {
        let consultant = creator(Role::Consultant, None);
        assert_eq!(
            company_for_new_user(&consultant, &request(Role::Consultant, None)).unwrap(),
            None
        );
    }

    #[test]
    fn test_user_row_to_current_user() {
        let row = UserRow {
            id: Uuid::new_v4(),
            company_id: Some(Uuid::new_v4()),
            employee_id: None,
            email: "x@example.com".to_string(),
            password_hash: "h".to_string(),
            role: "manager".to_string(),
            display_name: "X".to_string(),
            created_at: Utc::now(),
        };
        let user = CurrentUser::try_from(&row).unwrap();
        assert_eq!(user.role, Role::Manager);
        assert_eq!(user.company_id, row.company_id);

        let bad = UserRow {
            role: "root".to_string(),
            ..row
        };
        assert!(CurrentUser::try_from(&bad).is_err());
    }

    #[test]
    fn test_user_row_never_serializes_hash() {
        let row = UserRow {
            id: Uuid::new_v4(),
            company_id: None,
            employee_id: None,
            email: "x@example.com".to_string(),
            password_hash: "secret-hash".to_string(),
            role: "consultant".to_string(),
            display_name: "X".to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&row).unwrap();
        assert!(!json.contains("secret-hash"));
    }
}
