use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::{CurrentUser, Permission};
use crate::employees::fetch_employee;
use crate::errors::AppError;
use crate::models::employee::EmployeeRow;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateEmployeeRequest {
    pub company_id: Option<Uuid>,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub base_salary_cents: i64,
    pub hire_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEmployeeRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub base_salary_cents: Option<i64>,
    pub active: Option<bool>,
}

#[derive(Deserialize)]
pub struct ListEmployeesQuery {
    pub company_id: Option<Uuid>,
    #[serde(default)]
    pub include_inactive: bool,
}

fn validate_fields(full_name: &str, email: &str, base_salary_cents: i64) -> Result<(), AppError> {
    if full_name.trim().is_empty() {
        return Err(AppError::Validation("full_name cannot be empty".to_string()));
    }
    if !email.contains('@') {
        return Err(AppError::Validation("A valid email is required".to_string()));
    }
    if base_salary_cents < 0 {
        return Err(AppError::Validation(
            "base_salary_cents must not be negative".to_string(),
        ));
    }
    Ok(())
}

/// POST /api/v1/employees
pub async fn handle_create_employee(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateEmployeeRequest>,
) -> Result<(StatusCode, Json<EmployeeRow>), AppError> {
    user.require(Permission::ManageEmployees)?;
    let company_id = user.resolve_company(req.company_id)?;
    validate_fields(&req.full_name, &req.email, req.base_salary_cents)?;

    let employee = sqlx::query_as::<_, EmployeeRow>(
        r#"
        INSERT INTO employees
            (id, company_id, full_name, email, position, department, base_salary_cents, hire_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(company_id)
    .bind(req.full_name.trim())
    .bind(req.email.trim().to_lowercase())
    .bind(req.position.trim())
    .bind(req.department.trim())
    .bind(req.base_salary_cents)
    .bind(req.hire_date)
    .fetch_one(&state.db)
    .await?;

    info!("Employee {} added to company {company_id}", employee.id);
    Ok((StatusCode::CREATED, Json(employee)))
}

/// GET /api/v1/employees
pub async fn handle_list_employees(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<ListEmployeesQuery>,
) -> Result<Json<Vec<EmployeeRow>>, AppError> {
    if !user.can(Permission::ManageEmployees) {
        user.require(Permission::ViewTeamAttendance)?;
    }
    let company_id = user.resolve_company(params.company_id)?;
    let rows = sqlx::query_as::<_, EmployeeRow>(
        r#"
        SELECT * FROM employees
        WHERE company_id = $1 AND (active OR $2)
        ORDER BY full_name
        "#,
    )
    .bind(company_id)
    .bind(params.include_inactive)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// GET /api/v1/employees/:id
pub async fn handle_get_employee(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(employee_id): Path<Uuid>,
) -> Result<Json<EmployeeRow>, AppError> {
    user.require_self_or(employee_id, Permission::ViewTeamAttendance)?;
    Ok(Json(fetch_employee(&state.db, &user, employee_id).await?))
}

/// PATCH /api/v1/employees/:id
pub async fn handle_update_employee(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(employee_id): Path<Uuid>,
    Json(req): Json<UpdateEmployeeRequest>,
) -> Result<Json<EmployeeRow>, AppError> {
    user.require(Permission::ManageEmployees)?;
    let current = fetch_employee(&state.db, &user, employee_id).await?;

    let full_name = req.full_name.unwrap_or(current.full_name);
    let email = req
        .email
        .map(|e| e.trim().to_lowercase())
        .unwrap_or(current.email);
    let base_salary_cents = req.base_salary_cents.unwrap_or(current.base_salary_cents);
    validate_fields(&full_name, &email, base_salary_cents)?;

    let employee = sqlx::query_as::<_, EmployeeRow>(
        r#"
        UPDATE employees
        SET full_name = $2, email = $3, position = $4, department = $5,
            base_salary_cents = $6, active = $7, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(employee_id)
    .bind(full_name.trim())
    .bind(&email)
    .bind(req.position.unwrap_or(current.position).trim())
    .bind(req.department.unwrap_or(current.department).trim())
    .bind(base_salary_cents)
    .bind(req.active.unwrap_or(current.active))
    .fetch_one(&state.db)
    .await?;

    Ok(Json(employee))
}

/// DELETE /api/v1/employees/:id: soft delete.
pub async fn handle_deactivate_employee(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(employee_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    user.require(Permission::ManageEmployees)?;
    fetch_employee(&state.db, &user, employee_id).await?;

    sqlx::query("UPDATE employees SET active = FALSE, updated_at = now() WHERE id = $1")
        .bind(employee_id)
        .execute(&state.db)
        .await?;

    info!("Employee {employee_id} deactivated by {}", user.user_id);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_fields() {
        assert!(validate_fields("Lucía Gómez", "lucia@example.com", 0).is_ok());
        assert!(validate_fields(" ", "lucia@example.com", 0).is_err());
        assert!(validate_fields("Lucía", "lucia", 0).is_err());
        assert!(validate_fields("Lucía", "lucia@example.com", -1).is_err());
    }

    #[test]
    fn test_create_request_defaults() {
        let req: CreateEmployeeRequest = serde_json::from_str(
            r#"{"full_name": "Lucía", "email": "l@example.com", "hire_date": "2023-02-01"}"#,
        )
        .unwrap();
        assert_eq!(req.base_salary_cents, 0);
        assert!(req.position.is_empty());
        assert!(req.company_id.is_none());
    }
}
