use chrono::NaiveDate;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::attendance::time_calc::{DayEvaluation, Shift};
use crate::errors::AppError;
use crate::models::attendance::AttendanceRecordRow;

pub async fn find_record(
    pool: &PgPool,
    employee_id: Uuid,
    work_date: NaiveDate,
) -> Result<Option<AttendanceRecordRow>, AppError> {
    Ok(sqlx::query_as::<_, AttendanceRecordRow>(
        "SELECT * FROM attendance_records WHERE employee_id = $1 AND work_date = $2",
    )
    .bind(employee_id)
    .bind(work_date)
    .fetch_optional(pool)
    .await?)
}

pub async fn find_record_by_id(
    pool: &PgPool,
    record_id: Uuid,
) -> Result<AttendanceRecordRow, AppError> {
    sqlx::query_as::<_, AttendanceRecordRow>("SELECT * FROM attendance_records WHERE id = $1")
        .bind(record_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Attendance record {record_id} not found")))
}

/// The most recent shift that is checked in but not out. Shifts may cross
/// midnight, so this is looked up by state rather than by date.
pub async fn find_open_record(
    pool: &PgPool,
    employee_id: Uuid,
) -> Result<Option<AttendanceRecordRow>, AppError> {
    Ok(sqlx::query_as::<_, AttendanceRecordRow>(
        r#"
        SELECT * FROM attendance_records
        WHERE employee_id = $1 AND check_in IS NOT NULL AND check_out IS NULL
        ORDER BY work_date DESC
        LIMIT 1
        "#,
    )
    .bind(employee_id)
    .fetch_optional(pool)
    .await?)
}

pub struct NewRecord<'a> {
    pub company_id: Uuid,
    pub employee_id: Uuid,
    pub work_date: NaiveDate,
    pub shift: &'a Shift,
    pub evaluation: &'a DayEvaluation,
    pub notes: Option<&'a str>,
}

pub async fn insert_record(
    pool: &PgPool,
    record: NewRecord<'_>,
) -> Result<AttendanceRecordRow, AppError> {
    let NewRecord {
        company_id,
        employee_id,
        work_date,
        shift,
        evaluation,
        notes,
    } = record;

    sqlx::query_as::<_, AttendanceRecordRow>(
        r#"
        INSERT INTO attendance_records
            (id, company_id, employee_id, work_date, check_in, check_out, breaks,
             status, worked_minutes, overtime_minutes, total_hours, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(company_id)
    .bind(employee_id)
    .bind(work_date)
    .bind(shift.check_in)
    .bind(shift.check_out)
    .bind(Json(&shift.breaks))
    .bind(evaluation.status.as_str())
    .bind(evaluation.worked.worked_minutes)
    .bind(evaluation.worked.overtime_minutes)
    .bind(evaluation.worked.total_hours)
    .bind(notes)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        AppError::from_insert(
            e,
            format!("Employee {employee_id} already has a record for {work_date}"),
        )
    })
}

pub async fn update_record(
    pool: &PgPool,
    record_id: Uuid,
    shift: &Shift,
    evaluation: &DayEvaluation,
    notes: Option<&str>,
) -> Result<AttendanceRecordRow, AppError> {
    Ok(sqlx::query_as::<_, AttendanceRecordRow>(
        r#"
        UPDATE attendance_records
        SET check_in = $2, check_out = $3, breaks = $4, status = $5,
            worked_minutes = $6, overtime_minutes = $7, total_hours = $8,
            notes = COALESCE($9, notes), updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(record_id)
    .bind(shift.check_in)
    .bind(shift.check_out)
    .bind(Json(&shift.breaks))
    .bind(evaluation.status.as_str())
    .bind(evaluation.worked.worked_minutes)
    .bind(evaluation.worked.overtime_minutes)
    .bind(evaluation.worked.total_hours)
    .bind(notes)
    .fetch_one(pool)
    .await?)
}

/// Records of a company in `[from, to]`, optionally for one employee.
pub async fn list_records(
    pool: &PgPool,
    company_id: Uuid,
    employee_id: Option<Uuid>,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<AttendanceRecordRow>, AppError> {
    Ok(sqlx::query_as::<_, AttendanceRecordRow>(
        r#"
        SELECT * FROM attendance_records
        WHERE company_id = $1
          AND ($2::uuid IS NULL OR employee_id = $2)
          AND work_date BETWEEN $3 AND $4
        ORDER BY work_date, employee_id
        "#,
    )
    .bind(company_id)
    .bind(employee_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?)
}
