use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::manual::{ManualSectionRow, ManualSnapshotRow};
use crate::storage::put_markdown;

pub struct ManualVersion {
    pub version: i32,
    pub s3_key: String,
    pub section: ManualSectionRow,
}

/// One section state to append to the manual.
pub struct CommitParams<'a> {
    pub company_id: Uuid,
    pub company_name: &'a str,
    pub section_id: Uuid,
    pub title: &'a str,
    pub body: &'a str,
    pub position: i32,
    pub archived: bool,
    pub edited_by: Uuid,
}

pub fn snapshot_key(company_id: Uuid, version: i32) -> String {
    format!("manuals/{company_id}/v{version}.md")
}

/// Appends a section version under the next company-wide version number,
/// then uploads a Markdown snapshot of the whole manual.
/// Rows are never updated; edits and archiving are new versions.
pub async fn commit_section(
    pool: &PgPool,
    s3: &aws_sdk_s3::Client,
    s3_bucket: &str,
    params: CommitParams<'_>,
) -> Result<ManualVersion, AppError> {
    let CommitParams {
        company_id,
        company_name,
        section_id,
        title,
        body,
        position,
        archived,
        edited_by,
    } = params;

    let current_max: Option<i32> =
        sqlx::query_scalar("SELECT MAX(version) FROM manual_sections WHERE company_id = $1")
            .bind(company_id)
            .fetch_one(pool)
            .await?;
    let new_version = current_max.unwrap_or(0) + 1;

    // UNIQUE (company_id, version) rejects a concurrent commit that read the same max.
    let section = sqlx::query_as::<_, ManualSectionRow>(
        r#"
        INSERT INTO manual_sections
            (company_id, section_id, version, title, body, position, archived, edited_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(company_id)
    .bind(section_id)
    .bind(new_version)
    .bind(title)
    .bind(body)
    .bind(position)
    .bind(archived)
    .bind(edited_by)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        AppError::from_insert(e, "The manual was edited concurrently; please retry")
    })?;

    info!("Manual section {section_id} committed as version {new_version} for company {company_id}");

    let sections = current_sections(pool, company_id).await?;
    let s3_key = snapshot_key(company_id, new_version);
    put_markdown(
        s3,
        s3_bucket,
        &s3_key,
        render_manual_to_md(company_name, new_version, &sections),
    )
    .await?;

    sqlx::query(
        "INSERT INTO manual_snapshots (id, company_id, version, s3_key) VALUES ($1, $2, $3, $4)",
    )
    .bind(Uuid::new_v4())
    .bind(company_id)
    .bind(new_version)
    .bind(&s3_key)
    .execute(pool)
    .await?;

    Ok(ManualVersion {
        version: new_version,
        s3_key,
        section,
    })
}

/// Latest version of a single section, archived or not.
pub async fn latest_section(
    pool: &PgPool,
    section_id: Uuid,
) -> Result<Option<ManualSectionRow>, AppError> {
    Ok(sqlx::query_as::<_, ManualSectionRow>(
        "SELECT * FROM manual_sections WHERE section_id = $1 ORDER BY version DESC LIMIT 1",
    )
    .bind(section_id)
    .fetch_optional(pool)
    .await?)
}

/// Live sections of the manual, in reading order.
pub async fn current_sections(
    pool: &PgPool,
    company_id: Uuid,
) -> Result<Vec<ManualSectionRow>, AppError> {
    Ok(sqlx::query_as::<_, ManualSectionRow>(
        r#"
        SELECT * FROM (
            SELECT DISTINCT ON (section_id) *
            FROM manual_sections
            WHERE company_id = $1
            ORDER BY section_id, version DESC
        ) latest
        WHERE NOT archived
        ORDER BY position, title
        "#,
    )
    .bind(company_id)
    .fetch_all(pool)
    .await?)
}

/// Live sections as they stood right after `version` was committed.
pub async fn sections_at_version(
    pool: &PgPool,
    company_id: Uuid,
    version: i32,
) -> Result<Vec<ManualSectionRow>, AppError> {
    Ok(sqlx::query_as::<_, ManualSectionRow>(
        r#"
        SELECT * FROM (
            SELECT DISTINCT ON (section_id) *
            FROM manual_sections
            WHERE company_id = $1 AND version <= $2
            ORDER BY section_id, version DESC
        ) latest
        WHERE NOT archived
        ORDER BY position, title
        "#,
    )
    .bind(company_id)
    .bind(version)
    .fetch_all(pool)
    .await?)
}

pub async fn latest_version(pool: &PgPool, company_id: Uuid) -> Result<Option<i32>, AppError> {
    Ok(
        sqlx::query_scalar("SELECT MAX(version) FROM manual_sections WHERE company_id = $1")
            .bind(company_id)
            .fetch_one(pool)
            .await?,
    )
}

pub async fn version_history(
    pool: &PgPool,
    company_id: Uuid,
) -> Result<Vec<ManualSnapshotRow>, AppError> {
    Ok(sqlx::query_as::<_, ManualSnapshotRow>(
        "SELECT * FROM manual_snapshots WHERE company_id = $1 ORDER BY version ASC",
    )
    .bind(company_id)
    .fetch_all(pool)
    .await?)
}

pub fn render_manual_to_md(company_name: &str, version: i32, sections: &[ManualSectionRow]) -> String {
    let mut md = format!("# Company Manual: {company_name}\n\n_Version {version}_\n\n");
    if sections.is_empty() {
        md.push_str("_This manual has no sections yet._\n");
        return md;
    }
    for section in sections {
        md.push_str(&format!("## {}\n\n", section.title.trim()));
        let body = section.body.trim();
        if !body.is_empty() {
            md.push_str(body);
            md.push_str("\n\n");
        }
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn section(title: &str, body: &str, position: i32) -> ManualSectionRow {
        ManualSectionRow {
            id: Uuid::new_v4(),
            company_id: Uuid::nil(),
            section_id: Uuid::new_v4(),
            version: 1,
            title: title.to_string(),
            body: body.to_string(),
            position,
            archived: false,
            edited_by: Uuid::nil(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_render_manual_keeps_given_order() {
        let md = render_manual_to_md(
            "Verde S.A.",
            4,
            &[
                section("Vacaciones", "15 días hábiles al año.", 0),
                section("Horario", "Entrada a las 09:00.\n", 1),
            ],
        );
        assert!(md.starts_with("# Company Manual: Verde S.A.\n\n_Version 4_"));
        let vacations = md.find("## Vacaciones").unwrap();
        let schedule = md.find("## Horario").unwrap();
        assert!(vacations < schedule);
        assert!(md.contains("Entrada a las 09:00.\n\n"));
    }

    #[test]
    fn test_render_empty_manual() {
        let md = render_manual_to_md("Verde S.A.", 1, &[]);
        assert!(md.contains("no sections yet"));
    }

    #[test]
    fn test_snapshot_key_layout() {
        let company = Uuid::from_u128(42);
        assert_eq!(
            snapshot_key(company, 7),
            format!("manuals/{company}/v7.md")
        );
    }
}
