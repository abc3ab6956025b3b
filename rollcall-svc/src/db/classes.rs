//! Class database operations

use chrono::{DateTime, Utc};
use rollcall_common::models::ClassRecord;
use rollcall_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::parse_uuid;
use crate::utils::retry_on_lock;

fn class_from_row(row: &SqliteRow) -> Result<ClassRecord> {
    let id: String = row.get("id");
    let created_at: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| Error::Internal(format!("Failed to parse created_at: {}", e)))?
        .with_timezone(&Utc);

    Ok(ClassRecord {
        id: parse_uuid("class id", &id)?,
        class_name: row.get("class_name"),
        class_code: row.get("class_code"),
        faculty_id: row.get("faculty_id"),
        created_at,
    })
}

/// Insert a class row
///
/// A class code collision surfaces as a UNIQUE violation (see
/// [`super::is_unique_violation`]).
pub async fn insert_class(pool: &SqlitePool, class: &ClassRecord, max_wait_ms: u64) -> Result<()> {
    let id = class.id.to_string();
    let created_at = class.created_at.to_rfc3339();

    retry_on_lock("insert_class", max_wait_ms, || async {
        sqlx::query(
            r#"
            INSERT INTO classes (id, class_name, class_code, faculty_id, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&class.class_name)
        .bind(&class.class_code)
        .bind(&class.faculty_id)
        .bind(&created_at)
        .execute(pool)
        .await?;

        Ok(())
    })
    .await
}

/// Look up a class by its join code
pub async fn find_by_code(pool: &SqlitePool, class_code: &str) -> Result<Option<ClassRecord>> {
    let row = sqlx::query(
        "SELECT id, class_name, class_code, faculty_id, created_at FROM classes WHERE class_code = ?",
    )
    .bind(class_code)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(class_from_row).transpose()
}

/// Classes owned by a faculty member, newest first
pub async fn list_for_faculty(pool: &SqlitePool, faculty_id: &str) -> Result<Vec<ClassRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT id, class_name, class_code, faculty_id, created_at
        FROM classes
        WHERE faculty_id = ?
        ORDER BY created_at DESC, class_name ASC
        "#,
    )
    .bind(faculty_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(class_from_row).collect()
}
