//! Student database operations

use rollcall_common::dates::AttendanceDate;
use rollcall_common::models::{sort_roster, StudentRecord};
use rollcall_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

use super::parse_uuid;
use crate::utils::retry_on_lock;

fn student_from_row(row: &SqliteRow) -> Result<StudentRecord> {
    let id: String = row.get("id");
    let class_id: String = row.get("class_id");

    Ok(StudentRecord {
        id: parse_uuid("student id", &id)?,
        class_id: parse_uuid("class id", &class_id)?,
        name: row.get("name"),
        roll_number: row.get("roll_number"),
        attendance_history: BTreeSet::new(),
        profile_photo_url: row.get("profile_photo_url"),
        uid: row.get("uid"),
    })
}

/// Insert a student row
///
/// A second student with the same roll number in the same class fails with
/// a UNIQUE violation.
pub async fn insert_student(pool: &SqlitePool, student: &StudentRecord, max_wait_ms: u64) -> Result<()> {
    let id = student.id.to_string();
    let class_id = student.class_id.to_string();
    let created_at = chrono::Utc::now().to_rfc3339();

    retry_on_lock("insert_student", max_wait_ms, || async {
        sqlx::query(
            r#"
            INSERT INTO students (id, class_id, name, roll_number, profile_photo_url, uid, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&class_id)
        .bind(&student.name)
        .bind(&student.roll_number)
        .bind(&student.profile_photo_url)
        .bind(&student.uid)
        .bind(&created_at)
        .execute(pool)
        .await?;

        Ok(())
    })
    .await
}

/// Replace a student's reference photo
///
/// Returns `false` when no student with that id belongs to the class.
pub async fn set_profile_photo(
    pool: &SqlitePool,
    class_id: Uuid,
    student_id: Uuid,
    photo: &str,
    max_wait_ms: u64,
) -> Result<bool> {
    let class_id = class_id.to_string();
    let student_id = student_id.to_string();

    let rows = retry_on_lock("set_profile_photo", max_wait_ms, || async {
        let result = sqlx::query(
            "UPDATE students SET profile_photo_url = ? WHERE id = ? AND class_id = ?",
        )
        .bind(photo)
        .bind(&student_id)
        .bind(&class_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    })
    .await?;

    Ok(rows > 0)
}

/// Find a student in a class by roll number
pub async fn find_by_roll_number(
    pool: &SqlitePool,
    class_id: Uuid,
    roll_number: &str,
) -> Result<Option<StudentRecord>> {
    let row = sqlx::query(
        r#"
        SELECT id, class_id, name, roll_number, profile_photo_url, uid
        FROM students
        WHERE class_id = ? AND roll_number = ?
        "#,
    )
    .bind(class_id.to_string())
    .bind(roll_number)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let mut student = student_from_row(&row)?;
            student.attendance_history = load_history(pool, student.id).await?;
            Ok(Some(student))
        }
        None => Ok(None),
    }
}

/// Whether a student with this id belongs to the class
pub async fn exists_in_class(pool: &SqlitePool, class_id: Uuid, student_id: Uuid) -> Result<bool> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM students WHERE id = ? AND class_id = ?")
            .bind(student_id.to_string())
            .bind(class_id.to_string())
            .fetch_optional(pool)
            .await?;

    Ok(found.is_some())
}

/// All students of a class with their attendance history, in roster order
pub async fn find_by_class(pool: &SqlitePool, class_id: Uuid) -> Result<Vec<StudentRecord>> {
    let class_id_str = class_id.to_string();

    let rows = sqlx::query(
        r#"
        SELECT id, class_id, name, roll_number, profile_photo_url, uid
        FROM students
        WHERE class_id = ?
        "#,
    )
    .bind(&class_id_str)
    .fetch_all(pool)
    .await?;

    let mut students = rows
        .iter()
        .map(student_from_row)
        .collect::<Result<Vec<_>>>()?;

    let date_rows = sqlx::query(
        r#"
        SELECT a.student_id, a.date
        FROM attendance a
        JOIN students s ON s.id = a.student_id
        WHERE s.class_id = ?
        "#,
    )
    .bind(&class_id_str)
    .fetch_all(pool)
    .await?;

    let mut histories: HashMap<Uuid, BTreeSet<AttendanceDate>> = HashMap::new();
    for row in &date_rows {
        let student_id: String = row.get("student_id");
        let date: String = row.get("date");
        let date = date
            .parse::<AttendanceDate>()
            .map_err(|e| Error::Internal(format!("Corrupt attendance row: {}", e)))?;
        histories
            .entry(parse_uuid("student id", &student_id)?)
            .or_default()
            .insert(date);
    }

    for student in &mut students {
        if let Some(history) = histories.remove(&student.id) {
            student.attendance_history = history;
        }
    }

    sort_roster(&mut students);
    Ok(students)
}

async fn load_history(pool: &SqlitePool, student_id: Uuid) -> Result<BTreeSet<AttendanceDate>> {
    let dates: Vec<String> = sqlx::query_scalar("SELECT date FROM attendance WHERE student_id = ?")
        .bind(student_id.to_string())
        .fetch_all(pool)
        .await?;

    dates
        .iter()
        .map(|d| {
            d.parse::<AttendanceDate>()
                .map_err(|e| Error::Internal(format!("Corrupt attendance row: {}", e)))
        })
        .collect()
}
