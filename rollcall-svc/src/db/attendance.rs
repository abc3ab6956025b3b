//! Attendance date persistence
//!
//! Histories are stored one row per `(student_id, date)`. Appending is an
//! `INSERT OR IGNORE`, so repeated or concurrent appends of the same date
//! leave exactly one row and never remove other dates.

use rollcall_common::dates::AttendanceDate;
use rollcall_common::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::utils::retry_on_lock;

/// Result of a union-append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The date was added to the history
    Added,
    /// The date was already present; nothing changed
    AlreadyPresent,
    /// No such student in the class
    StudentMissing,
}

/// Add `date` to a student's history if it is not already there
pub async fn append_date(
    pool: &SqlitePool,
    class_id: Uuid,
    student_id: Uuid,
    date: AttendanceDate,
    max_wait_ms: u64,
) -> Result<AppendOutcome> {
    let class_id_str = class_id.to_string();
    let student_id_str = student_id.to_string();
    let date_str = date.to_string();
    let recorded_at = chrono::Utc::now().to_rfc3339();

    let inserted = retry_on_lock("append_attendance_date", max_wait_ms, || async {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO attendance (student_id, date, recorded_at)
            SELECT id, ?, ? FROM students WHERE id = ? AND class_id = ?
            "#,
        )
        .bind(&date_str)
        .bind(&recorded_at)
        .bind(&student_id_str)
        .bind(&class_id_str)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    })
    .await?;

    if inserted > 0 {
        return Ok(AppendOutcome::Added);
    }

    if super::students::exists_in_class(pool, class_id, student_id).await? {
        Ok(AppendOutcome::AlreadyPresent)
    } else {
        Ok(AppendOutcome::StudentMissing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{classes, init_memory_pool, students};
    use chrono::Utc;
    use rollcall_common::models::{ClassRecord, StudentRecord};
    use std::collections::BTreeSet;

    async fn seeded(pool: &SqlitePool) -> (Uuid, Uuid) {
        let class = ClassRecord {
            id: Uuid::new_v4(),
            class_name: "Maths".to_string(),
            class_code: "MTH200".to_string(),
            faculty_id: "f1".to_string(),
            created_at: Utc::now(),
        };
        classes::insert_class(pool, &class, 1000).await.unwrap();

        let student = StudentRecord {
            id: Uuid::new_v4(),
            class_id: class.id,
            name: "Asha".to_string(),
            roll_number: "1".to_string(),
            attendance_history: BTreeSet::new(),
            profile_photo_url: None,
            uid: None,
        };
        students::insert_student(pool, &student, 1000).await.unwrap();
        (class.id, student.id)
    }

    #[tokio::test]
    async fn test_append_is_idempotent() {
        let pool = init_memory_pool().await.unwrap();
        let (class_id, student_id) = seeded(&pool).await;
        let date: AttendanceDate = "2024-03-01".parse().unwrap();

        let first = append_date(&pool, class_id, student_id, date, 1000).await.unwrap();
        let second = append_date(&pool, class_id, student_id, date, 1000).await.unwrap();
        assert_eq!(first, AppendOutcome::Added);
        assert_eq!(second, AppendOutcome::AlreadyPresent);

        let roster = students::find_by_class(&pool, class_id).await.unwrap();
        assert_eq!(roster[0].attendance_history.len(), 1);
    }

    #[tokio::test]
    async fn test_append_keeps_other_dates() {
        let pool = init_memory_pool().await.unwrap();
        let (class_id, student_id) = seeded(&pool).await;

        for d in ["2024-03-01", "2024-03-02"] {
            append_date(&pool, class_id, student_id, d.parse().unwrap(), 1000)
                .await
                .unwrap();
        }

        let roster = students::find_by_class(&pool, class_id).await.unwrap();
        let dates: Vec<String> = roster[0]
            .attendance_history
            .iter()
            .map(|d| d.to_string())
            .collect();
        assert_eq!(dates, vec!["2024-03-01", "2024-03-02"]);
    }

    #[tokio::test]
    async fn test_append_for_student_outside_class() {
        let pool = init_memory_pool().await.unwrap();
        let (_, student_id) = seeded(&pool).await;

        let outcome = append_date(
            &pool,
            Uuid::new_v4(),
            student_id,
            "2024-03-01".parse().unwrap(),
            1000,
        )
        .await
        .unwrap();
        assert_eq!(outcome, AppendOutcome::StudentMissing);
    }
}
