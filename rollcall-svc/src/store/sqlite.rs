//! SQLite-backed roster store

use async_trait::async_trait;
use chrono::Utc;
use rollcall_common::dates::AttendanceDate;
use rollcall_common::events::{EventBus, RollcallEvent};
use rollcall_common::models::{ClassRecord, StudentRecord};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{AppendStatus, RosterStore, StoreError, StoreResult};
use crate::db::attendance::AppendOutcome;
use crate::db::{self, attendance, classes, students};

/// [`RosterStore`] over the shared SQLite pool
pub struct SqliteRosterStore {
    pool: SqlitePool,
    events: EventBus,
    max_lock_wait_ms: u64,
}

impl SqliteRosterStore {
    pub fn new(pool: SqlitePool, events: EventBus, max_lock_wait_ms: u64) -> Self {
        Self {
            pool,
            events,
            max_lock_wait_ms,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl RosterStore for SqliteRosterStore {
    async fn create_class(&self, class: ClassRecord) -> StoreResult<ClassRecord> {
        if let Err(e) = classes::insert_class(&self.pool, &class, self.max_lock_wait_ms).await {
            if db::is_unique_violation(&e) {
                return Err(StoreError::DuplicateClassCode(class.class_code));
            }
            return Err(e.into());
        }

        tracing::info!(
            class_id = %class.id,
            class_code = %class.class_code,
            faculty_id = %class.faculty_id,
            "Class created"
        );

        self.events.emit_lossy(RollcallEvent::ClassCreated {
            class_id: class.id,
            class_code: class.class_code.clone(),
            faculty_id: class.faculty_id.clone(),
            timestamp: Utc::now(),
        });

        Ok(class)
    }

    async fn find_class_by_code(&self, class_code: &str) -> StoreResult<Option<ClassRecord>> {
        Ok(classes::find_by_code(&self.pool, class_code).await?)
    }

    async fn list_classes_for_faculty(&self, faculty_id: &str) -> StoreResult<Vec<ClassRecord>> {
        Ok(classes::list_for_faculty(&self.pool, faculty_id).await?)
    }

    async fn find_student_by_roll_number(
        &self,
        class_id: Uuid,
        roll_number: &str,
    ) -> StoreResult<Option<StudentRecord>> {
        Ok(students::find_by_roll_number(&self.pool, class_id, roll_number).await?)
    }

    async fn insert_student(&self, student: StudentRecord) -> StoreResult<StudentRecord> {
        if let Err(e) = students::insert_student(&self.pool, &student, self.max_lock_wait_ms).await {
            if db::is_unique_violation(&e) {
                return Err(StoreError::DuplicateRollNumber(student.roll_number));
            }
            if let rollcall_common::Error::Database(sqlx::Error::Database(db_err)) = &e {
                if db_err.is_foreign_key_violation() {
                    return Err(StoreError::ClassNotFound(student.class_id.to_string()));
                }
            }
            return Err(e.into());
        }

        tracing::info!(
            class_id = %student.class_id,
            student_id = %student.id,
            roll_number = %student.roll_number,
            "Student enrolled"
        );

        self.events.emit_lossy(RollcallEvent::StudentEnrolled {
            class_id: student.class_id,
            student_id: student.id,
            roll_number: student.roll_number.clone(),
            timestamp: Utc::now(),
        });

        Ok(student)
    }

    async fn update_profile_photo(
        &self,
        class_id: Uuid,
        student_id: Uuid,
        photo: &str,
    ) -> StoreResult<()> {
        let updated =
            students::set_profile_photo(&self.pool, class_id, student_id, photo, self.max_lock_wait_ms)
                .await?;
        if !updated {
            return Err(StoreError::StudentNotFound(student_id));
        }

        tracing::info!(class_id = %class_id, student_id = %student_id, "Profile photo updated");

        self.events.emit_lossy(RollcallEvent::ProfilePhotoUpdated {
            class_id,
            student_id,
            timestamp: Utc::now(),
        });

        Ok(())
    }

    async fn find_students_by_class(&self, class_id: Uuid) -> StoreResult<Vec<StudentRecord>> {
        Ok(students::find_by_class(&self.pool, class_id).await?)
    }

    async fn append_attendance_date(
        &self,
        class_id: Uuid,
        student_id: Uuid,
        date: AttendanceDate,
    ) -> StoreResult<AppendStatus> {
        match attendance::append_date(&self.pool, class_id, student_id, date, self.max_lock_wait_ms)
            .await?
        {
            AppendOutcome::Added => {
                tracing::debug!(class_id = %class_id, student_id = %student_id, date = %date, "Attendance date appended");
                self.events.emit_lossy(RollcallEvent::AttendanceMarked {
                    class_id,
                    student_id,
                    date,
                    timestamp: Utc::now(),
                });
                Ok(AppendStatus::Added)
            }
            AppendOutcome::AlreadyPresent => Ok(AppendStatus::Unchanged),
            AppendOutcome::StudentMissing => Err(StoreError::StudentNotFound(student_id)),
        }
    }

    fn event_bus(&self) -> &EventBus {
        &self.events
    }
}
