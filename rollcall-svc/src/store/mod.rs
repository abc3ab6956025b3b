//! Roster store
//!
//! The [`RosterStore`] trait is the seam between the services and the
//! persistence layer. Production uses [`SqliteRosterStore`]; tests wrap it
//! to inject write failures.
//!
//! Every successful mutation emits a [`RollcallEvent`] on the store's
//! [`EventBus`]. [`RosterSubscription`] turns those events into fresh
//! roster snapshots for one class.

mod sqlite;

pub use sqlite::SqliteRosterStore;

use async_trait::async_trait;
use rollcall_common::dates::AttendanceDate;
use rollcall_common::events::{EventBus, RollcallEvent};
use rollcall_common::models::{ClassRecord, StudentRecord};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

/// Store-level errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Class not found: {0}")]
    ClassNotFound(String),

    #[error("Student {0} not found in class")]
    StudentNotFound(Uuid),

    /// Another student of the class already holds this roll number
    #[error("Roll number '{0}' is already enrolled in this class")]
    DuplicateRollNumber(String),

    #[error("Class code '{0}' is already in use")]
    DuplicateClassCode(String),

    /// The store refused a write for reasons other than a missing record
    #[error("Write rejected: {0}")]
    WriteRejected(String),

    #[error(transparent)]
    Common(#[from] rollcall_common::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// What a union-append did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendStatus {
    /// The date was added
    Added,
    /// The date was already in the history
    Unchanged,
}

/// Persistent home of classes, students and attendance histories
#[async_trait]
pub trait RosterStore: Send + Sync {
    /// Insert a fully-formed class record
    ///
    /// Fails with [`StoreError::DuplicateClassCode`] if the code is taken.
    async fn create_class(&self, class: ClassRecord) -> StoreResult<ClassRecord>;

    async fn find_class_by_code(&self, class_code: &str) -> StoreResult<Option<ClassRecord>>;

    async fn list_classes_for_faculty(&self, faculty_id: &str) -> StoreResult<Vec<ClassRecord>>;

    async fn find_student_by_roll_number(
        &self,
        class_id: Uuid,
        roll_number: &str,
    ) -> StoreResult<Option<StudentRecord>>;

    /// Insert a student
    ///
    /// Fails with [`StoreError::DuplicateRollNumber`] when the roll number
    /// is already taken in the class, regardless of any caller pre-check.
    async fn insert_student(&self, student: StudentRecord) -> StoreResult<StudentRecord>;

    async fn update_profile_photo(
        &self,
        class_id: Uuid,
        student_id: Uuid,
        photo: &str,
    ) -> StoreResult<()>;

    /// All students of a class in roster order (natural roll number order)
    async fn find_students_by_class(&self, class_id: Uuid) -> StoreResult<Vec<StudentRecord>>;

    /// Atomically add `date` to one student's history (set union)
    async fn append_attendance_date(
        &self,
        class_id: Uuid,
        student_id: Uuid,
        date: AttendanceDate,
    ) -> StoreResult<AppendStatus>;

    /// Bus on which this store announces its changes
    fn event_bus(&self) -> &EventBus;
}

/// Live view of one class's roster
///
/// The first call to [`next`](Self::next) yields the roster as it was when
/// the subscription opened. Each later call waits for a change to the
/// class and yields a freshly read roster. Changes arriving in a burst are
/// coalesced into one snapshot.
///
/// Dropping the handle releases the subscription; [`unsubscribe`](Self::unsubscribe)
/// does the same explicitly.
pub struct RosterSubscription {
    store: Arc<dyn RosterStore>,
    class_id: Uuid,
    rx: broadcast::Receiver<RollcallEvent>,
    pending: Option<Vec<StudentRecord>>,
}

impl RosterSubscription {
    /// Open a subscription for `class_id`
    ///
    /// Listens before reading the initial snapshot, so no change between the
    /// two is missed.
    pub async fn open(store: Arc<dyn RosterStore>, class_id: Uuid) -> StoreResult<Self> {
        let rx = store.event_bus().subscribe();
        let initial = store.find_students_by_class(class_id).await?;

        tracing::debug!(class_id = %class_id, students = initial.len(), "Roster subscription opened");

        Ok(Self {
            store,
            class_id,
            rx,
            pending: Some(initial),
        })
    }

    pub fn class_id(&self) -> Uuid {
        self.class_id
    }

    /// Next roster snapshot, or `None` once the store has shut down
    pub async fn next(&mut self) -> Option<StoreResult<Vec<StudentRecord>>> {
        if let Some(initial) = self.pending.take() {
            return Some(Ok(initial));
        }

        loop {
            match self.rx.recv().await {
                Ok(event) if event.class_id() == self.class_id && event.changes_roster() => break,
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(class_id = %self.class_id, skipped, "Roster subscription lagged, re-reading");
                    break;
                }
                Err(RecvError::Closed) => return None,
            }
        }

        // Drain whatever else is already queued; one re-read covers it all
        while self.rx.try_recv().is_ok() {}

        Some(self.store.find_students_by_class(self.class_id).await)
    }

    /// Release the subscription
    pub fn unsubscribe(self) {
        tracing::debug!(class_id = %self.class_id, "Roster subscription released");
    }
}
