//! Test Helper Utilities
//!
//! Shared fixtures for rollcall-svc integration tests:
//! - [`StubDelegate`]: scripted recognition / face count / summary answers
//!   with call counting
//! - [`FlakyStore`]: wraps the SQLite store to reject chosen writes or skip
//!   the duplicate roll number lookup
//! - [`TestEnv`]: a fully wired [`AppState`] over an in-memory database

#![allow(dead_code)]

use async_trait::async_trait;
use rollcall_common::dates::{AttendanceDate, DatePolicy};
use rollcall_common::events::EventBus;
use rollcall_common::models::{ClassRecord, NewClass, NewStudent, StudentRecord};
use rollcall_common::ImageData;
use rollcall_svc::delegate::{
    face_count_from_output, summary_from_output, DelegateError, FaceCountDelegate,
    RecognitionDelegate, RecognitionRequest, RecognitionResponse, SummaryDelegate, SummaryRequest,
};
use rollcall_svc::store::{AppendStatus, RosterStore, SqliteRosterStore, StoreError, StoreResult};
use rollcall_svc::AppState;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// 1x1 PNG
pub const PIXEL_PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

pub fn pixel() -> ImageData {
    ImageData::parse(PIXEL_PNG).unwrap()
}

pub fn date(s: &str) -> AttendanceDate {
    s.parse().unwrap()
}

/// What the stub answers to a recognition request
#[derive(Debug, Clone)]
pub enum StubReply {
    /// Raw model JSON, parsed the same way real output is
    Output(Value),
    Unavailable,
    Malformed,
    /// Sleep this long before answering `{}`
    Hang(Duration),
}

/// Deterministic stand-in for the generative model
pub struct StubDelegate {
    recognition: Mutex<StubReply>,
    summary: Mutex<Result<Value, String>>,
    face_output: Mutex<Value>,
    recognize_calls: AtomicUsize,
    summarize_calls: AtomicUsize,
    last_profiles: Mutex<Vec<String>>,
    last_summary_request: Mutex<Option<SummaryRequest>>,
}

impl Default for StubDelegate {
    fn default() -> Self {
        Self {
            recognition: Mutex::new(StubReply::Output(json!({}))),
            summary: Mutex::new(Ok(json!({"summary": "Attendance looks healthy."}))),
            face_output: Mutex::new(json!({"faceCount": 0})),
            recognize_calls: AtomicUsize::new(0),
            summarize_calls: AtomicUsize::new(0),
            last_profiles: Mutex::new(Vec::new()),
            last_summary_request: Mutex::new(None),
        }
    }
}

impl StubDelegate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer recognition with these roll numbers present
    pub fn recognizes(&self, rolls: &[&str]) {
        let students: Vec<Value> = rolls
            .iter()
            .map(|r| json!({"rollNumber": r, "box": {"x": 0.1, "y": 0.1, "width": 0.2, "height": 0.2}}))
            .collect();
        self.reply_with(StubReply::Output(json!({
            "totalFacesDetected": rolls.len(),
            "presentStudents": students,
        })));
    }

    pub fn reply_with(&self, reply: StubReply) {
        *self.recognition.lock().unwrap() = reply;
    }

    pub fn summary_reply(&self, reply: Result<Value, String>) {
        *self.summary.lock().unwrap() = reply;
    }

    pub fn face_output(&self, value: Value) {
        *self.face_output.lock().unwrap() = value;
    }

    pub fn recognize_calls(&self) -> usize {
        self.recognize_calls.load(Ordering::SeqCst)
    }

    pub fn summarize_calls(&self) -> usize {
        self.summarize_calls.load(Ordering::SeqCst)
    }

    /// Roll numbers offered in the most recent recognition request
    pub fn last_profiles(&self) -> Vec<String> {
        self.last_profiles.lock().unwrap().clone()
    }

    pub fn last_summary_request(&self) -> Option<SummaryRequest> {
        self.last_summary_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecognitionDelegate for StubDelegate {
    async fn recognize(&self, request: RecognitionRequest) -> Result<RecognitionResponse, DelegateError> {
        self.recognize_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_profiles.lock().unwrap() = request
            .student_profiles
            .iter()
            .map(|p| p.roll_number.clone())
            .collect();

        let reply = self.recognition.lock().unwrap().clone();
        match reply {
            StubReply::Output(value) => Ok(RecognitionResponse::from_model_output(&value)),
            StubReply::Unavailable => Err(DelegateError::Unavailable("stub offline".to_string())),
            StubReply::Malformed => Err(DelegateError::Malformed("stub garbage".to_string())),
            StubReply::Hang(duration) => {
                tokio::time::sleep(duration).await;
                Ok(RecognitionResponse::from_model_output(&json!({})))
            }
        }
    }
}

#[async_trait]
impl FaceCountDelegate for StubDelegate {
    async fn count_faces(&self, _photo: &ImageData) -> Result<u32, DelegateError> {
        let value = self.face_output.lock().unwrap().clone();
        Ok(face_count_from_output(&value))
    }
}

#[async_trait]
impl SummaryDelegate for StubDelegate {
    async fn summarize(&self, request: SummaryRequest) -> Result<String, DelegateError> {
        self.summarize_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_summary_request.lock().unwrap() = Some(request);

        let reply = self.summary.lock().unwrap().clone();
        match reply {
            Ok(value) => summary_from_output(&value),
            Err(msg) => Err(DelegateError::Unavailable(msg)),
        }
    }
}

/// Store wrapper that can fail chosen writes
pub struct FlakyStore {
    inner: SqliteRosterStore,
    rejected_students: Mutex<HashSet<Uuid>>,
    skip_roll_lookup: AtomicBool,
    fail_roster_reads: AtomicBool,
    append_calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: SqliteRosterStore) -> Self {
        Self {
            inner,
            rejected_students: Mutex::new(HashSet::new()),
            skip_roll_lookup: AtomicBool::new(false),
            fail_roster_reads: AtomicBool::new(false),
            append_calls: AtomicUsize::new(0),
        }
    }

    pub fn reject_writes_for(&self, student_id: Uuid) {
        self.rejected_students.lock().unwrap().insert(student_id);
    }

    /// Make the duplicate pre-check see nothing
    pub fn skip_roll_lookup(&self) {
        self.skip_roll_lookup.store(true, Ordering::SeqCst);
    }

    /// Make every roster read fail with an internal error
    pub fn fail_roster_reads(&self) {
        self.fail_roster_reads.store(true, Ordering::SeqCst);
    }

    pub fn append_calls(&self) -> usize {
        self.append_calls.load(Ordering::SeqCst)
    }

    pub fn pool(&self) -> &SqlitePool {
        self.inner.pool()
    }
}

#[async_trait]
impl RosterStore for FlakyStore {
    async fn create_class(&self, class: ClassRecord) -> StoreResult<ClassRecord> {
        self.inner.create_class(class).await
    }

    async fn find_class_by_code(&self, class_code: &str) -> StoreResult<Option<ClassRecord>> {
        self.inner.find_class_by_code(class_code).await
    }

    async fn list_classes_for_faculty(&self, faculty_id: &str) -> StoreResult<Vec<ClassRecord>> {
        self.inner.list_classes_for_faculty(faculty_id).await
    }

    async fn find_student_by_roll_number(
        &self,
        class_id: Uuid,
        roll_number: &str,
    ) -> StoreResult<Option<StudentRecord>> {
        if self.skip_roll_lookup.load(Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.find_student_by_roll_number(class_id, roll_number).await
    }

    async fn insert_student(&self, student: StudentRecord) -> StoreResult<StudentRecord> {
        self.inner.insert_student(student).await
    }

    async fn update_profile_photo(&self, class_id: Uuid, student_id: Uuid, photo: &str) -> StoreResult<()> {
        self.inner.update_profile_photo(class_id, student_id, photo).await
    }

    async fn find_students_by_class(&self, class_id: Uuid) -> StoreResult<Vec<StudentRecord>> {
        if self.fail_roster_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Common(rollcall_common::Error::Internal(
                "roster read failed".to_string(),
            )));
        }
        self.inner.find_students_by_class(class_id).await
    }

    async fn append_attendance_date(
        &self,
        class_id: Uuid,
        student_id: Uuid,
        date: AttendanceDate,
    ) -> StoreResult<AppendStatus> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);
        if self.rejected_students.lock().unwrap().contains(&student_id) {
            return Err(StoreError::WriteRejected("injected failure".to_string()));
        }
        self.inner.append_attendance_date(class_id, student_id, date).await
    }

    fn event_bus(&self) -> &EventBus {
        self.inner.event_bus()
    }
}

/// Wired-up service over an in-memory database
pub struct TestEnv {
    pub store: Arc<FlakyStore>,
    pub delegate: Arc<StubDelegate>,
    pub state: AppState,
}

impl TestEnv {
    pub async fn new() -> Self {
        let pool = rollcall_svc::db::init_memory_pool().await.unwrap();
        Self::with_pool(pool, DatePolicy::default(), Duration::from_secs(5))
    }

    /// Environment over an on-disk database (multiple connections)
    pub async fn on_disk(path: &Path) -> Self {
        let pool = rollcall_svc::db::init_database_pool(path).await.unwrap();
        Self::with_pool(pool, DatePolicy::default(), Duration::from_secs(5))
    }

    pub async fn with_timeout(delegate_timeout: Duration) -> Self {
        let pool = rollcall_svc::db::init_memory_pool().await.unwrap();
        Self::with_pool(pool, DatePolicy::default(), delegate_timeout)
    }

    pub async fn with_policy(policy: DatePolicy) -> Self {
        let pool = rollcall_svc::db::init_memory_pool().await.unwrap();
        Self::with_pool(pool, policy, Duration::from_secs(5))
    }

    fn with_pool(pool: SqlitePool, policy: DatePolicy, delegate_timeout: Duration) -> Self {
        let store = Arc::new(FlakyStore::new(SqliteRosterStore::new(pool, EventBus::new(64), 5000)));
        let delegate = StubDelegate::new();
        let state = AppState::new(store.clone(), delegate.clone(), policy, delegate_timeout);
        Self {
            store,
            delegate,
            state,
        }
    }

    pub async fn create_class(&self, name: &str) -> ClassRecord {
        self.state
            .classes
            .create_class(NewClass {
                class_name: name.to_string(),
                faculty_id: "faculty-1".to_string(),
            })
            .await
            .unwrap()
    }

    /// Enroll a student; `with_photo` attaches a valid reference photo
    pub async fn enroll(&self, class: &ClassRecord, name: &str, roll: &str, with_photo: bool) -> StudentRecord {
        self.state
            .classes
            .enroll_student(
                &class.class_code,
                NewStudent {
                    name: name.to_string(),
                    roll_number: roll.to_string(),
                    uid: None,
                    profile_photo_url: with_photo.then(|| PIXEL_PNG.to_string()),
                },
            )
            .await
            .unwrap()
    }

    pub async fn roster(&self, class: &ClassRecord) -> Vec<StudentRecord> {
        self.store.find_students_by_class(class.id).await.unwrap()
    }
}
