//! Class creation and student enrollment

use chrono::Utc;
use rand::Rng;
use rollcall_common::models::{ClassRecord, NewClass, NewStudent, StudentRecord};
use rollcall_common::ImageData;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::store::{RosterStore, StoreError};

/// Characters a class code is drawn from (no `O`, no `0`)
pub const CLASS_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNPQRSTUVWXYZ123456789";
pub const CLASS_CODE_LEN: usize = 6;
const MAX_CODE_ATTEMPTS: usize = 10;

pub const MIN_CLASS_NAME_LEN: usize = 3;
pub const MIN_STUDENT_NAME_LEN: usize = 2;

#[derive(Debug, Error)]
pub enum EnrollmentError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Class not found: {0}")]
    ClassNotFound(String),

    #[error("Student {0} not found in class")]
    StudentNotFound(Uuid),

    #[error("Roll number '{0}' is already enrolled in this class")]
    DuplicateRollNumber(String),

    #[error("Could not find a free class code after {0} attempts")]
    CodeSpaceExhausted(usize),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for EnrollmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ClassNotFound(code) => EnrollmentError::ClassNotFound(code),
            StoreError::StudentNotFound(id) => EnrollmentError::StudentNotFound(id),
            StoreError::DuplicateRollNumber(roll) => EnrollmentError::DuplicateRollNumber(roll),
            other => EnrollmentError::Store(other),
        }
    }
}

/// Random join code from [`CLASS_CODE_ALPHABET`]
pub fn generate_class_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..CLASS_CODE_LEN)
        .map(|_| CLASS_CODE_ALPHABET[rng.gen_range(0..CLASS_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Canonical form of a user-typed class code
pub fn normalize_class_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

fn validate_photo(photo: Option<&str>) -> Result<Option<String>, EnrollmentError> {
    match photo.map(str::trim).filter(|p| !p.is_empty()) {
        None => Ok(None),
        Some(raw) => ImageData::parse(raw)
            .map(|image| Some(image.to_data_uri()))
            .map_err(|e| EnrollmentError::InvalidInput(e.to_string())),
    }
}

/// Class and enrollment operations over a roster store
pub struct ClassService {
    store: Arc<dyn RosterStore>,
}

impl ClassService {
    pub fn new(store: Arc<dyn RosterStore>) -> Self {
        Self { store }
    }

    /// Create a class with a fresh, unique join code
    pub async fn create_class(&self, new_class: NewClass) -> Result<ClassRecord, EnrollmentError> {
        let class_name = new_class.class_name.trim().to_string();
        let faculty_id = new_class.faculty_id.trim().to_string();

        if class_name.chars().count() < MIN_CLASS_NAME_LEN {
            return Err(EnrollmentError::InvalidInput(format!(
                "class name must be at least {} characters",
                MIN_CLASS_NAME_LEN
            )));
        }
        if faculty_id.is_empty() {
            return Err(EnrollmentError::InvalidInput("faculty_id is required".to_string()));
        }

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let class_code = generate_class_code(&mut rand::thread_rng());
            let record = ClassRecord {
                id: Uuid::new_v4(),
                class_name: class_name.clone(),
                class_code,
                faculty_id: faculty_id.clone(),
                created_at: Utc::now(),
            };

            match self.store.create_class(record).await {
                Ok(created) => return Ok(created),
                Err(StoreError::DuplicateClassCode(code)) => {
                    tracing::debug!(attempt, class_code = %code, "Class code collision, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::error!(attempts = MAX_CODE_ATTEMPTS, "Exhausted class code attempts");
        Err(EnrollmentError::CodeSpaceExhausted(MAX_CODE_ATTEMPTS))
    }

    pub async fn list_classes_for_faculty(&self, faculty_id: &str) -> Result<Vec<ClassRecord>, EnrollmentError> {
        Ok(self.store.list_classes_for_faculty(faculty_id.trim()).await?)
    }

    /// Look up a class by join code; unknown codes are an error
    pub async fn find_class_by_code(&self, class_code: &str) -> Result<ClassRecord, EnrollmentError> {
        let code = normalize_class_code(class_code);
        match self.store.find_class_by_code(&code).await? {
            Some(class) => Ok(class),
            None => Err(EnrollmentError::ClassNotFound(code)),
        }
    }

    /// Class together with its ordered roster
    pub async fn class_with_roster(
        &self,
        class_code: &str,
    ) -> Result<(ClassRecord, Vec<StudentRecord>), EnrollmentError> {
        let class = self.find_class_by_code(class_code).await?;
        let roster = self.store.find_students_by_class(class.id).await?;
        Ok((class, roster))
    }

    /// Enroll a student in the class with `class_code`
    ///
    /// The duplicate pre-check gives a friendly answer in the common case;
    /// the store's uniqueness rule settles concurrent enrollments.
    pub async fn enroll_student(
        &self,
        class_code: &str,
        new_student: NewStudent,
    ) -> Result<StudentRecord, EnrollmentError> {
        let name = new_student.name.trim().to_string();
        let roll_number = new_student.roll_number.trim().to_string();

        if name.chars().count() < MIN_STUDENT_NAME_LEN {
            return Err(EnrollmentError::InvalidInput(format!(
                "name must be at least {} characters",
                MIN_STUDENT_NAME_LEN
            )));
        }
        if roll_number.is_empty() {
            return Err(EnrollmentError::InvalidInput("roll number is required".to_string()));
        }
        let profile_photo_url = validate_photo(new_student.profile_photo_url.as_deref())?;

        let class = self.find_class_by_code(class_code).await?;

        if self
            .store
            .find_student_by_roll_number(class.id, &roll_number)
            .await?
            .is_some()
        {
            return Err(EnrollmentError::DuplicateRollNumber(roll_number));
        }

        let student = StudentRecord {
            id: Uuid::new_v4(),
            class_id: class.id,
            name,
            roll_number,
            attendance_history: BTreeSet::new(),
            profile_photo_url,
            uid: new_student.uid.filter(|u| !u.trim().is_empty()),
        };

        Ok(self.store.insert_student(student).await?)
    }

    /// Replace a student's reference photo with a validated data URI
    pub async fn update_profile_photo(
        &self,
        class_code: &str,
        student_id: Uuid,
        photo: &str,
    ) -> Result<(), EnrollmentError> {
        let photo = validate_photo(Some(photo))?
            .ok_or_else(|| EnrollmentError::InvalidInput("photo is required".to_string()))?;
        let class = self.find_class_by_code(class_code).await?;

        Ok(self.store.update_profile_photo(class.id, student_id, &photo).await?)
    }
}
