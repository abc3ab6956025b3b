//! Inference delegates
//!
//! Face matching, face counting and attendance summaries are all performed
//! by an external generative model. The service only sees the traits below;
//! [`GenAiClient`] implements all three over HTTP and tests substitute
//! deterministic stubs.
//!
//! Model output is parsed leniently. A recognition or face-count answer
//! missing its fields reads as "nothing found" rather than an error.

pub mod genai_client;
pub mod prompts;

pub use genai_client::GenAiClient;

use async_trait::async_trait;
use rollcall_common::ImageData;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Delegate failures
#[derive(Debug, Error)]
pub enum DelegateError {
    /// Network failure, non-2xx status or missing credentials
    #[error("Delegate unavailable: {0}")]
    Unavailable(String),

    #[error("Delegate timed out")]
    TimedOut,

    /// The reply could not be read as the expected JSON document
    #[error("Malformed delegate response: {0}")]
    Malformed(String),
}

/// A roster entry offered for matching
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub roll_number: String,
    pub profile_photo: ImageData,
}

/// One recognition request: the classroom photo and every matchable student
#[derive(Debug, Clone)]
pub struct RecognitionRequest {
    pub class_photo: ImageData,
    pub student_profiles: Vec<StudentProfile>,
}

/// Face bounding box as fractions of image width and height
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A student the model judged present
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedStudent {
    pub roll_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "box")]
    pub face_box: Option<FaceBox>,
}

/// Recognition result
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecognitionResponse {
    pub present: Vec<RecognizedStudent>,
    pub total_faces_detected: Option<u32>,
}

impl RecognitionResponse {
    /// Read `{ totalFacesDetected, presentStudents: [{ rollNumber, box }] }`
    ///
    /// A missing or non-array `presentStudents` yields no students. Entries
    /// without a string `rollNumber` are skipped; a bad `box` is dropped
    /// without discarding the entry. Bare strings in the array are accepted
    /// as roll numbers.
    pub fn from_model_output(value: &Value) -> Self {
        let present = value
            .get("presentStudents")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(recognized_from_value).collect())
            .unwrap_or_default();

        let total_faces_detected = value
            .get("totalFacesDetected")
            .and_then(Value::as_u64)
            .map(|n| n.min(u32::MAX as u64) as u32);

        Self {
            present,
            total_faces_detected,
        }
    }

    pub fn present_roll_numbers(&self) -> impl Iterator<Item = &str> {
        self.present.iter().map(|s| s.roll_number.as_str())
    }
}

fn recognized_from_value(entry: &Value) -> Option<RecognizedStudent> {
    if let Some(roll) = entry.as_str() {
        return Some(RecognizedStudent {
            roll_number: roll.to_string(),
            face_box: None,
        });
    }

    let roll_number = match entry.get("rollNumber")? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let face_box = entry
        .get("box")
        .and_then(|b| serde_json::from_value::<FaceBox>(b.clone()).ok());

    Some(RecognizedStudent {
        roll_number,
        face_box,
    })
}

/// Read `{ faceCount }`; anything else counts as zero faces
pub fn face_count_from_output(value: &Value) -> u32 {
    value
        .get("faceCount")
        .and_then(Value::as_u64)
        .map(|n| n.min(u32::MAX as u64) as u32)
        .unwrap_or(0)
}

/// Summarization input, in the delegate's wire naming
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    pub class_code: String,
    pub start_date: String,
    pub end_date: String,
    /// JSON array of `{ name, rollNumber, presentDates }`
    pub attendance_data: String,
}

/// Read `{ summary }`
pub fn summary_from_output(value: &Value) -> Result<String, DelegateError> {
    value
        .get("summary")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| DelegateError::Malformed("missing 'summary' string".to_string()))
}

/// Matches students in a classroom photo against their reference photos
#[async_trait]
pub trait RecognitionDelegate: Send + Sync {
    async fn recognize(&self, request: RecognitionRequest) -> Result<RecognitionResponse, DelegateError>;
}

/// Counts clearly visible faces in a photo
#[async_trait]
pub trait FaceCountDelegate: Send + Sync {
    async fn count_faces(&self, photo: &ImageData) -> Result<u32, DelegateError>;
}

/// Produces a free-text attendance summary
#[async_trait]
pub trait SummaryDelegate: Send + Sync {
    async fn summarize(&self, request: SummaryRequest) -> Result<String, DelegateError>;
}
