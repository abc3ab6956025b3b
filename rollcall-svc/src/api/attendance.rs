//! Attendance marking endpoints
//!
//! - `POST /classes/:code/attendance/manual` mark selected students present
//! - `POST /classes/:code/attendance/recognize` mark from a classroom photo
//! - `POST /classes/:code/faces` count faces in a photo

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use rollcall_common::dates::AttendanceDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{parse_date_or_today, parse_photo, student_views, tracked, StudentView};
use crate::delegate::DelegateError;
use crate::error::{ApiError, ApiResult};
use crate::services::reconciler::{MarkOutcome, RecognitionDetails, WriteFailure};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ManualMarkRequest {
    /// `YYYY-MM-DD`; today when omitted
    pub date: Option<String>,
    pub student_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct RecognizeRequest {
    pub date: Option<String>,
    /// Classroom photo as a data URI
    pub photo: String,
}

#[derive(Debug, Deserialize)]
pub struct FaceCountRequest {
    pub photo: String,
}

#[derive(Debug, Serialize)]
pub struct FaceCountResponse {
    pub face_count: u32,
}

/// Outcome of a marking session as sent to clients
#[derive(Debug, Serialize)]
pub struct MarkResponse {
    pub class_id: Uuid,
    pub date: AttendanceDate,
    pub present: Vec<StudentView>,
    pub absent: Vec<StudentView>,
    pub mutated_count: usize,
    pub failures: Vec<WriteFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recognition: Option<RecognitionDetails>,
}

impl From<MarkOutcome> for MarkResponse {
    fn from(outcome: MarkOutcome) -> Self {
        Self {
            class_id: outcome.class_id,
            date: outcome.target_date,
            present: student_views(&outcome.present),
            absent: student_views(&outcome.absent),
            mutated_count: outcome.mutated_count,
            failures: outcome.failures,
            recognition: outcome.recognition,
        }
    }
}

/// POST /classes/:code/attendance/manual
pub async fn mark_manual(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(request): Json<ManualMarkRequest>,
) -> ApiResult<Json<MarkResponse>> {
    let result = mark_selected(&state, &code, &request).await;
    tracked(&state, result).await
}

async fn mark_selected(
    state: &AppState,
    code: &str,
    request: &ManualMarkRequest,
) -> ApiResult<Json<MarkResponse>> {
    let date = parse_date_or_today(request.date.as_deref())?;
    let (class, roster) = state.classes.class_with_roster(code).await?;

    let outcome = state
        .reconciler
        .mark_manual(class.id, date, &request.student_ids, &roster)
        .await?;

    Ok(Json(outcome.into()))
}

/// POST /classes/:code/attendance/recognize
pub async fn mark_from_photo(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(request): Json<RecognizeRequest>,
) -> ApiResult<Json<MarkResponse>> {
    let result = recognize_and_mark(&state, &code, &request).await;
    tracked(&state, result).await
}

async fn recognize_and_mark(
    state: &AppState,
    code: &str,
    request: &RecognizeRequest,
) -> ApiResult<Json<MarkResponse>> {
    let date = parse_date_or_today(request.date.as_deref())?;
    let photo = parse_photo(&request.photo)?;
    let (class, roster) = state.classes.class_with_roster(code).await?;

    let outcome = state
        .reconciler
        .mark_attendance(class.id, date, &photo, &roster)
        .await?;
    Ok(Json(outcome.into()))
}

/// POST /classes/:code/faces
///
/// Unreadable model output counts as zero faces.
pub async fn count_faces(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(request): Json<FaceCountRequest>,
) -> ApiResult<Json<FaceCountResponse>> {
    let result = count_faces_in(&state, &code, &request).await;
    tracked(&state, result).await
}

async fn count_faces_in(
    state: &AppState,
    code: &str,
    request: &FaceCountRequest,
) -> ApiResult<Json<FaceCountResponse>> {
    let photo = parse_photo(&request.photo)?;
    // Scope the endpoint to existing classes
    state.classes.find_class_by_code(code).await?;

    let counted = tokio::time::timeout(state.delegate_timeout, state.face_counter.count_faces(&photo)).await;
    let face_count = match counted {
        Err(_) => return Err(DelegateError::TimedOut.into()),
        Ok(Ok(count)) => count,
        Ok(Err(DelegateError::Malformed(msg))) => {
            tracing::warn!(error = %msg, "Malformed face count output, reporting zero");
            0
        }
        Ok(Err(e)) => return Err(ApiError::from(e)),
    };

    Ok(Json(FaceCountResponse { face_count }))
}

/// Build attendance routes
pub fn attendance_routes() -> Router<AppState> {
    Router::new()
        .route("/classes/:code/attendance/manual", post(mark_manual))
        .route("/classes/:code/attendance/recognize", post(mark_from_photo))
        .route("/classes/:code/faces", post(count_faces))
}
