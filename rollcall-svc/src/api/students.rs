//! Roster and enrollment endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use rollcall_common::models::NewStudent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{student_views, StudentView};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct RosterResponse {
    pub class_code: String,
    pub students: Vec<StudentView>,
}

#[derive(Debug, Deserialize)]
pub struct PhotoRequest {
    /// `data:image/...;base64,...`
    pub photo: String,
}

/// GET /classes/:code/students
pub async fn list_students(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<RosterResponse>> {
    let (class, roster) = state.classes.class_with_roster(&code).await?;
    Ok(Json(RosterResponse {
        class_code: class.class_code,
        students: student_views(&roster),
    }))
}

/// POST /classes/:code/students
///
/// 201 on success, 409 when the roll number is taken.
pub async fn enroll_student(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(request): Json<NewStudent>,
) -> ApiResult<(StatusCode, Json<StudentView>)> {
    let student = state.classes.enroll_student(&code, request).await?;
    Ok((StatusCode::CREATED, Json(StudentView::from(&student))))
}

/// PUT /classes/:code/students/:student_id/photo
pub async fn update_photo(
    State(state): State<AppState>,
    Path((code, student_id)): Path<(String, Uuid)>,
    Json(request): Json<PhotoRequest>,
) -> ApiResult<StatusCode> {
    state
        .classes
        .update_profile_photo(&code, student_id, &request.photo)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build roster routes
pub fn student_routes() -> Router<AppState> {
    Router::new()
        .route("/classes/:code/students", get(list_students).post(enroll_student))
        .route("/classes/:code/students/:student_id/photo", put(update_photo))
}
