//! Class endpoints
//!
//! - `POST /classes` create a class
//! - `GET /classes?faculty_id=...` faculty dashboard listing
//! - `GET /classes/:code` class with its roster (join-code lookup)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rollcall_common::models::{ClassRecord, NewClass};
use serde::{Deserialize, Serialize};

use super::{student_views, StudentView};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListClassesQuery {
    pub faculty_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClassListResponse {
    pub classes: Vec<ClassRecord>,
}

#[derive(Debug, Serialize)]
pub struct ClassDetailResponse {
    pub class: ClassRecord,
    pub students: Vec<StudentView>,
}

/// POST /classes
pub async fn create_class(
    State(state): State<AppState>,
    Json(request): Json<NewClass>,
) -> ApiResult<(StatusCode, Json<ClassRecord>)> {
    let class = state.classes.create_class(request).await?;
    Ok((StatusCode::CREATED, Json(class)))
}

/// GET /classes?faculty_id=...
pub async fn list_classes(
    State(state): State<AppState>,
    Query(query): Query<ListClassesQuery>,
) -> ApiResult<Json<ClassListResponse>> {
    let faculty_id = query
        .faculty_id
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("faculty_id query parameter is required".to_string()))?;

    let classes = state.classes.list_classes_for_faculty(&faculty_id).await?;
    Ok(Json(ClassListResponse { classes }))
}

/// GET /classes/:code
pub async fn get_class(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<ClassDetailResponse>> {
    let (class, roster) = state.classes.class_with_roster(&code).await?;
    Ok(Json(ClassDetailResponse {
        class,
        students: student_views(&roster),
    }))
}

/// Build class routes
pub fn class_routes() -> Router<AppState> {
    Router::new()
        .route("/classes", post(create_class).get(list_classes))
        .route("/classes/:code", get(get_class))
}
