//! HTTP API handlers for rollcall-svc
//!
//! REST endpoints under `/classes/:code/...` plus an SSE roster stream.
//! Request and response bodies are snake_case JSON.

pub mod attendance;
pub mod classes;
pub mod health;
pub mod reports;
pub mod sse;
pub mod students;

pub use attendance::attendance_routes;
pub use classes::class_routes;
pub use health::health_routes;
pub use reports::report_routes;
pub use sse::event_routes;
pub use students::student_routes;

use rollcall_common::dates::AttendanceDate;
use rollcall_common::models::StudentRecord;
use rollcall_common::ImageData;
use serde::Serialize;
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Student as returned to clients
///
/// Reference photos are large inline images, so only their presence is
/// reported here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentView {
    pub id: Uuid,
    pub name: String,
    pub roll_number: String,
    pub attendance_history: BTreeSet<AttendanceDate>,
    pub total_attendance: usize,
    pub has_profile_photo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

impl From<&StudentRecord> for StudentView {
    fn from(student: &StudentRecord) -> Self {
        Self {
            id: student.id,
            name: student.name.clone(),
            roll_number: student.roll_number.clone(),
            total_attendance: student.attendance_history.len(),
            attendance_history: student.attendance_history.clone(),
            has_profile_photo: student.has_reference_photo(),
            uid: student.uid.clone(),
        }
    }
}

pub fn student_views(roster: &[StudentRecord]) -> Vec<StudentView> {
    roster.iter().map(StudentView::from).collect()
}

/// Parse an optional `YYYY-MM-DD` request field, defaulting to today
pub(crate) fn parse_date_or_today(value: Option<&str>) -> ApiResult<AttendanceDate> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => parse_date(v),
        None => Ok(AttendanceDate::today()),
    }
}

pub(crate) fn parse_date(value: &str) -> ApiResult<AttendanceDate> {
    value
        .trim()
        .parse::<AttendanceDate>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}

pub(crate) fn parse_photo(value: &str) -> ApiResult<ImageData> {
    ImageData::parse(value).map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Record server-side failures on the way out
pub(crate) async fn tracked<T>(state: &AppState, result: ApiResult<T>) -> ApiResult<T> {
    if let Err(err) = &result {
        state.record_error(err).await;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_view_hides_photo() {
        let student = StudentRecord {
            id: Uuid::new_v4(),
            class_id: Uuid::new_v4(),
            name: "Asha".to_string(),
            roll_number: "1".to_string(),
            attendance_history: ["2024-01-01".parse().unwrap()].into_iter().collect(),
            profile_photo_url: Some("data:image/png;base64,AAAA".to_string()),
            uid: None,
        };

        let view = StudentView::from(&student);
        assert!(view.has_profile_photo);
        assert_eq!(view.total_attendance, 1);

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("profile_photo_url").is_none());
    }

    #[test]
    fn test_parse_date_or_today() {
        assert_eq!(parse_date_or_today(None).unwrap(), AttendanceDate::today());
        assert_eq!(parse_date_or_today(Some("  ")).unwrap(), AttendanceDate::today());
        assert_eq!(
            parse_date_or_today(Some("2024-02-29")).unwrap().to_string(),
            "2024-02-29"
        );
        assert!(matches!(parse_date_or_today(Some("29/02/2024")), Err(ApiError::BadRequest(_))));
    }
}
