//! History, CSV export and summary endpoints

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use rollcall_common::dates::AttendanceDate;
use serde::{Deserialize, Serialize};

use super::{parse_date, tracked};
use crate::error::{ApiError, ApiResult};
use crate::services::export::{attendance_csv, csv_filename, history_records, HistoryRecord};
use crate::services::summary::resolve_range;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub class_code: String,
    pub records: Vec<HistoryRecord>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryBody {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub class_code: String,
    pub start_date: AttendanceDate,
    pub end_date: AttendanceDate,
    pub summary: String,
}

/// GET /classes/:code/history
pub async fn get_history(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<HistoryResponse>> {
    let (class, roster) = state.classes.class_with_roster(&code).await?;
    Ok(Json(HistoryResponse {
        class_code: class.class_code,
        records: history_records(&roster),
    }))
}

/// GET /classes/:code/attendance.csv
pub async fn export_csv(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let (class, roster) = state.classes.class_with_roster(&code).await?;
    let body = attendance_csv(&roster);
    let disposition = format!("attachment; filename=\"{}\"", csv_filename(&class.class_code));

    tracing::info!(class_code = %class.class_code, students = roster.len(), "Attendance exported");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

/// POST /classes/:code/summary
///
/// Omitted dates default to the week ending today. The body may be left
/// empty; anything else must be a JSON object sent as `application/json`.
pub async fn summarize(
    State(state): State<AppState>,
    Path(code): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<SummaryResponse>> {
    let body = summary_body(&headers, &body)?;
    let result = summarize_class(&state, &code, &body).await;
    tracked(&state, result).await
}

fn summary_body(headers: &HeaderMap, body: &[u8]) -> ApiResult<SummaryBody> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(SummaryBody::default());
    }

    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false);
    if !is_json {
        return Err(ApiError::BadRequest(
            "summary body must be sent as application/json".to_string(),
        ));
    }

    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid summary body: {}", e)))
}

async fn summarize_class(
    state: &AppState,
    code: &str,
    body: &SummaryBody,
) -> ApiResult<Json<SummaryResponse>> {
    let start = body.start_date.as_deref().map(parse_date).transpose()?;
    let end = body.end_date.as_deref().map(parse_date).transpose()?;
    let (start_date, end_date) = resolve_range(start, end, AttendanceDate::today())?;

    let (class, roster) = state.classes.class_with_roster(code).await?;
    let summary = state
        .summaries
        .request_summary(&class, start_date, end_date, &roster)
        .await?;

    Ok(Json(SummaryResponse {
        class_code: class.class_code,
        start_date,
        end_date,
        summary,
    }))
}

/// Build report routes
pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/classes/:code/history", get(get_history))
        .route("/classes/:code/attendance.csv", get(export_csv))
        .route("/classes/:code/summary", post(summarize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"));
        headers
    }

    #[test]
    fn test_empty_summary_body_uses_defaults() {
        let body = summary_body(&HeaderMap::new(), b"  \n").unwrap();
        assert!(body.start_date.is_none() && body.end_date.is_none());
    }

    #[test]
    fn test_summary_body_parsed() {
        let body = summary_body(&json_headers(), br#"{"start_date": "2024-01-01"}"#).unwrap();
        assert_eq!(body.start_date.as_deref(), Some("2024-01-01"));
        assert!(body.end_date.is_none());
    }

    #[test]
    fn test_summary_body_rejections() {
        let typed_wrong = summary_body(&json_headers(), br#"{"start_date": 20240101}"#);
        assert!(matches!(typed_wrong, Err(ApiError::BadRequest(_))));

        let no_content_type = summary_body(&HeaderMap::new(), br#"{"start_date": "2024-01-01"}"#);
        assert!(matches!(no_content_type, Err(ApiError::BadRequest(_))));
    }
}
