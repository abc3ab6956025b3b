//! Attendance summary requester
//!
//! Filters every student's history to a closed date interval, serializes
//! the result and hands it to the summarization delegate. The delegate's
//! text is returned unmodified; nothing is cached or retried.

use rollcall_common::dates::{filter_history, AttendanceDate};
use rollcall_common::models::{ClassRecord, StudentRecord};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::delegate::{DelegateError, SummaryDelegate, SummaryRequest};

/// Days covered when the caller gives no interval
pub const DEFAULT_RANGE_DAYS: i64 = 7;

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    #[error("Summary delegate unavailable: {0}")]
    DelegateUnavailable(String),

    #[error("Summary delegate did not answer within {0:?}")]
    DelegateTimedOut(Duration),

    #[error("Malformed summary response: {0}")]
    Malformed(String),
}

/// One student's presence within the interval, in delegate wire naming
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAttendance {
    pub name: String,
    pub roll_number: String,
    pub present_dates: Vec<AttendanceDate>,
}

/// Per-student attendance within `[start, end]`, in roster order
pub fn attendance_in_range(
    roster: &[StudentRecord],
    start: AttendanceDate,
    end: AttendanceDate,
) -> Vec<StudentAttendance> {
    roster
        .iter()
        .map(|s| StudentAttendance {
            name: s.name.clone(),
            roll_number: s.roll_number.clone(),
            present_dates: filter_history(&s.attendance_history, start, end),
        })
        .collect()
}

/// Resolve an optional interval, defaulting to the week ending `today`
pub fn resolve_range(
    start: Option<AttendanceDate>,
    end: Option<AttendanceDate>,
    today: AttendanceDate,
) -> Result<(AttendanceDate, AttendanceDate), SummaryError> {
    let end = end.unwrap_or(today);
    let start = start.unwrap_or_else(|| end.days_before(DEFAULT_RANGE_DAYS));

    if start > end {
        return Err(SummaryError::InvalidRange(format!(
            "start {} is after end {}",
            start, end
        )));
    }

    Ok((start, end))
}

pub struct SummaryRequester {
    delegate: Arc<dyn SummaryDelegate>,
    timeout: Duration,
}

impl SummaryRequester {
    pub fn new(delegate: Arc<dyn SummaryDelegate>, timeout: Duration) -> Self {
        Self { delegate, timeout }
    }

    /// Summarize attendance of `class` between `start` and `end` inclusive
    pub async fn request_summary(
        &self,
        class: &ClassRecord,
        start: AttendanceDate,
        end: AttendanceDate,
        roster: &[StudentRecord],
    ) -> Result<String, SummaryError> {
        if start > end {
            return Err(SummaryError::InvalidRange(format!(
                "start {} is after end {}",
                start, end
            )));
        }

        let attendance = attendance_in_range(roster, start, end);
        let attendance_data = serde_json::to_string(&attendance)
            .map_err(|e| SummaryError::Malformed(format!("failed to encode attendance: {}", e)))?;

        let request = SummaryRequest {
            class_code: class.class_code.clone(),
            start_date: start.to_string(),
            end_date: end.to_string(),
            attendance_data,
        };

        tracing::info!(
            class_code = %class.class_code,
            start = %start,
            end = %end,
            students = attendance.len(),
            "Requesting attendance summary"
        );

        match tokio::time::timeout(self.timeout, self.delegate.summarize(request)).await {
            Ok(Ok(summary)) => Ok(summary),
            Err(_) | Ok(Err(DelegateError::TimedOut)) => Err(SummaryError::DelegateTimedOut(self.timeout)),
            Ok(Err(DelegateError::Unavailable(msg))) => Err(SummaryError::DelegateUnavailable(msg)),
            Ok(Err(DelegateError::Malformed(msg))) => Err(SummaryError::Malformed(msg)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn date(s: &str) -> AttendanceDate {
        s.parse().unwrap()
    }

    fn student(name: &str, roll: &str, dates: &[&str]) -> StudentRecord {
        StudentRecord {
            id: Uuid::new_v4(),
            class_id: Uuid::nil(),
            name: name.to_string(),
            roll_number: roll.to_string(),
            attendance_history: dates.iter().map(|d| date(d)).collect::<BTreeSet<_>>(),
            profile_photo_url: None,
            uid: None,
        }
    }

    #[test]
    fn test_attendance_payload_shape() {
        let roster = vec![
            student("Asha", "1", &["2024-01-01", "2024-01-05", "2024-02-01"]),
            student("Ben", "2", &[]),
        ];

        let payload = attendance_in_range(&roster, date("2024-01-01"), date("2024-01-31"));
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"name": "Asha", "rollNumber": "1", "presentDates": ["2024-01-01", "2024-01-05"]},
                {"name": "Ben", "rollNumber": "2", "presentDates": []}
            ])
        );
    }

    #[test]
    fn test_default_range_is_week_ending_today() {
        let (start, end) = resolve_range(None, None, date("2024-03-10")).unwrap();
        assert_eq!(start, date("2024-03-03"));
        assert_eq!(end, date("2024-03-10"));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let result = resolve_range(Some(date("2024-03-10")), Some(date("2024-03-01")), date("2024-03-10"));
        assert!(matches!(result, Err(SummaryError::InvalidRange(_))));
    }

    #[test]
    fn test_single_day_range_allowed() {
        let (start, end) =
            resolve_range(Some(date("2024-03-10")), Some(date("2024-03-10")), date("2024-04-01")).unwrap();
        assert_eq!(start, end);
    }
}
