//! Attendance history views and CSV export

use rollcall_common::dates::AttendanceDate;
use rollcall_common::models::StudentRecord;
use serde::Serialize;
use std::collections::BTreeSet;
use uuid::Uuid;

/// One (date, student) presence entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRecord {
    pub date: AttendanceDate,
    pub student_id: Uuid,
    pub name: String,
    pub roll_number: String,
}

/// Flatten every history into records, newest date first
///
/// Records sharing a date keep roster order.
pub fn history_records(roster: &[StudentRecord]) -> Vec<HistoryRecord> {
    let mut records: Vec<HistoryRecord> = roster
        .iter()
        .flat_map(|s| {
            s.attendance_history.iter().map(move |date| HistoryRecord {
                date: *date,
                student_id: s.id,
                name: s.name.clone(),
                roll_number: s.roll_number.clone(),
            })
        })
        .collect();

    // Stable sort keeps roster order within a date
    records.sort_by(|a, b| b.date.cmp(&a.date));
    records
}

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Attendance matrix as CSV
///
/// Header is `Roll Number,Name,<every recorded date ascending>`; each row
/// holds `P` or `A` per date. Rows follow the roster order given.
pub fn attendance_csv(roster: &[StudentRecord]) -> String {
    let dates: BTreeSet<AttendanceDate> = roster
        .iter()
        .flat_map(|s| s.attendance_history.iter().copied())
        .collect();

    let mut out = String::new();
    let mut header = vec!["Roll Number".to_string(), "Name".to_string()];
    header.extend(dates.iter().map(|d| d.to_string()));
    out.push_str(&header.join(","));
    out.push('\n');

    for student in roster {
        let mut row = vec![csv_quote(&student.roll_number), csv_quote(&student.name)];
        row.extend(dates.iter().map(|d| {
            if student.attended(d) { "P" } else { "A" }.to_string()
        }));
        out.push_str(&row.join(","));
        out.push('\n');
    }

    out
}

/// Download filename for a class export
pub fn csv_filename(class_code: &str) -> String {
    format!("{}_attendance.csv", class_code)
}
