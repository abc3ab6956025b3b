//! Class and student records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::dates::AttendanceDate;
use crate::roll::compare_roll_numbers;

/// A class owned by one faculty member, joined by students via `class_code`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRecord {
    pub id: Uuid,
    pub class_name: String,
    /// Shareable join code, unique across all classes
    pub class_code: String,
    /// Owner
    pub faculty_id: String,
    pub created_at: DateTime<Utc>,
}

/// A student enrolled in exactly one class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub id: Uuid,
    pub class_id: Uuid,
    pub name: String,
    /// Unique within the owning class
    pub roll_number: String,
    /// Dates the student was present; a date appears at most once
    pub attendance_history: BTreeSet<AttendanceDate>,
    /// Reference photo used for recognition (data URI)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_photo_url: Option<String>,
    /// Identity of the student's own account, when self-enrolled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

impl StudentRecord {
    /// Whether the student can be matched by face recognition at all
    pub fn has_reference_photo(&self) -> bool {
        self.profile_photo_url
            .as_deref()
            .map(|p| !p.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn attended(&self, date: &AttendanceDate) -> bool {
        self.attendance_history.contains(date)
    }
}

/// Order two students the way rosters are displayed
pub fn roster_order(a: &StudentRecord, b: &StudentRecord) -> Ordering {
    compare_roll_numbers(&a.roll_number, &b.roll_number).then_with(|| a.id.cmp(&b.id))
}

/// Sort a roster in place by roll number (numeric-aware)
pub fn sort_roster(roster: &mut [StudentRecord]) {
    roster.sort_by(roster_order);
}

/// Input for creating a class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClass {
    pub class_name: String,
    pub faculty_id: String,
}

/// Input for enrolling a student
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewStudent {
    pub name: String,
    pub roll_number: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub profile_photo_url: Option<String>,
}
