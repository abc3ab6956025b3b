//! Attendance reconciler
//!
//! One marking session runs in a fixed order:
//!
//! 1. Keep only students with a reference photo. If none remain, everyone
//!    is absent and the delegate is never called.
//! 2. Ask the recognition delegate, once, under a timeout.
//! 3. Partition the roster into present and absent. Roll numbers the
//!    delegate invents, or that belong to photo-less students, are ignored.
//! 4. Union-append the date for each present student who does not already
//!    have it. Writes run concurrently and fail independently.
//!
//! A delegate failure aborts the session before any write. The outcome is
//! a snapshot of the roster passed in and is not refreshed if the roster
//! changes while the session runs.

use futures::future::join_all;
use rollcall_common::dates::{AttendanceDate, DatePolicy};
use rollcall_common::models::StudentRecord;
use rollcall_common::ImageData;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::delegate::{
    DelegateError, RecognitionDelegate, RecognitionRequest, RecognizedStudent, StudentProfile,
};
use crate::store::{AppendStatus, RosterStore, StoreError};

/// Session-level failures; no write has happened when one is returned
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Recognition delegate unavailable: {0}")]
    DelegateUnavailable(String),

    #[error("Recognition delegate did not answer within {0:?}")]
    DelegateTimedOut(Duration),
}

/// Why a single student's write did not land
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteFailureKind {
    /// The store refused or failed the write
    Rejected,
    /// The id is not on the class roster
    UnknownStudent,
}

/// Per-student write failure; other students' writes are unaffected
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteFailure {
    pub student_id: Uuid,
    pub roll_number: Option<String>,
    pub kind: WriteFailureKind,
    pub reason: String,
}

/// Delegate extras passed through for overlay rendering
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecognitionDetails {
    pub total_faces_detected: Option<u32>,
    /// Accepted matches only, in the delegate's order
    pub matches: Vec<RecognizedStudent>,
}

/// Result of one marking session
#[derive(Debug, Clone, Serialize)]
pub struct MarkOutcome {
    pub class_id: Uuid,
    pub target_date: AttendanceDate,
    /// Present students in roster order, as they were before the writes
    pub present: Vec<StudentRecord>,
    /// Everyone else, in roster order
    pub absent: Vec<StudentRecord>,
    /// Number of histories that gained the date
    pub mutated_count: usize,
    pub failures: Vec<WriteFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recognition: Option<RecognitionDetails>,
}

impl MarkOutcome {
    fn everyone_absent(class_id: Uuid, target_date: AttendanceDate, roster: &[StudentRecord]) -> Self {
        Self {
            class_id,
            target_date,
            present: Vec::new(),
            absent: roster.to_vec(),
            mutated_count: 0,
            failures: Vec::new(),
            recognition: None,
        }
    }

    pub fn present_roll_numbers(&self) -> Vec<&str> {
        self.present.iter().map(|s| s.roll_number.as_str()).collect()
    }
}

/// Split `roster` by membership in `present_ids`, preserving roster order
pub fn partition_roster(
    roster: &[StudentRecord],
    present_ids: &HashSet<Uuid>,
) -> (Vec<StudentRecord>, Vec<StudentRecord>) {
    roster
        .iter()
        .cloned()
        .partition(|s| present_ids.contains(&s.id))
}

/// Orchestrates marking sessions against a roster store
pub struct AttendanceReconciler {
    store: Arc<dyn RosterStore>,
    delegate: Arc<dyn RecognitionDelegate>,
    policy: DatePolicy,
    delegate_timeout: Duration,
}

impl AttendanceReconciler {
    pub fn new(
        store: Arc<dyn RosterStore>,
        delegate: Arc<dyn RecognitionDelegate>,
        policy: DatePolicy,
        delegate_timeout: Duration,
    ) -> Self {
        Self {
            store,
            delegate,
            policy,
            delegate_timeout,
        }
    }

    pub fn policy(&self) -> &DatePolicy {
        &self.policy
    }

    fn validate_date(&self, target_date: AttendanceDate) -> Result<(), ReconcileError> {
        self.policy
            .validate(target_date, AttendanceDate::today())
            .map_err(|e| ReconcileError::InvalidDate(e.to_string()))
    }

    /// Mark attendance from a classroom photo
    pub async fn mark_attendance(
        &self,
        class_id: Uuid,
        target_date: AttendanceDate,
        photo: &ImageData,
        roster: &[StudentRecord],
    ) -> Result<MarkOutcome, ReconcileError> {
        self.validate_date(target_date)?;

        // Step 1: only students with a usable reference photo can be matched
        let mut profiles = Vec::new();
        for student in roster.iter().filter(|s| s.has_reference_photo()) {
            let raw = student.profile_photo_url.as_deref().unwrap_or_default();
            match ImageData::parse(raw) {
                Ok(profile_photo) => profiles.push(StudentProfile {
                    roll_number: student.roll_number.clone(),
                    profile_photo,
                }),
                Err(e) => tracing::warn!(
                    class_id = %class_id,
                    student_id = %student.id,
                    error = %e,
                    "Skipping unreadable reference photo"
                ),
            }
        }

        if profiles.is_empty() {
            tracing::info!(
                class_id = %class_id,
                date = %target_date,
                roster_size = roster.len(),
                "No students with reference photos, skipping recognition"
            );
            return Ok(MarkOutcome::everyone_absent(class_id, target_date, roster));
        }

        let eligible: HashSet<String> = profiles.iter().map(|p| p.roll_number.clone()).collect();

        // Step 2: one delegate call, bounded by the timeout
        let request = RecognitionRequest {
            class_photo: photo.clone(),
            student_profiles: profiles,
        };
        let started = std::time::Instant::now();
        let response = match tokio::time::timeout(self.delegate_timeout, self.delegate.recognize(request)).await {
            Err(_) | Ok(Err(DelegateError::TimedOut)) => {
                tracing::warn!(
                    class_id = %class_id,
                    timeout_ms = self.delegate_timeout.as_millis() as u64,
                    "Recognition delegate timed out"
                );
                return Err(ReconcileError::DelegateTimedOut(self.delegate_timeout));
            }
            Ok(Err(DelegateError::Unavailable(msg))) => {
                tracing::warn!(class_id = %class_id, error = %msg, "Recognition delegate unavailable");
                return Err(ReconcileError::DelegateUnavailable(msg));
            }
            Ok(Err(DelegateError::Malformed(msg))) => {
                tracing::warn!(class_id = %class_id, error = %msg, "Malformed recognition output, treating as nobody present");
                Default::default()
            }
            Ok(Ok(response)) => response,
        };

        // Step 3: partition, ignoring unknown and photo-less roll numbers
        let recognized: BTreeSet<&str> = response
            .present_roll_numbers()
            .filter(|roll| eligible.contains(*roll))
            .collect();
        let ignored = response
            .present_roll_numbers()
            .filter(|roll| !eligible.contains(*roll))
            .count();

        let present_ids: HashSet<Uuid> = roster
            .iter()
            .filter(|s| recognized.contains(s.roll_number.as_str()))
            .map(|s| s.id)
            .collect();
        let (present, absent) = partition_roster(roster, &present_ids);

        let matches = response
            .present
            .iter()
            .filter(|m| recognized.contains(m.roll_number.as_str()))
            .cloned()
            .collect();

        tracing::info!(
            class_id = %class_id,
            date = %target_date,
            present = present.len(),
            absent = absent.len(),
            ignored,
            delegate_ms = started.elapsed().as_millis() as u64,
            "Recognition complete"
        );

        // Step 4: concurrent union-appends
        let (mutated_count, failures) = self.append_for(class_id, target_date, &present).await;

        Ok(MarkOutcome {
            class_id,
            target_date,
            present,
            absent,
            mutated_count,
            failures,
            recognition: Some(RecognitionDetails {
                total_faces_detected: response.total_faces_detected,
                matches,
            }),
        })
    }

    /// Mark a hand-picked set of students present
    ///
    /// Ids not on the roster are reported as [`WriteFailureKind::UnknownStudent`].
    pub async fn mark_manual(
        &self,
        class_id: Uuid,
        target_date: AttendanceDate,
        student_ids: &[Uuid],
        roster: &[StudentRecord],
    ) -> Result<MarkOutcome, ReconcileError> {
        self.validate_date(target_date)?;

        let roster_ids: HashSet<Uuid> = roster.iter().map(|s| s.id).collect();
        let selected: HashSet<Uuid> = student_ids.iter().copied().collect();

        let mut failures: Vec<WriteFailure> = selected
            .iter()
            .filter(|id| !roster_ids.contains(id))
            .map(|id| WriteFailure {
                student_id: *id,
                roll_number: None,
                kind: WriteFailureKind::UnknownStudent,
                reason: "student is not on this class roster".to_string(),
            })
            .collect();
        failures.sort_by_key(|f| f.student_id);

        let (present, absent) = partition_roster(roster, &selected);
        let (mutated_count, write_failures) = self.append_for(class_id, target_date, &present).await;
        failures.extend(write_failures);

        tracing::info!(
            class_id = %class_id,
            date = %target_date,
            present = present.len(),
            mutated_count,
            failures = failures.len(),
            "Manual attendance recorded"
        );

        Ok(MarkOutcome {
            class_id,
            target_date,
            present,
            absent,
            mutated_count,
            failures,
            recognition: None,
        })
    }

    /// Append `date` for every student lacking it; returns (added, failures)
    async fn append_for(
        &self,
        class_id: Uuid,
        date: AttendanceDate,
        students: &[StudentRecord],
    ) -> (usize, Vec<WriteFailure>) {
        let writes = students
            .iter()
            .filter(|s| !s.attended(&date))
            .map(|student| async move {
                let result = self
                    .store
                    .append_attendance_date(class_id, student.id, date)
                    .await;
                (student, result)
            });

        let mut mutated = 0;
        let mut failures = Vec::new();

        for (student, result) in join_all(writes).await {
            match result {
                Ok(AppendStatus::Added) => mutated += 1,
                Ok(AppendStatus::Unchanged) => {}
                Err(e) => {
                    tracing::warn!(
                        class_id = %class_id,
                        student_id = %student.id,
                        error = %e,
                        "Attendance write failed"
                    );
                    let kind = match &e {
                        StoreError::StudentNotFound(_) => WriteFailureKind::UnknownStudent,
                        _ => WriteFailureKind::Rejected,
                    };
                    failures.push(WriteFailure {
                        student_id: student.id,
                        roll_number: Some(student.roll_number.clone()),
                        kind,
                        reason: e.to_string(),
                    });
                }
            }
        }

        (mutated, failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(roll: &str) -> StudentRecord {
        StudentRecord {
            id: Uuid::new_v4(),
            class_id: Uuid::nil(),
            name: format!("Student {}", roll),
            roll_number: roll.to_string(),
            attendance_history: BTreeSet::new(),
            profile_photo_url: None,
            uid: None,
        }
    }

    #[test]
    fn test_partition_preserves_roster_order_and_is_complete() {
        let roster = vec![student("1"), student("2"), student("3"), student("4")];
        let present_ids: HashSet<Uuid> = [roster[3].id, roster[1].id].into_iter().collect();

        let (present, absent) = partition_roster(&roster, &present_ids);
        let present: Vec<_> = present.iter().map(|s| s.roll_number.as_str()).collect();
        let absent: Vec<_> = absent.iter().map(|s| s.roll_number.as_str()).collect();
        assert_eq!(present, vec!["2", "4"]);
        assert_eq!(absent, vec!["1", "3"]);
    }

    #[test]
    fn test_partition_ignores_ids_outside_roster() {
        let roster = vec![student("1")];
        let present_ids: HashSet<Uuid> = [Uuid::new_v4()].into_iter().collect();

        let (present, absent) = partition_roster(&roster, &present_ids);
        assert!(present.is_empty());
        assert_eq!(absent.len(), 1);
    }
}
