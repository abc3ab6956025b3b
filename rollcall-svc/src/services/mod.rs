//! Business logic services

pub mod enrollment;
pub mod export;
pub mod reconciler;
pub mod summary;

pub use enrollment::{ClassService, EnrollmentError};
pub use reconciler::{AttendanceReconciler, MarkOutcome, ReconcileError, WriteFailure, WriteFailureKind};
pub use summary::{SummaryError, SummaryRequester};
