//! Event types for the Rollcall event system
//!
//! Every roster mutation emits a [`RollcallEvent`] on the [`EventBus`].
//! Roster subscriptions and SSE streams listen here to know when a class's
//! roster needs to be re-read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dates::AttendanceDate;

/// Rollcall event types
///
/// Events are broadcast via EventBus and can be serialized for SSE transmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RollcallEvent {
    /// A class was created
    ClassCreated {
        class_id: Uuid,
        class_code: String,
        faculty_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A student joined a class
    StudentEnrolled {
        class_id: Uuid,
        student_id: Uuid,
        roll_number: String,
        timestamp: DateTime<Utc>,
    },

    /// A student's reference photo was replaced
    ProfilePhotoUpdated {
        class_id: Uuid,
        student_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// A date was union-appended to a student's history.
    ///
    /// Emitted only when the write actually added the date.
    AttendanceMarked {
        class_id: Uuid,
        student_id: Uuid,
        date: AttendanceDate,
        timestamp: DateTime<Utc>,
    },
}

impl RollcallEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            RollcallEvent::ClassCreated { .. } => "ClassCreated",
            RollcallEvent::StudentEnrolled { .. } => "StudentEnrolled",
            RollcallEvent::ProfilePhotoUpdated { .. } => "ProfilePhotoUpdated",
            RollcallEvent::AttendanceMarked { .. } => "AttendanceMarked",
        }
    }

    /// The class whose state changed
    pub fn class_id(&self) -> Uuid {
        match self {
            RollcallEvent::ClassCreated { class_id, .. }
            | RollcallEvent::StudentEnrolled { class_id, .. }
            | RollcallEvent::ProfilePhotoUpdated { class_id, .. }
            | RollcallEvent::AttendanceMarked { class_id, .. } => *class_id,
        }
    }

    /// Whether the event changes the student roster of its class
    pub fn changes_roster(&self) -> bool {
        !matches!(self, RollcallEvent::ClassCreated { .. })
    }
}

/// Central event distribution bus
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block writers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RollcallEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<RollcallEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: RollcallEvent,
    ) -> Result<usize, broadcast::error::SendError<RollcallEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: RollcallEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::trace!(event = e.0.event_type(), "No subscribers for event");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
