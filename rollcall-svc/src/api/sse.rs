//! Server-Sent Events (SSE) for live roster updates
//!
//! `GET /classes/:code/events` sends the class roster once on connect and
//! again after every enrollment, photo update or attendance write.

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use serde::Serialize;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{student_views, StudentView};
use crate::error::ApiResult;
use crate::store::RosterSubscription;
use crate::AppState;

/// SSE event name for roster snapshots
pub const ROSTER_EVENT: &str = "RosterSnapshot";

#[derive(Debug, Serialize)]
struct RosterSnapshot<'a> {
    class_id: Uuid,
    class_code: &'a str,
    students: Vec<StudentView>,
}

/// GET /classes/:code/events
pub async fn roster_event_stream(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let class = state.classes.find_class_by_code(&code).await?;
    let mut subscription = RosterSubscription::open(state.store.clone(), class.id).await?;

    info!(class_code = %class.class_code, "New SSE client connected to roster events");

    let stream = async_stream::stream! {
        while let Some(snapshot) = subscription.next().await {
            match snapshot {
                Ok(roster) => {
                    let payload = RosterSnapshot {
                        class_id: class.id,
                        class_code: &class.class_code,
                        students: student_views(&roster),
                    };
                    match serde_json::to_string(&payload) {
                        Ok(json) => {
                            debug!(class_code = %class.class_code, students = roster.len(), "SSE: Sending roster snapshot");
                            yield Ok(Event::default().event(ROSTER_EVENT).data(json));
                        }
                        Err(e) => warn!("SSE: Failed to serialize roster snapshot: {}", e),
                    }
                }
                Err(e) => warn!(class_code = %class.class_code, error = %e, "SSE: Failed to re-read roster"),
            }
        }

        subscription.unsubscribe();
        info!(class_code = %class.class_code, "SSE: Roster stream ended");
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    ))
}

/// Build SSE routes
pub fn event_routes() -> Router<AppState> {
    Router::new().route("/classes/:code/events", get(roster_event_stream))
}
