//! # Rollcall Service Library
//!
//! Classroom attendance over HTTP: classes and enrollment, manual and
//! photo-based attendance marking, CSV export, attendance summaries and
//! live roster updates via SSE.
//!
//! Face matching, face counting and summaries are delegated to an external
//! generative model (see [`delegate`]).

pub mod api;
pub mod config;
pub mod db;
pub mod delegate;
pub mod error;
pub mod services;
pub mod store;
pub mod utils;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use rollcall_common::dates::DatePolicy;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::delegate::{FaceCountDelegate, RecognitionDelegate, SummaryDelegate};
use crate::services::{AttendanceReconciler, ClassService, SummaryRequester};
use crate::store::RosterStore;

/// Request body cap; classroom photos arrive inline as data URIs
pub const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RosterStore>,
    pub classes: Arc<ClassService>,
    pub reconciler: Arc<AttendanceReconciler>,
    pub summaries: Arc<SummaryRequester>,
    pub face_counter: Arc<dyn FaceCountDelegate>,
    /// Bound applied to face counting (recognition and summaries carry their own)
    pub delegate_timeout: Duration,
    /// Service startup timestamp for uptime calculation
    pub startup_time: DateTime<Utc>,
    /// Last server-side error, shown on /health
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    /// Wire services around one store and one delegate implementation
    pub fn new<D>(
        store: Arc<dyn RosterStore>,
        delegate: Arc<D>,
        policy: DatePolicy,
        delegate_timeout: Duration,
    ) -> Self
    where
        D: RecognitionDelegate + SummaryDelegate + FaceCountDelegate + 'static,
    {
        Self {
            classes: Arc::new(ClassService::new(store.clone())),
            reconciler: Arc::new(AttendanceReconciler::new(
                store.clone(),
                delegate.clone(),
                policy,
                delegate_timeout,
            )),
            summaries: Arc::new(SummaryRequester::new(delegate.clone(), delegate_timeout)),
            face_counter: delegate,
            store,
            delegate_timeout,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Remember a server-side failure for diagnostics
    pub async fn record_error(&self, err: &ApiError) {
        if err.is_server_side() {
            *self.last_error.write().await = Some(err.to_string());
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::class_routes())
        .merge(api::student_routes())
        .merge(api::attendance_routes())
        .merge(api::report_routes())
        .merge(api::event_routes())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
