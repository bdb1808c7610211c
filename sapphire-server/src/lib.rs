//! sapphire-server library - Sapphire Platform backend
//!
//! REST API over SQLite for task/kanban management, deadline reminders,
//! help requests, and meeting transcription. The router is built here so
//! integration tests can drive it directly without binding a socket.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, patch, post, put};
use axum::Router;
use sapphire_common::config::Config;
use sapphire_common::Result;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::services::transcription::Transcriber;

pub mod api;
pub mod jobs;
pub mod services;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    pub config: Arc<Config>,
    /// Transcription backend (mock or live, resolved at startup)
    pub transcriber: Arc<Transcriber>,
    /// Where uploaded recordings are persisted (served under /uploads)
    pub uploads_dir: PathBuf,
}

impl AppState {
    pub fn new(db: SqlitePool, config: Arc<Config>, uploads_dir: PathBuf) -> Result<Self> {
        let transcriber = Arc::new(Transcriber::from_config(&config.ai)?);
        Ok(Self {
            db,
            config,
            transcriber,
            uploads_dir,
        })
    }
}

/// Build application router
///
/// Paths mirror the surface the SPA was built against: task and deadline
/// routes at the root, meetings and help requests under /api.
pub fn build_router(state: AppState) -> Router {
    let max_upload = state.config.max_upload_bytes();

    Router::new()
        .route("/api/health", get(api::health::health_check))
        .route(
            "/tasks",
            get(api::tasks::list_tasks).post(api::tasks::create_task),
        )
        .route("/tasks/reorder", patch(api::tasks::reorder_tasks))
        .route(
            "/tasks/:id",
            put(api::tasks::update_task).delete(api::tasks::delete_task),
        )
        .route(
            "/tasks/:id/subtasks",
            get(api::subtasks::list_subtasks).post(api::subtasks::create_subtask),
        )
        .route(
            "/subtasks/:id",
            put(api::subtasks::update_subtask).delete(api::subtasks::delete_subtask),
        )
        .route("/deadlines/upcoming", get(api::deadlines::upcoming_deadlines))
        .route("/deadlines", post(api::deadlines::create_deadline))
        .route(
            "/api/help-requests",
            get(api::help_requests::list_help_requests)
                .post(api::help_requests::create_help_request),
        )
        .route("/api/meetings", get(api::meetings::list_meetings))
        .route("/api/meetings/search", get(api::meetings::search_meetings))
        .route("/api/meetings/:id", get(api::meetings::get_meeting))
        .route(
            "/api/meetings/upload",
            post(api::meetings::upload_meeting).layer(DefaultBodyLimit::max(max_upload)),
        )
        .nest_service("/uploads", ServeDir::new(&state.uploads_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
