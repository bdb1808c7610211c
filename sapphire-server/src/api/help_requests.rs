//! Help request (support ticket) endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use sapphire_common::db::models::HelpRequest;
use serde::Deserialize;

use crate::api::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHelpRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub description: Option<String>,
    pub urgency: Option<String>,
    pub mood: Option<i64>,
    pub energy: Option<i64>,
    /// Client-side submission time, kept for mood/energy trend views
    pub timestamp: Option<DateTime<Utc>>,
    pub user_id: Option<i64>,
}

/// POST /api/help-requests
pub async fn create_help_request(
    State(state): State<AppState>,
    Json(req): Json<CreateHelpRequest>,
) -> Result<(StatusCode, Json<HelpRequest>), ApiError> {
    let (kind, description) = match (req.kind, req.description) {
        (Some(kind), Some(description)) if !kind.is_empty() && !description.is_empty() => {
            (kind, description)
        }
        _ => {
            return Err(ApiError::BadRequest(
                "type and description are required".to_string(),
            ))
        }
    };

    let created = sqlx::query_as::<_, HelpRequest>(
        r#"
        INSERT INTO help_requests
            (user_id, type, description, urgency, mood, energy, client_timestamp, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(req.user_id)
    .bind(&kind)
    .bind(&description)
    .bind(req.urgency.unwrap_or_else(|| "low".to_string()))
    .bind(req.mood)
    .bind(req.energy)
    .bind(req.timestamp)
    .bind(Utc::now())
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/help-requests - newest first (admin/dev listing)
pub async fn list_help_requests(
    State(state): State<AppState>,
) -> Result<Json<Vec<HelpRequest>>, ApiError> {
    let items =
        sqlx::query_as::<_, HelpRequest>("SELECT * FROM help_requests ORDER BY created_at DESC")
            .fetch_all(&state.db)
            .await?;

    Ok(Json(items))
}
