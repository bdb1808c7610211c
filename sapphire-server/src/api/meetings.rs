//! Meeting endpoints: recording upload + transcription, listing, search
//!
//! Upload accepts a multipart `audio` field, persists the file under the
//! uploads folder (served at /uploads), runs it through the transcription
//! backend, and stores the meeting with its extracted action items.

use axum::extract::{Multipart, Path as UrlPath, Query, State};
use axum::Json;
use chrono::Utc;
use sapphire_common::db::models::{ActionItem, Meeting};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::{ApiError, Identity};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingWithActionItems {
    #[serde(flatten)]
    pub meeting: Meeting,
    pub action_items: Vec<ActionItem>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub meeting: MeetingWithActionItems,
    pub mock: bool,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// POST /api/meetings/upload
///
/// Requires a known user: unlike tasks, upload does not auto-provision
/// accounts for unrecognized emails.
pub async fn upload_meeting(
    State(state): State<AppState>,
    identity: Identity,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    if identity.email.is_none() {
        return Err(ApiError::BadRequest(
            "Missing x-user-email header".to_string(),
        ));
    }

    let user = identity.find_user(&state.db).await?.ok_or_else(|| {
        ApiError::BadRequest(
            "Unknown user. Please ensure you are logged in and an email is set.".to_string(),
        )
    })?;

    let mut audio: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some("audio") {
            let original_name = field
                .file_name()
                .filter(|n| !n.is_empty())
                .unwrap_or("recording")
                .to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
            audio = Some((original_name, data.to_vec()));
            break;
        }
    }

    let (original_name, data) = audio.ok_or_else(|| {
        ApiError::BadRequest("No file uploaded (field 'audio')".to_string())
    })?;

    // Persist under a random name; the original name is only kept as title
    let stored_name = match Path::new(&original_name).extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
        None => Uuid::new_v4().to_string(),
    };
    tokio::fs::write(state.uploads_dir.join(&stored_name), &data)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to store upload: {}", e)))?;

    let title = Path::new(&original_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(&original_name)
        .to_string();

    let insights = match state.transcriber.generate(&data, &original_name).await {
        Ok(insights) => insights,
        Err(e) => {
            // Don't leave an orphaned recording behind when no meeting row
            // will reference it
            let stored_path = state.uploads_dir.join(&stored_name);
            if let Err(rm) = tokio::fs::remove_file(&stored_path).await {
                warn!(
                    "Failed to remove upload {} after transcription error: {}",
                    stored_path.display(),
                    rm
                );
            }
            return Err(ApiError::Upstream(format!("Transcription failed: {}", e)));
        }
    };

    // Meeting and its action items land together or not at all
    let mut tx = state.db.begin().await?;

    let meeting = sqlx::query_as::<_, Meeting>(
        r#"
        INSERT INTO meetings (user_id, title, recording_url, transcript, summary, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(user.id)
    .bind(&title)
    .bind(format!("/uploads/{}", stored_name))
    .bind(&insights.transcript)
    .bind(&insights.summary)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await?;

    for text in &insights.action_items {
        sqlx::query(
            "INSERT INTO action_items (meeting_id, text, status, created_at) VALUES (?, ?, 'pending', ?)",
        )
        .bind(meeting.id)
        .bind(text)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    info!(
        "Processed meeting upload '{}' ({} bytes, mock={})",
        original_name,
        data.len(),
        state.transcriber.is_mock()
    );

    let meeting = with_action_items(&state.db, meeting).await?;
    Ok(Json(UploadResponse {
        success: true,
        meeting,
        mock: state.transcriber.is_mock(),
    }))
}

/// GET /api/meetings - newest first
pub async fn list_meetings(
    State(state): State<AppState>,
) -> Result<Json<Vec<MeetingWithActionItems>>, ApiError> {
    let meetings = sqlx::query_as::<_, Meeting>("SELECT * FROM meetings ORDER BY created_at DESC")
        .fetch_all(&state.db)
        .await?;

    let mut shaped = Vec::with_capacity(meetings.len());
    for meeting in meetings {
        shaped.push(with_action_items(&state.db, meeting).await?);
    }
    Ok(Json(shaped))
}

/// GET /api/meetings/:id
pub async fn get_meeting(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<i64>,
) -> Result<Json<MeetingWithActionItems>, ApiError> {
    let meeting = sqlx::query_as::<_, Meeting>("SELECT * FROM meetings WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("meeting {}", id)))?;

    Ok(Json(with_action_items(&state.db, meeting).await?))
}

/// GET /api/meetings/search?q= - substring match over title/transcript/summary
pub async fn search_meetings(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<MeetingWithActionItems>>, ApiError> {
    let q = match query.q.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => q.to_string(),
        _ => return Err(ApiError::BadRequest("Missing search query".to_string())),
    };

    let pattern = format!("%{}%", q);
    let meetings = sqlx::query_as::<_, Meeting>(
        r#"
        SELECT * FROM meetings
        WHERE title LIKE ? OR transcript LIKE ? OR summary LIKE ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(&pattern)
    .bind(&pattern)
    .bind(&pattern)
    .fetch_all(&state.db)
    .await?;

    let mut shaped = Vec::with_capacity(meetings.len());
    for meeting in meetings {
        shaped.push(with_action_items(&state.db, meeting).await?);
    }
    Ok(Json(shaped))
}

async fn with_action_items(
    db: &SqlitePool,
    meeting: Meeting,
) -> Result<MeetingWithActionItems, sqlx::Error> {
    let action_items = sqlx::query_as::<_, ActionItem>(
        "SELECT * FROM action_items WHERE meeting_id = ? ORDER BY id ASC",
    )
    .bind(meeting.id)
    .fetch_all(db)
    .await?;

    Ok(MeetingWithActionItems {
        meeting,
        action_items,
    })
}
