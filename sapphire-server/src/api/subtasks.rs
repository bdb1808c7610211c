//! Subtask (checklist item) endpoints

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use sapphire_common::db::models::Subtask;
use serde::Deserialize;
use serde_json::json;
use sqlx::{QueryBuilder, Sqlite};

use crate::api::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSubtaskRequest {
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubtaskRequest {
    pub title: Option<String>,
    pub done: Option<bool>,
    pub order_index: Option<i64>,
}

/// GET /tasks/:id/subtasks
pub async fn list_subtasks(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
) -> Result<Json<Vec<Subtask>>, ApiError> {
    let subtasks = sqlx::query_as::<_, Subtask>(
        "SELECT * FROM subtasks WHERE task_id = ? ORDER BY order_index ASC",
    )
    .bind(task_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(subtasks))
}

/// POST /tasks/:id/subtasks
///
/// Appends the subtask at the end of the task's checklist.
pub async fn create_subtask(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
    Json(req): Json<CreateSubtaskRequest>,
) -> Result<(StatusCode, Json<Subtask>), ApiError> {
    let title = match req.title.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => return Err(ApiError::BadRequest("title required".to_string())),
    };

    let task_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tasks WHERE id = ?)")
        .bind(task_id)
        .fetch_one(&state.db)
        .await?;
    if !task_exists {
        return Err(ApiError::NotFound(format!("task {}", task_id)));
    }

    let next_order: i64 =
        sqlx::query_scalar("SELECT COALESCE(MAX(order_index), -1) + 1 FROM subtasks WHERE task_id = ?")
            .bind(task_id)
            .fetch_one(&state.db)
            .await?;

    let subtask = sqlx::query_as::<_, Subtask>(
        r#"
        INSERT INTO subtasks (task_id, title, done, order_index, created_at)
        VALUES (?, ?, 0, ?, ?)
        RETURNING *
        "#,
    )
    .bind(task_id)
    .bind(&title)
    .bind(next_order)
    .bind(Utc::now())
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(subtask)))
}

/// PUT /subtasks/:id - partial update (title, done, orderIndex)
pub async fn update_subtask(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateSubtaskRequest>,
) -> Result<Json<Subtask>, ApiError> {
    let has_changes = req.title.is_some() || req.done.is_some() || req.order_index.is_some();

    if has_changes {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE subtasks SET ");
        let mut separated = qb.separated(", ");
        if let Some(title) = &req.title {
            separated.push("title = ").push_bind_unseparated(title);
        }
        if let Some(done) = req.done {
            separated.push("done = ").push_bind_unseparated(done);
        }
        if let Some(order_index) = req.order_index {
            separated
                .push("order_index = ")
                .push_bind_unseparated(order_index);
        }
        qb.push(" WHERE id = ").push_bind(id);

        let result = qb.build().execute(&state.db).await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound(format!("subtask {}", id)));
        }
    }

    let subtask = sqlx::query_as::<_, Subtask>("SELECT * FROM subtasks WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("subtask {}", id)))?;

    Ok(Json(subtask))
}

/// DELETE /subtasks/:id
pub async fn delete_subtask(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let result = sqlx::query("DELETE FROM subtasks WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!("subtask {}", id)));
    }

    Ok(Json(json!({ "ok": true })))
}
