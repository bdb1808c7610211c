//! Task CRUD and kanban reorder endpoints

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use sapphire_common::db::models::Task;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{QueryBuilder, Sqlite};
use tracing::info;

use crate::api::{double_option, ApiError, Identity};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub status: Option<String>,
    pub order_index: Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    pub category: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    #[serde(default)]
    pub updates: Vec<ReorderUpdate>,
}

/// One `(id, status, orderIndex)` triple of a batch reorder
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderUpdate {
    pub id: i64,
    pub status: String,
    pub order_index: i64,
}

#[derive(Debug, Serialize)]
pub struct ReorderResponse {
    pub ok: bool,
    pub count: usize,
}

/// GET /tasks
///
/// Lists tasks ordered by status, then column position, then newest first.
/// Scoped to the header user when one is present.
pub async fn list_tasks(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = match identity.resolve_user(&state.db).await? {
        Some(user) => {
            sqlx::query_as::<_, Task>(
                "SELECT * FROM tasks WHERE user_id = ? \
                 ORDER BY status ASC, order_index ASC, created_at DESC",
            )
            .bind(user.id)
            .fetch_all(&state.db)
            .await?
        }
        None => {
            sqlx::query_as::<_, Task>(
                "SELECT * FROM tasks ORDER BY status ASC, order_index ASC, created_at DESC",
            )
            .fetch_all(&state.db)
            .await?
        }
    };

    Ok(Json(tasks))
}

/// POST /tasks
///
/// Creates a task at the bottom of its column: order_index is one past the
/// current maximum for that status (per user when resolvable).
pub async fn create_task(
    State(state): State<AppState>,
    identity: Identity,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let title = match req.title.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => return Err(ApiError::BadRequest("title is required".to_string())),
    };

    let user_id = identity.resolve_user(&state.db).await?.map(|u| u.id);
    let column = req.status.unwrap_or_else(|| "pending".to_string());

    let next_order: i64 = match user_id {
        Some(uid) => {
            sqlx::query_scalar(
                "SELECT COALESCE(MAX(order_index), -1) + 1 FROM tasks WHERE status = ? AND user_id = ?",
            )
            .bind(&column)
            .bind(uid)
            .fetch_one(&state.db)
            .await?
        }
        None => {
            sqlx::query_scalar("SELECT COALESCE(MAX(order_index), -1) + 1 FROM tasks WHERE status = ?")
                .bind(&column)
                .fetch_one(&state.db)
                .await?
        }
    };

    let now = Utc::now();
    let task = sqlx::query_as::<_, Task>(
        r#"
        INSERT INTO tasks
            (user_id, title, description, priority, due_date, status, order_index, category, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(&title)
    .bind(&req.description)
    .bind(req.priority.unwrap_or_else(|| "medium".to_string()))
    .bind(req.due_date)
    .bind(&column)
    .bind(next_order)
    .bind(&req.category)
    .bind(now)
    .bind(now)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(task)))
}

/// PUT /tasks/:id
///
/// Partial update: absent fields are untouched, explicit nulls clear
/// nullable columns.
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE tasks SET updated_at = ");
    qb.push_bind(Utc::now());

    if let Some(title) = req.title {
        qb.push(", title = ").push_bind(title);
    }
    if let Some(description) = req.description {
        qb.push(", description = ").push_bind(description);
    }
    if let Some(priority) = req.priority {
        qb.push(", priority = ").push_bind(priority);
    }
    if let Some(due_date) = req.due_date {
        qb.push(", due_date = ").push_bind(due_date);
    }
    if let Some(status) = req.status {
        qb.push(", status = ").push_bind(status);
    }
    if let Some(order_index) = req.order_index {
        qb.push(", order_index = ").push_bind(order_index);
    }
    if let Some(category) = req.category {
        qb.push(", category = ").push_bind(category);
    }

    qb.push(" WHERE id = ").push_bind(id);
    let result = qb.build().execute(&state.db).await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!("task {}", id)));
    }

    let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ?")
        .bind(id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(task))
}

/// DELETE /tasks/:id
///
/// Subtasks and deadlines cascade via the schema.
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!("task {}", id)));
    }

    Ok(Json(json!({ "ok": true })))
}

/// PATCH /tasks/reorder
///
/// Applies all `(id, status, orderIndex)` triples inside one transaction.
/// Any unknown id aborts the whole batch.
pub async fn reorder_tasks(
    State(state): State<AppState>,
    Json(req): Json<ReorderRequest>,
) -> Result<Json<ReorderResponse>, ApiError> {
    if req.updates.is_empty() {
        return Err(ApiError::BadRequest("updates array required".to_string()));
    }

    let now = Utc::now();
    let mut tx = state.db.begin().await?;

    for update in &req.updates {
        let result = sqlx::query(
            "UPDATE tasks SET status = ?, order_index = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&update.status)
        .bind(update.order_index)
        .bind(now)
        .bind(update.id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // Dropping the transaction rolls back the updates applied so far
            return Err(ApiError::NotFound(format!("task {}", update.id)));
        }
    }

    tx.commit().await?;

    info!("Reordered {} tasks", req.updates.len());
    Ok(Json(ReorderResponse {
        ok: true,
        count: req.updates.len(),
    }))
}
