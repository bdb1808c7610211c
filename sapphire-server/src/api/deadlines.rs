//! Deadline endpoints: upcoming list and creation with reminder offsets

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use sapphire_common::db::models::{Deadline, DeadlineReminder, Task};
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, Identity, Role};
use crate::AppState;

/// Upper bound on reminder offsets (one year in minutes). Anything larger
/// could not be scheduled meaningfully and would overflow the sweep's
/// trigger-time arithmetic.
const MAX_REMINDER_OFFSET_MINUTES: i64 = 525_600;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeadlineRequest {
    pub task_id: Option<i64>,
    pub title: Option<String>,
    pub due_at: Option<DateTime<Utc>>,
    /// Reminder offsets in minutes before due_at
    #[serde(default)]
    pub reminders: Vec<i64>,
    pub recipient_email: Option<String>,
    pub recipient_user_id: Option<i64>,
}

/// Upcoming deadline with its task title joined in.
///
/// `task_title` stays snake_case; the dashboard consumes it under that key.
#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingDeadline {
    pub id: i64,
    pub task_id: i64,
    #[serde(rename = "task_title")]
    pub task_title: String,
    pub title: Option<String>,
    pub due_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadlineWithReminders {
    #[serde(flatten)]
    pub deadline: Deadline,
    pub reminders: Vec<DeadlineReminder>,
}

/// GET /deadlines/upcoming
///
/// Deadlines due from the start of today (UTC) onwards, soonest first,
/// scoped to the header user's tasks when one is present.
pub async fn upcoming_deadlines(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<UpcomingDeadline>>, ApiError> {
    let start_of_today = Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time")
        .and_utc();

    let items = match identity.resolve_user(&state.db).await? {
        Some(user) => {
            sqlx::query_as::<_, UpcomingDeadline>(
                r#"
                SELECT d.id, d.task_id, t.title AS task_title, d.title, d.due_at
                FROM deadlines d
                JOIN tasks t ON t.id = d.task_id
                WHERE d.due_at >= ? AND t.user_id = ?
                ORDER BY d.due_at ASC
                "#,
            )
            .bind(start_of_today)
            .bind(user.id)
            .fetch_all(&state.db)
            .await?
        }
        None => {
            sqlx::query_as::<_, UpcomingDeadline>(
                r#"
                SELECT d.id, d.task_id, t.title AS task_title, d.title, d.due_at
                FROM deadlines d
                JOIN tasks t ON t.id = d.task_id
                WHERE d.due_at >= ?
                ORDER BY d.due_at ASC
                "#,
            )
            .bind(start_of_today)
            .fetch_all(&state.db)
            .await?
        }
    };

    Ok(Json(items))
}

/// POST /deadlines
///
/// Creates a deadline for a task with optional reminder offsets. When the
/// header email maps to a known user, the task must belong to them.
/// Students may only address reminders to themselves.
pub async fn create_deadline(
    State(state): State<AppState>,
    identity: Identity,
    Json(req): Json<CreateDeadlineRequest>,
) -> Result<(StatusCode, Json<DeadlineWithReminders>), ApiError> {
    let (task_id, due_at) = match (req.task_id, req.due_at) {
        (Some(task_id), Some(due_at)) => (task_id, due_at),
        _ => {
            return Err(ApiError::BadRequest(
                "taskId and dueAt are required".to_string(),
            ))
        }
    };

    if let Some(offset) = req
        .reminders
        .iter()
        .find(|o| !(0..=MAX_REMINDER_OFFSET_MINUTES).contains(*o))
    {
        return Err(ApiError::BadRequest(format!(
            "reminder offset {} is out of range (0-{} minutes)",
            offset, MAX_REMINDER_OFFSET_MINUTES
        )));
    }

    // Ownership check applies only when the caller maps to a known user
    if let Some(user) = identity.find_user(&state.db).await? {
        let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ?")
            .bind(task_id)
            .fetch_optional(&state.db)
            .await?;
        match task {
            Some(t) if t.user_id == Some(user.id) => {}
            _ => {
                return Err(ApiError::Forbidden(
                    "Task does not belong to current user".to_string(),
                ))
            }
        }
    }

    let mut recipient_email = req.recipient_email;
    let mut recipient_user_id = req.recipient_user_id;

    if identity.role == Role::Student {
        // Students can only set the recipient to themselves (blank
        // defaults to them)
        if let (Some(requested), Some(own)) = (recipient_email.as_deref(), identity.email.as_deref())
        {
            if !requested.eq_ignore_ascii_case(own) {
                return Err(ApiError::Forbidden(
                    "Students can only set reminders for themselves.".to_string(),
                ));
            }
        }
        recipient_email = identity.email.clone().or(recipient_email);
        recipient_user_id = None;
    }

    // Deadline and its reminder rows land together or not at all
    let mut tx = state.db.begin().await?;

    let deadline = sqlx::query_as::<_, Deadline>(
        r#"
        INSERT INTO deadlines (task_id, title, due_at, recipient_email, recipient_user_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(task_id)
    .bind(&req.title)
    .bind(due_at)
    .bind(&recipient_email)
    .bind(recipient_user_id)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await?;

    for offset in &req.reminders {
        sqlx::query("INSERT INTO deadline_reminders (deadline_id, offset_minutes) VALUES (?, ?)")
            .bind(deadline.id)
            .bind(offset)
            .execute(&mut *tx)
            .await?;
    }

    let reminders = sqlx::query_as::<_, DeadlineReminder>(
        "SELECT * FROM deadline_reminders WHERE deadline_id = ? ORDER BY offset_minutes ASC",
    )
    .bind(deadline.id)
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(DeadlineWithReminders {
            deadline,
            reminders,
        }),
    ))
}
