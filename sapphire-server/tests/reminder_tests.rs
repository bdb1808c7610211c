//! Tests for the deadline reminder sweep
//!
//! The sweep is driven directly (no interval timer) against an in-memory
//! database with the stub mailer.

use chrono::{DateTime, Duration, Utc};
use sapphire_common::config::ReminderConfig;
use sapphire_common::db::{create_schema, run_migrations};
use sapphire_server::jobs::reminders::run_reminder_sweep;
use sapphire_server::services::mailer::Mailer;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Should open in-memory database");

    create_schema(&pool).await.expect("Should create schema");
    run_migrations(&pool).await.expect("Should run migrations");
    pool
}

async fn seed_user_and_task(pool: &SqlitePool) -> i64 {
    sqlx::query("INSERT INTO users (email, password_hash, role, created_at) VALUES ('owner@example.com', '', 'student', ?)")
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();
    let user_id: i64 = sqlx::query_scalar("SELECT id FROM users WHERE email = 'owner@example.com'")
        .fetch_one(pool)
        .await
        .unwrap();

    sqlx::query(
        "INSERT INTO tasks (user_id, title, priority, status, order_index, created_at, updated_at) \
         VALUES (?, 'thesis', 'medium', 'pending', 0, ?, ?)",
    )
    .bind(user_id)
    .bind(Utc::now())
    .bind(Utc::now())
    .execute(pool)
    .await
    .unwrap();

    sqlx::query_scalar("SELECT id FROM tasks WHERE title = 'thesis'")
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn seed_deadline(
    pool: &SqlitePool,
    task_id: i64,
    due_at: DateTime<Utc>,
    offset_minutes: i64,
) -> i64 {
    sqlx::query(
        "INSERT INTO deadlines (task_id, title, due_at, created_at) VALUES (?, 'handin', ?, ?)",
    )
    .bind(task_id)
    .bind(due_at)
    .bind(Utc::now())
    .execute(pool)
    .await
    .unwrap();
    let deadline_id: i64 = sqlx::query_scalar("SELECT MAX(id) FROM deadlines")
        .fetch_one(pool)
        .await
        .unwrap();

    sqlx::query("INSERT INTO deadline_reminders (deadline_id, offset_minutes) VALUES (?, ?)")
        .bind(deadline_id)
        .bind(offset_minutes)
        .execute(pool)
        .await
        .unwrap();
    deadline_id
}

#[tokio::test]
async fn test_due_reminder_is_sent_and_marked() {
    let pool = setup_test_db().await;
    let task_id = seed_user_and_task(&pool).await;

    // Due within the grace window, offset already elapsed
    seed_deadline(&pool, task_id, Utc::now() + Duration::seconds(30), 5).await;

    let sent = run_reminder_sweep(&pool, &ReminderConfig::default(), &Mailer::Stub)
        .await
        .unwrap();
    assert_eq!(sent, 1);

    let unsent: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM deadline_reminders WHERE sent_at IS NULL")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(unsent, 0);
}

#[tokio::test]
async fn test_sent_reminder_is_not_resent() {
    let pool = setup_test_db().await;
    let task_id = seed_user_and_task(&pool).await;
    seed_deadline(&pool, task_id, Utc::now() + Duration::seconds(30), 5).await;

    let config = ReminderConfig::default();
    let first = run_reminder_sweep(&pool, &config, &Mailer::Stub).await.unwrap();
    let second = run_reminder_sweep(&pool, &config, &Mailer::Stub).await.unwrap();
    assert_eq!(first, 1);
    assert_eq!(second, 0);
}

#[tokio::test]
async fn test_reminder_outside_trigger_window_is_skipped() {
    let pool = setup_test_db().await;
    let task_id = seed_user_and_task(&pool).await;

    // Inside the grace window but the trigger time is still in the future
    seed_deadline(&pool, task_id, Utc::now() + Duration::seconds(45), 0).await;
    // Deadline well beyond the grace window
    seed_deadline(&pool, task_id, Utc::now() + Duration::hours(6), 60).await;

    let sent = run_reminder_sweep(&pool, &ReminderConfig::default(), &Mailer::Stub)
        .await
        .unwrap();
    assert_eq!(sent, 0);

    let unsent: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM deadline_reminders WHERE sent_at IS NULL")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(unsent, 2);
}

#[tokio::test]
async fn test_out_of_range_offset_is_skipped_not_fatal() {
    let pool = setup_test_db().await;
    let task_id = seed_user_and_task(&pool).await;

    // A stored offset too large to represent as a duration must not abort
    // the sweep; the remaining due reminder still goes out
    seed_deadline(&pool, task_id, Utc::now() + Duration::seconds(30), i64::MAX).await;
    seed_deadline(&pool, task_id, Utc::now() + Duration::seconds(30), 5).await;

    let sent = run_reminder_sweep(&pool, &ReminderConfig::default(), &Mailer::Stub)
        .await
        .unwrap();
    assert_eq!(sent, 1);

    let unsent: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM deadline_reminders WHERE sent_at IS NULL")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(unsent, 1);
}

#[tokio::test]
async fn test_overdue_deadline_still_notifies() {
    let pool = setup_test_db().await;
    let task_id = seed_user_and_task(&pool).await;

    // Already past due: trigger time has long passed
    seed_deadline(&pool, task_id, Utc::now() - Duration::minutes(10), 30).await;

    let sent = run_reminder_sweep(&pool, &ReminderConfig::default(), &Mailer::Stub)
        .await
        .unwrap();
    assert_eq!(sent, 1);
}
