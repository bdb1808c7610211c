//! Tests for database initialization and migrations

use chrono::Utc;
use sapphire_common::db::init_database;

#[tokio::test]
async fn init_creates_database_and_schema() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sapphire.db");

    let pool = init_database(&db_path).await.unwrap();
    assert!(db_path.exists());

    // All tables present
    for table in [
        "users",
        "tasks",
        "subtasks",
        "deadlines",
        "deadline_reminders",
        "meetings",
        "action_items",
        "help_requests",
        "schema_version",
    ] {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?)",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(exists, "table {} should exist", table);
    }

    let version: i32 =
        sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(version, 2);
}

#[tokio::test]
async fn init_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sapphire.db");

    let pool = init_database(&db_path).await.unwrap();
    sqlx::query("INSERT INTO users (email, password_hash, role, created_at) VALUES ('keep@example.com', '', 'student', ?)")
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    // Re-open: schema creation and migrations run again without damage
    let pool = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn deleting_a_task_cascades_to_children() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("sapphire.db")).await.unwrap();

    let now = Utc::now();
    sqlx::query(
        "INSERT INTO tasks (title, priority, status, order_index, created_at, updated_at) \
         VALUES ('parent', 'medium', 'pending', 0, ?, ?)",
    )
    .bind(now)
    .bind(now)
    .execute(&pool)
    .await
    .unwrap();
    let task_id: i64 = sqlx::query_scalar("SELECT id FROM tasks")
        .fetch_one(&pool)
        .await
        .unwrap();

    sqlx::query("INSERT INTO subtasks (task_id, title, done, order_index, created_at) VALUES (?, 'child', 0, 0, ?)")
        .bind(task_id)
        .bind(now)
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO deadlines (task_id, due_at, created_at) VALUES (?, ?, ?)")
        .bind(task_id)
        .bind(now)
        .bind(now)
        .execute(&pool)
        .await
        .unwrap();
    let deadline_id: i64 = sqlx::query_scalar("SELECT id FROM deadlines")
        .fetch_one(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO deadline_reminders (deadline_id, offset_minutes) VALUES (?, 30)")
        .bind(deadline_id)
        .execute(&pool)
        .await
        .unwrap();

    sqlx::query("DELETE FROM tasks WHERE id = ?")
        .bind(task_id)
        .execute(&pool)
        .await
        .unwrap();

    for table in ["subtasks", "deadlines", "deadline_reminders"] {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0, "{} rows should cascade", table);
    }
}
