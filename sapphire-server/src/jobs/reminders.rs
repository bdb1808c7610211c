//! Deadline reminder job
//!
//! Fixed-interval sweep over unsent reminders. A reminder triggers once
//! `due_at - offset_minutes` has passed; after a successful send its
//! `sent_at` is stamped so it is never delivered twice. Send failures
//! leave `sent_at` NULL and the reminder is retried on the next sweep.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sapphire_common::config::ReminderConfig;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info, warn};

use crate::services::mailer::Mailer;

/// Start the background reminder task
pub fn start_reminder_job(db: SqlitePool, config: ReminderConfig, mailer: Arc<Mailer>) {
    tokio::spawn(reminder_task(db, config, mailer));
}

async fn reminder_task(db: SqlitePool, config: ReminderConfig, mailer: Arc<Mailer>) {
    let mut interval = time::interval(Duration::from_secs(config.poll_seconds.max(1)));

    info!("Reminder job started ({}s interval)", config.poll_seconds);

    loop {
        interval.tick().await;

        match run_reminder_sweep(&db, &config, &mailer).await {
            Ok(0) => {}
            Ok(sent) => info!("Reminder sweep sent {} notification(s)", sent),
            Err(e) => error!("Reminder sweep failed: {}", e),
        }
    }
}

/// One unsent reminder with the context needed to address and word the email
#[derive(Debug, sqlx::FromRow)]
struct DueReminder {
    id: i64,
    offset_minutes: i64,
    deadline_title: Option<String>,
    due_at: DateTime<Utc>,
    recipient_email: Option<String>,
    recipient_user_email: Option<String>,
    task_title: String,
    owner_email: Option<String>,
}

impl DueReminder {
    /// None when the stored offset cannot be represented as a duration;
    /// such rows are skipped instead of aborting the sweep
    fn trigger_at(&self) -> Option<DateTime<Utc>> {
        ChronoDuration::try_minutes(self.offset_minutes)
            .and_then(|offset| self.due_at.checked_sub_signed(offset))
    }

    /// Recipient resolution: explicit deadline recipient, then the
    /// recipient user's account email, then the task owner's
    fn recipient<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.recipient_email
            .as_deref()
            .or(self.recipient_user_email.as_deref())
            .or(self.owner_email.as_deref())
            .unwrap_or(fallback)
    }
}

/// Run a single sweep; returns the number of reminders sent
///
/// Exposed for tests, which drive it directly instead of waiting on the
/// interval timer.
pub async fn run_reminder_sweep(
    db: &SqlitePool,
    config: &ReminderConfig,
    mailer: &Mailer,
) -> sapphire_common::Result<usize> {
    let now = Utc::now();
    let horizon = now + ChronoDuration::seconds(config.grace_seconds);

    // Deadlines due inside the grace window; per-reminder trigger times are
    // evaluated below since they depend on each offset
    let candidates = sqlx::query_as::<_, DueReminder>(
        r#"
        SELECT
            r.id,
            r.offset_minutes,
            d.title AS deadline_title,
            d.due_at,
            d.recipient_email,
            ru.email AS recipient_user_email,
            t.title AS task_title,
            ou.email AS owner_email
        FROM deadline_reminders r
        JOIN deadlines d ON d.id = r.deadline_id
        JOIN tasks t ON t.id = d.task_id
        LEFT JOIN users ru ON ru.id = d.recipient_user_id
        LEFT JOIN users ou ON ou.id = t.user_id
        WHERE r.sent_at IS NULL AND d.due_at <= ?
        "#,
    )
    .bind(horizon)
    .fetch_all(db)
    .await?;

    let mut sent = 0;
    for reminder in candidates {
        let trigger_at = match reminder.trigger_at() {
            Some(trigger_at) => trigger_at,
            None => {
                warn!(
                    "Skipping reminder {}: offset {} minutes is out of range",
                    reminder.id, reminder.offset_minutes
                );
                continue;
            }
        };
        if trigger_at > now {
            continue;
        }

        let to = reminder.recipient(&config.fallback_recipient);
        let deadline_name = reminder
            .deadline_title
            .as_deref()
            .unwrap_or(&reminder.task_title);
        let subject = format!(
            "Reminder: {} at {}",
            deadline_name,
            reminder.due_at.to_rfc3339()
        );
        let body = format!(
            "Upcoming deadline for task \"{}\". Due at {} (reminder {} minutes prior).",
            reminder.task_title,
            reminder.due_at.to_rfc3339(),
            reminder.offset_minutes
        );

        match mailer.send(to, &subject, &body).await {
            Ok(()) => {
                sqlx::query("UPDATE deadline_reminders SET sent_at = ? WHERE id = ?")
                    .bind(Utc::now())
                    .bind(reminder.id)
                    .execute(db)
                    .await?;
                sent += 1;
            }
            Err(e) => {
                // Leave sent_at NULL so the next sweep retries
                warn!("Failed to send reminder {}: {}", reminder.id, e);
            }
        }
    }

    Ok(sent)
}
