//! # Notification Outbox Repository
//!
//! Manages the notification outbox queue for customer messaging.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Outbox Pattern Implementation                        │
//! │                                                                         │
//! │  LOCAL OPERATION (advance_status)                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │  1. UPDATE jobs SET status = <next> WHERE id = ?                │   │
//! │  │  2. INSERT INTO notification_outbox (recipient, body)           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← Both succeed or both fail                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          BACKGROUND DISPATCHER (gearbox-ops)                    │   │
//! │  │  1. SELECT * FROM notification_outbox WHERE sent_at IS NULL     │   │
//! │  │  2. For each entry:                                             │   │
//! │  │     a. Send through the notification channel                    │   │
//! │  │     b. On success: mark_sent (sent_at = NOW)                    │   │
//! │  │     c. On failure: mark_failed (attempts += 1, last_error)      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  KEY GUARANTEES:                                                       │
//! │  • The transition is never lost (it's in the local DB)                 │
//! │  • The notification is never orphaned (same transaction)               │
//! │  • Channel down? Entries queue up and retry with a bounded budget      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use gearbox_core::NotificationOutboxEntry;

/// Repository for notification outbox operations.
#[derive(Debug, Clone)]
pub struct NotificationOutboxRepository {
    pool: SqlitePool,
}

impl NotificationOutboxRepository {
    /// Creates a new NotificationOutboxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        NotificationOutboxRepository { pool }
    }

    /// Queues a notification directly.
    ///
    /// Status transitions enqueue through `JobRepository::transition`
    /// (same transaction as the status write); this entry point exists
    /// for ad-hoc messages.
    pub async fn enqueue(
        &self,
        job_id: Option<&str>,
        recipient: &str,
        body: &str,
    ) -> DbResult<NotificationOutboxEntry> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(recipient = %recipient, "Queuing notification");

        let entry = NotificationOutboxEntry {
            id: id.clone(),
            job_id: job_id.map(str::to_string),
            recipient: recipient.to_string(),
            body: body.to_string(),
            attempts: 0,
            last_error: None,
            created_at: now,
            attempted_at: None,
            sent_at: None,
        };

        sqlx::query(
            r#"
            INSERT INTO notification_outbox (
                id, job_id, recipient, body,
                attempts, last_error, created_at, attempted_at, sent_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.job_id)
        .bind(&entry.recipient)
        .bind(&entry.body)
        .bind(entry.attempts)
        .bind(&entry.last_error)
        .bind(entry.created_at)
        .bind(entry.attempted_at)
        .bind(entry.sent_at)
        .execute(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Gets pending entries that need to be dispatched.
    ///
    /// Entries where `sent_at IS NULL` and the retry budget is not yet
    /// exhausted, ordered by created_at (oldest first). Exhausted entries
    /// are excluded in SQL: a permanently failing old entry must never
    /// occupy a batch slot and starve deliverable newer ones.
    pub async fn get_pending(
        &self,
        limit: u32,
        max_attempts: i64,
    ) -> DbResult<Vec<NotificationOutboxEntry>> {
        let entries = sqlx::query_as::<_, NotificationOutboxEntry>(
            r#"
            SELECT id, job_id, recipient, body,
                   attempts, last_error, created_at, attempted_at, sent_at
            FROM notification_outbox
            WHERE sent_at IS NULL AND attempts < ?2
            ORDER BY created_at ASC
            LIMIT ?1
            "#,
        )
        .bind(limit as i64)
        .bind(max_attempts)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Marks an entry as successfully delivered.
    pub async fn mark_sent(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE notification_outbox SET
                sent_at = ?2,
                attempted_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Records a delivery failure.
    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE notification_outbox SET
                attempts = attempts + 1,
                last_error = ?2,
                attempted_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Counts undelivered entries.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notification_outbox WHERE sent_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}
