//! # SLA Violation Repository
//!
//! Persistence for breach records written by the periodic SLA sweep.
//!
//! The UNIQUE constraint on (job_id, rule) makes `record_violation`
//! idempotent: the sweep can run as often as it likes without ever
//! duplicating a flag.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use gearbox_core::SlaViolation;

/// Repository for SLA violation records.
#[derive(Debug, Clone)]
pub struct SlaRepository {
    pool: SqlitePool,
}

impl SlaRepository {
    /// Creates a new SlaRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SlaRepository { pool }
    }

    /// Records a violation for (job, rule), once.
    ///
    /// ## Returns
    /// `true` if a new row was written, `false` if the pair was already
    /// flagged (the conflict is swallowed by `DO NOTHING`).
    pub async fn record_violation(
        &self,
        job_id: &str,
        rule: &str,
        detected_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO sla_violations (id, job_id, rule, detected_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (job_id, rule) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(job_id)
        .bind(rule)
        .bind(detected_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let inserted = result.rows_affected() > 0;
        if inserted {
            debug!(job_id = %job_id, rule = %rule, "Recorded SLA violation");
        }

        Ok(inserted)
    }

    /// Gets all violations recorded for a job.
    pub async fn list_for_job(&self, job_id: &str) -> DbResult<Vec<SlaViolation>> {
        let violations = sqlx::query_as::<_, SlaViolation>(
            r#"
            SELECT id, job_id, rule, detected_at, created_at
            FROM sla_violations
            WHERE job_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(violations)
    }
}
