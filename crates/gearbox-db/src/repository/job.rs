//! # Job Repository
//!
//! Database operations for the job lifecycle.
//!
//! ## Job Lifecycle Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Job Lifecycle                                     │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── insert() → Job { status: RECEPTION }                           │
//! │                                                                         │
//! │  2. ESTIMATE (only while ESTIMATION)                                   │
//! │     └── update_estimate() → gross/tax/discount/net, balance rederived  │
//! │                                                                         │
//! │  3. ADVANCE (one step at a time)                                       │
//! │     └── transition() → status + outbox entry in SAME transaction       │
//! │         WHERE status = <expected> guards against concurrent advances   │
//! │                                                                         │
//! │  4. NOTES (any state, including CLOSED)                                │
//! │     └── append_note() → additive only                                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use gearbox_core::{Job, JobStatus, Money};

/// Repository for job database operations.
#[derive(Debug, Clone)]
pub struct JobRepository {
    pool: SqlitePool,
}

impl JobRepository {
    /// Creates a new JobRepository.
    pub fn new(pool: SqlitePool) -> Self {
        JobRepository { pool }
    }

    /// Inserts a job (used by the command layer).
    pub async fn insert(&self, job: &Job) -> DbResult<()> {
        debug!(id = %job.id, job_number = %job.job_number, "Inserting job");

        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, job_number, customer_id, customer_phone, vehicle,
                advisor_id, branch_id, status,
                gross_cents, tax_cents, discount_cents, net_cents,
                advance_received_cents, balance_due_cents,
                lead_id, booking_id, notes, sla_started_at,
                created_at, updated_at, closed_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8,
                ?9, ?10, ?11, ?12,
                ?13, ?14,
                ?15, ?16, ?17, ?18,
                ?19, ?20, ?21
            )
            "#,
        )
        .bind(&job.id)
        .bind(&job.job_number)
        .bind(&job.customer_id)
        .bind(&job.customer_phone)
        .bind(&job.vehicle)
        .bind(&job.advisor_id)
        .bind(&job.branch_id)
        .bind(job.status)
        .bind(job.gross_cents)
        .bind(job.tax_cents)
        .bind(job.discount_cents)
        .bind(job.net_cents)
        .bind(job.advance_received_cents)
        .bind(job.balance_due_cents)
        .bind(&job.lead_id)
        .bind(&job.booking_id)
        .bind(&job.notes)
        .bind(job.sla_started_at)
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(job.closed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a job by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            SELECT
                id, job_number, customer_id, customer_phone, vehicle,
                advisor_id, branch_id, status,
                gross_cents, tax_cents, discount_cents, net_cents,
                advance_received_cents, balance_due_cents,
                lead_id, booking_id, notes, sla_started_at,
                created_at, updated_at, closed_at
            FROM jobs
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    /// Gets a job by its business number.
    pub async fn get_by_number(&self, job_number: &str) -> DbResult<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            SELECT
                id, job_number, customer_id, customer_phone, vehicle,
                advisor_id, branch_id, status,
                gross_cents, tax_cents, discount_cents, net_cents,
                advance_received_cents, balance_due_cents,
                lead_id, booking_id, notes, sla_started_at,
                created_at, updated_at, closed_at
            FROM jobs
            WHERE job_number = ?1
            "#,
        )
        .bind(job_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    /// Moves a job to its next status, writing the outbox notification
    /// in the same transaction.
    ///
    /// ## Atomicity
    /// The status write and the outbox insert commit together: a
    /// transition can never lose its notification, and an orphaned
    /// notification can never exist without its transition.
    ///
    /// ## Concurrency Guard
    /// The UPDATE is guarded with `WHERE status = <from>`. If another
    /// writer advanced the job first, zero rows match, the transaction
    /// rolls back, and the caller sees `TransactionFailed`.
    pub async fn transition(
        &self,
        job_id: &str,
        from: JobStatus,
        to: JobStatus,
        notice: Option<(&str, &str)>,
    ) -> DbResult<()> {
        let now = Utc::now();
        let closed_at = if to == JobStatus::Closed {
            Some(now)
        } else {
            None
        };

        debug!(id = %job_id, ?from, ?to, "Transitioning job");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE jobs SET
                status = ?3,
                updated_at = ?4,
                closed_at = COALESCE(?5, closed_at)
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(job_id)
        .bind(from)
        .bind(to)
        .bind(now)
        .bind(closed_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::TransactionFailed(format!(
                "job {job_id} was not in the expected status"
            )));
        }

        if let Some((recipient, body)) = notice {
            sqlx::query(
                r#"
                INSERT INTO notification_outbox (
                    id, job_id, recipient, body,
                    attempts, last_error, created_at, attempted_at, sent_at
                ) VALUES (?1, ?2, ?3, ?4, 0, NULL, ?5, NULL, NULL)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(job_id)
            .bind(recipient)
            .bind(body)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Updates the financial estimate of a job.
    ///
    /// ## Stage Guard
    /// `WHERE status = 'ESTIMATION'` enforces the editing window at the
    /// write itself: a job that left estimation between the read and the
    /// write matches zero rows and nothing changes.
    ///
    /// ## Derived Fields
    /// `net` is computed by the caller (gross + tax - discount);
    /// `balance_due` is rederived in SQL against the stored
    /// `advance_received` so a concurrent payment can't be overwritten
    /// with a stale value.
    pub async fn update_estimate(
        &self,
        job_id: &str,
        gross: Money,
        tax: Money,
        discount: Money,
    ) -> DbResult<()> {
        let now = Utc::now();
        let net = Money::net_of(gross, tax, discount);

        let result = sqlx::query(
            r#"
            UPDATE jobs SET
                gross_cents = ?2,
                tax_cents = ?3,
                discount_cents = ?4,
                net_cents = ?5,
                balance_due_cents = ?5 - advance_received_cents,
                updated_at = ?6
            WHERE id = ?1 AND status = 'ESTIMATION'
            "#,
        )
        .bind(job_id)
        .bind(gross.cents())
        .bind(tax.cents())
        .bind(discount.cents())
        .bind(net.cents())
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Job (estimation)", job_id));
        }

        Ok(())
    }

    /// Appends a note line to a job.
    ///
    /// Allowed in every status including CLOSED: notes are the one
    /// additive mutation that survives the terminal state.
    pub async fn append_note(&self, job_id: &str, note: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE jobs SET
                notes = CASE
                    WHEN notes IS NULL OR notes = '' THEN ?2
                    ELSE notes || char(10) || ?2
                END,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(job_id)
        .bind(note)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Job", job_id));
        }

        Ok(())
    }

    /// Lists non-closed jobs whose SLA clock started at or before `cutoff`.
    ///
    /// Used by the SLA sweep; the clock falls back to `created_at` when
    /// `sla_started_at` is NULL.
    pub async fn list_open_started_before(&self, cutoff: DateTime<Utc>) -> DbResult<Vec<Job>> {
        let jobs = sqlx::query_as::<_, Job>(
            r#"
            SELECT
                id, job_number, customer_id, customer_phone, vehicle,
                advisor_id, branch_id, status,
                gross_cents, tax_cents, discount_cents, net_cents,
                advance_received_cents, balance_due_cents,
                lead_id, booking_id, notes, sla_started_at,
                created_at, updated_at, closed_at
            FROM jobs
            WHERE status != 'CLOSED'
              AND COALESCE(sla_started_at, created_at) <= ?1
            ORDER BY created_at ASC
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }
}
