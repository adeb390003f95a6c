//! # Billing Repository
//!
//! Database operations for invoices, payments and the workshop diary
//! shadow.
//!
//! ## Atomic Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  record_payment (single transaction)                    │
//! │                                                                         │
//! │  1. INSERT INTO payments (...)                                         │
//! │                                                                         │
//! │  2. UPDATE jobs SET                                                    │
//! │       advance_received = Σ(advance, partial payments of this job)     │
//! │       balance_due      = net - that same sum                          │
//! │     ← the sum is a SQL subquery over the just-committed rows, so two  │
//! │       concurrent payments can never double-count or lose an update    │
//! │                                                                         │
//! │  3. UPDATE invoices (if one exists for the job) the same way          │
//! │                                                                         │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                  post_invoice_paid (single transaction)                 │
//! │                                                                         │
//! │  1. UPDATE invoices SET status='paid', ledger_txn_id=?                 │
//! │       WHERE id=? AND status='pending' AND ledger_txn_id IS NULL        │
//! │     ← zero rows = lost the race, whole transaction rolls back          │
//! │  2. UPDATE accounts SET balance += net (Sales Revenue credit)          │
//! │  3. INSERT INTO transactions (the permanent posting)                   │
//! │  4. UPDATE workshop_diary SET completed=1 for the job                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use gearbox_core::{DiaryEntry, Invoice, Payment, Transaction};

/// Repository for invoice, payment and diary operations.
#[derive(Debug, Clone)]
pub struct BillingRepository {
    pool: SqlitePool,
}

impl BillingRepository {
    /// Creates a new BillingRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BillingRepository { pool }
    }

    // =========================================================================
    // Invoices
    // =========================================================================

    /// Inserts an invoice.
    ///
    /// The UNIQUE index on `invoices.job_id` backs the one-invoice-per-job
    /// rule at the storage layer; a duplicate surfaces as
    /// [`DbError::UniqueViolation`] even if two creators race past the
    /// application-level check.
    pub async fn insert_invoice(&self, invoice: &Invoice) -> DbResult<()> {
        debug!(id = %invoice.id, invoice_number = %invoice.invoice_number, "Inserting invoice");

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, invoice_number, job_id,
                gross_cents, tax_cents, net_cents,
                advance_paid_cents, balance_due_cents,
                status, ledger_txn_id, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3,
                ?4, ?5, ?6,
                ?7, ?8,
                ?9, ?10, ?11, ?12
            )
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.invoice_number)
        .bind(&invoice.job_id)
        .bind(invoice.gross_cents)
        .bind(invoice.tax_cents)
        .bind(invoice.net_cents)
        .bind(invoice.advance_paid_cents)
        .bind(invoice.balance_due_cents)
        .bind(invoice.status)
        .bind(&invoice.ledger_txn_id)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets an invoice by ID.
    pub async fn get_invoice(&self, id: &str) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT
                id, invoice_number, job_id,
                gross_cents, tax_cents, net_cents,
                advance_paid_cents, balance_due_cents,
                status, ledger_txn_id, created_at, updated_at
            FROM invoices
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    /// Gets the invoice owned by a job, if one exists.
    pub async fn get_invoice_by_job(&self, job_id: &str) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT
                id, invoice_number, job_id,
                gross_cents, tax_cents, net_cents,
                advance_paid_cents, balance_due_cents,
                status, ledger_txn_id, created_at, updated_at
            FROM invoices
            WHERE job_id = ?1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Records a payment and rederives the job/invoice aggregates, all in
    /// one transaction.
    ///
    /// The aggregates are recomputed with a SQL subquery over the payment
    /// rows rather than incremented from a value read earlier, so the
    /// stored `advance_received` always equals the sum of its payments
    /// even under concurrent writers.
    pub async fn record_payment(&self, payment: &Payment) -> DbResult<()> {
        let now = Utc::now();

        debug!(
            job_id = %payment.job_id,
            slip_number = %payment.slip_number,
            amount = %payment.amount_cents,
            "Recording payment"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, slip_number, job_id, invoice_id,
                kind, method, amount_cents, received_at, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8, ?9
            )
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.slip_number)
        .bind(&payment.job_id)
        .bind(&payment.invoice_id)
        .bind(payment.kind)
        .bind(payment.method)
        .bind(payment.amount_cents)
        .bind(payment.received_at)
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await?;

        // Only advance and partial receipts accumulate into the aggregate.
        let result = sqlx::query(
            r#"
            UPDATE jobs SET
                advance_received_cents = (
                    SELECT COALESCE(SUM(amount_cents), 0) FROM payments
                    WHERE job_id = ?1 AND kind IN ('advance', 'partial')
                ),
                balance_due_cents = net_cents - (
                    SELECT COALESCE(SUM(amount_cents), 0) FROM payments
                    WHERE job_id = ?1 AND kind IN ('advance', 'partial')
                ),
                updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(&payment.job_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Job", &payment.job_id));
        }

        // Mirror onto the invoice when one exists; zero rows is fine.
        sqlx::query(
            r#"
            UPDATE invoices SET
                advance_paid_cents = (
                    SELECT COALESCE(SUM(amount_cents), 0) FROM payments
                    WHERE job_id = ?1 AND kind IN ('advance', 'partial')
                ),
                balance_due_cents = net_cents - (
                    SELECT COALESCE(SUM(amount_cents), 0) FROM payments
                    WHERE job_id = ?1 AND kind IN ('advance', 'partial')
                ),
                updated_at = ?2
            WHERE job_id = ?1
            "#,
        )
        .bind(&payment.job_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Gets all payments for a job.
    pub async fn list_payments(&self, job_id: &str) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT
                id, slip_number, job_id, invoice_id,
                kind, method, amount_cents, received_at, created_at
            FROM payments
            WHERE job_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    // =========================================================================
    // Paid Transition
    // =========================================================================

    /// Executes the pending → paid transition as one transaction:
    /// status + ledger link, account balance, the permanent posting, and
    /// the diary completion trigger.
    ///
    /// ## Race Loss
    /// The invoice UPDATE is guarded on `status = 'pending' AND
    /// ledger_txn_id IS NULL`. A concurrent transition that got there
    /// first makes this match zero rows; the whole transaction rolls back
    /// with `TransactionFailed` and no second posting can exist. Callers
    /// that checked first and saw `pending` only hit this on a true race.
    pub async fn post_invoice_paid(
        &self,
        invoice_id: &str,
        job_id: Option<&str>,
        txn: &Transaction,
    ) -> DbResult<()> {
        let now = Utc::now();

        debug!(invoice_id = %invoice_id, txn_id = %txn.id, "Posting invoice paid transition");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                status = 'paid',
                ledger_txn_id = ?2,
                updated_at = ?3
            WHERE id = ?1 AND status = 'pending' AND ledger_txn_id IS NULL
            "#,
        )
        .bind(invoice_id)
        .bind(&txn.id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::TransactionFailed(format!(
                "invoice {invoice_id} already posted"
            )));
        }

        // Revenue posting is always a credit: balance increases.
        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                balance_cents = balance_cents + ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(&txn.account_id)
        .bind(txn.amount_cents)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Account", &txn.account_id));
        }

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, account_id, direction, amount_cents,
                description, invoice_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&txn.id)
        .bind(&txn.account_id)
        .bind(txn.direction)
        .bind(txn.amount_cents)
        .bind(&txn.description)
        .bind(&txn.invoice_id)
        .bind(txn.created_at)
        .execute(&mut *tx)
        .await?;

        if let Some(job_id) = job_id {
            sqlx::query(
                r#"
                UPDATE workshop_diary SET
                    completed = 1,
                    completed_at = ?2
                WHERE job_id = ?1 AND completed = 0
                "#,
            )
            .bind(job_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    // =========================================================================
    // Workshop Diary
    // =========================================================================

    /// Adds a diary entry for a job.
    pub async fn add_diary_entry(&self, entry: &DiaryEntry) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO workshop_diary (
                id, job_id, entry, completed, completed_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.job_id)
        .bind(&entry.entry)
        .bind(entry.completed)
        .bind(entry.completed_at)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets all diary entries for a job.
    pub async fn list_diary(&self, job_id: &str) -> DbResult<Vec<DiaryEntry>> {
        let entries = sqlx::query_as::<_, DiaryEntry>(
            r#"
            SELECT id, job_id, entry, completed, completed_at, created_at
            FROM workshop_diary
            WHERE job_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
