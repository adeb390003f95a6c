//! # Workshop Command Layer
//!
//! The operation surface of the job lifecycle subsystem. Every command
//! follows the same shape: validate through gearbox-core's pure rules,
//! persist through a gearbox-db repository, then execute whatever
//! side-effect intents the core returned.
//!
//! ## Command Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     advance_status (example)                            │
//! │                                                                         │
//! │  1. LOAD        job + invoice existence                                │
//! │  2. DECIDE      lifecycle::advance(&job, has_invoice)  ← pure          │
//! │  3. PERSIST     status write + outbox entry, one transaction           │
//! │  4. RELOAD      return the fresh row                                   │
//! │                                                                         │
//! │  A failed guard stops at step 2: nothing was written.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use gearbox_core::{
    billing, ledger, lifecycle, transfer, validation, Account, AccountCategory, CoreError,
    DiaryEntry, EntryDirection, Invoice, Job, JobStatus, Money, Payment, PaymentKind,
    PaymentMethod, StockTransfer, Transaction, TransferItem, TransferStatus,
    SALES_REVENUE_ACCOUNT_CODE,
};
use gearbox_db::Database;

use crate::error::{OpsError, OpsResult};

// =============================================================================
// Input Types
// =============================================================================

/// Intake data for a new job. Everything beyond the customer is optional
/// at reception time.
#[derive(Debug, Clone, Default)]
pub struct JobIntake {
    pub customer_id: String,
    pub customer_phone: Option<String>,
    pub vehicle: Option<String>,
    pub advisor_id: Option<String>,
    pub branch_id: Option<String>,
    pub lead_id: Option<String>,
    pub booking_id: Option<String>,
}

/// One line of a new stock transfer.
#[derive(Debug, Clone)]
pub struct TransferLine {
    pub part_number: String,
    pub quantity: i64,
}

// =============================================================================
// Workshop
// =============================================================================

/// The command layer service. Cheap to clone; every operation borrows the
/// shared connection pool underneath.
#[derive(Debug, Clone)]
pub struct Workshop {
    db: Database,
}

impl Workshop {
    /// Creates a new Workshop over a connected database.
    pub fn new(db: Database) -> Self {
        Workshop { db }
    }

    /// Returns the underlying database handle.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Allocates the next business document number for a prefix.
    ///
    /// The per-day counter is stored in the database, so numbering
    /// continues across process restarts instead of colliding with the
    /// UNIQUE rows written by the previous run.
    async fn document_number(&self, prefix: &str) -> OpsResult<String> {
        let day = Utc::now().format("%Y%m%d").to_string();
        let seq = self.db.sequences().next(prefix, &day).await?;
        Ok(format_document_number(prefix, &day, seq))
    }

    // =========================================================================
    // Jobs
    // =========================================================================

    /// Opens a new job in RECEPTION.
    pub async fn create_job(&self, intake: JobIntake) -> OpsResult<Job> {
        validation::validate_identifier("customer_id", &intake.customer_id)
            .map_err(CoreError::from)?;

        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4().to_string(),
            job_number: self.document_number("JOB").await?,
            customer_id: intake.customer_id,
            customer_phone: intake.customer_phone,
            vehicle: intake.vehicle,
            advisor_id: intake.advisor_id,
            branch_id: intake.branch_id,
            status: JobStatus::Reception,
            gross_cents: 0,
            tax_cents: 0,
            discount_cents: 0,
            net_cents: 0,
            advance_received_cents: 0,
            balance_due_cents: 0,
            lead_id: intake.lead_id,
            booking_id: intake.booking_id,
            notes: None,
            sla_started_at: Some(now),
            created_at: now,
            updated_at: now,
            closed_at: None,
        };

        self.db.jobs().insert(&job).await?;

        info!(job_number = %job.job_number, "Job created");
        Ok(job)
    }

    /// Gets a job by ID.
    pub async fn get_job(&self, job_id: &str) -> OpsResult<Job> {
        self.db
            .jobs()
            .get_by_id(job_id)
            .await?
            .ok_or_else(|| OpsError::not_found("Job", job_id))
    }

    /// Rewrites a job's financial estimate.
    ///
    /// Only legal during ESTIMATION; every other stage mutates money
    /// exclusively through payments and invoices. The stage guard is
    /// checked here against the loaded row AND re-enforced by the
    /// repository's guarded UPDATE.
    pub async fn update_estimate(
        &self,
        job_id: &str,
        gross: Money,
        tax: Money,
        discount: Money,
    ) -> OpsResult<Job> {
        let job = self.get_job(job_id).await?;
        lifecycle::ensure_estimate_editable(&job)?;

        validation::validate_non_negative("gross_cents", gross.cents()).map_err(CoreError::from)?;
        validation::validate_non_negative("tax_cents", tax.cents()).map_err(CoreError::from)?;
        validation::validate_non_negative("discount_cents", discount.cents())
            .map_err(CoreError::from)?;

        self.db
            .jobs()
            .update_estimate(job_id, gross, tax, discount)
            .await?;

        self.get_job(job_id).await
    }

    /// Advances a job one step along the fixed lifecycle.
    ///
    /// The status write and the customer notification enqueue commit in
    /// one transaction; delivery itself happens later, asynchronously, and
    /// can never fail the transition.
    pub async fn advance_status(&self, job_id: &str) -> OpsResult<Job> {
        let job = self.get_job(job_id).await?;

        // Only the INVOICING → DELIVERY guard consumes this; skip the
        // lookup on every other transition.
        let has_invoice = if job.status == JobStatus::Invoicing {
            self.db.billing().get_invoice_by_job(job_id).await?.is_some()
        } else {
            false
        };

        let outcome = lifecycle::advance(&job, has_invoice)?;

        let notice = outcome.effects.iter().find_map(|effect| {
            let lifecycle::Effect::Notify { recipient, body } = effect;
            Some((recipient.as_str(), body.as_str()))
        });

        self.db
            .jobs()
            .transition(job_id, outcome.from, outcome.to, notice)
            .await?;

        info!(
            job_number = %job.job_number,
            from = ?outcome.from,
            to = ?outcome.to,
            "Job advanced"
        );

        self.get_job(job_id).await
    }

    /// Appends a note line to a job. Works in every state, including
    /// CLOSED: the one additive mutation the terminal state allows.
    pub async fn append_note(&self, job_id: &str, note: &str) -> OpsResult<Job> {
        validation::validate_text("note", note).map_err(CoreError::from)?;

        self.db.jobs().append_note(job_id, note.trim()).await?;
        self.get_job(job_id).await
    }

    /// Adds a workshop diary entry for a job.
    pub async fn add_diary_entry(&self, job_id: &str, text: &str) -> OpsResult<DiaryEntry> {
        validation::validate_text("entry", text).map_err(CoreError::from)?;
        let job = self.get_job(job_id).await?;

        let entry = DiaryEntry {
            id: Uuid::new_v4().to_string(),
            job_id: job.id,
            entry: text.trim().to_string(),
            completed: false,
            completed_at: None,
            created_at: Utc::now(),
        };
        self.db.billing().add_diary_entry(&entry).await?;

        Ok(entry)
    }

    // =========================================================================
    // Billing
    // =========================================================================

    /// Raises the invoice for a job.
    ///
    /// At most one invoice may exist per job: a second request fails with
    /// a duplicate error and writes nothing. The UNIQUE index on
    /// `invoices.job_id` backs this up if two creators race.
    pub async fn create_invoice(&self, job_id: &str) -> OpsResult<Invoice> {
        let job = self.get_job(job_id).await?;
        let existing = self.db.billing().get_invoice_by_job(job_id).await?;

        let invoice = billing::invoice_snapshot(
            &job,
            existing.as_ref(),
            Uuid::new_v4().to_string(),
            self.document_number("INV").await?,
            Utc::now(),
        )?;

        self.db.billing().insert_invoice(&invoice).await?;

        info!(
            invoice_number = %invoice.invoice_number,
            job_number = %job.job_number,
            net = %invoice.net(),
            "Invoice created"
        );
        Ok(invoice)
    }

    /// Gets an invoice by ID.
    pub async fn get_invoice(&self, invoice_id: &str) -> OpsResult<Invoice> {
        self.db
            .billing()
            .get_invoice(invoice_id)
            .await?
            .ok_or_else(|| OpsError::not_found("Invoice", invoice_id))
    }

    /// Records a payment against a job and returns the job with its
    /// rederived advance/balance summary.
    ///
    /// Payment rows are immutable and always positive; a refund is a kind,
    /// not a negative amount. The aggregates are recomputed atomically in
    /// the same transaction as the insert.
    pub async fn record_payment(
        &self,
        job_id: &str,
        amount: Money,
        kind: PaymentKind,
        method: PaymentMethod,
    ) -> OpsResult<Job> {
        billing::validate_payment_amount(amount)?;
        let job = self.get_job(job_id).await?;
        let invoice = self.db.billing().get_invoice_by_job(job_id).await?;

        let now = Utc::now();
        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            slip_number: self.document_number("SLIP").await?,
            job_id: job.id,
            invoice_id: invoice.map(|i| i.id),
            kind,
            method,
            amount_cents: amount.cents(),
            received_at: now,
            created_at: now,
        };

        self.db.billing().record_payment(&payment).await?;

        debug!(slip_number = %payment.slip_number, amount = %amount, "Payment recorded");
        self.get_job(job_id).await
    }

    /// Marks an invoice paid, posting its net total to Sales Revenue.
    ///
    /// ## Idempotency
    /// Transition detection compares old state against new: an invoice
    /// that already carries its ledger link returns unchanged and posts
    /// nothing, so calling this twice can never create a second
    /// transaction. The posting, the status write, the back-link and the
    /// diary completion all commit in one database transaction.
    pub async fn mark_invoice_paid(&self, invoice_id: &str) -> OpsResult<Invoice> {
        let invoice = self.get_invoice(invoice_id).await?;

        match billing::mark_paid(&invoice)? {
            billing::PaidOutcome::AlreadyPosted { ledger_txn_id } => {
                debug!(
                    invoice_number = %invoice.invoice_number,
                    ledger_txn_id = ?ledger_txn_id,
                    "Invoice already paid, nothing to post"
                );
                Ok(invoice)
            }
            billing::PaidOutcome::Post { credit, description } => {
                let account = self
                    .db
                    .ledger()
                    .get_account_by_code(SALES_REVENUE_ACCOUNT_CODE)
                    .await?
                    .ok_or_else(|| {
                        OpsError::not_found("Account", SALES_REVENUE_ACCOUNT_CODE)
                    })?;

                let txn = ledger::posting(
                    Uuid::new_v4().to_string(),
                    account.id,
                    credit,
                    EntryDirection::Credit,
                    description,
                    Some(invoice.id.clone()),
                    Utc::now(),
                )?;

                self.db
                    .billing()
                    .post_invoice_paid(&invoice.id, invoice.job_id.as_deref(), &txn)
                    .await?;

                info!(
                    invoice_number = %invoice.invoice_number,
                    credit = %credit,
                    txn_id = %txn.id,
                    "Invoice paid, revenue posted"
                );
                self.get_invoice(invoice_id).await
            }
        }
    }

    // =========================================================================
    // Ledger
    // =========================================================================

    /// Creates a ledger account with a zero opening balance.
    pub async fn create_account(
        &self,
        code: &str,
        name: &str,
        category: AccountCategory,
    ) -> OpsResult<Account> {
        validation::validate_identifier("code", code).map_err(CoreError::from)?;
        validation::validate_text("name", name).map_err(CoreError::from)?;

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4().to_string(),
            code: code.trim().to_string(),
            name: name.trim().to_string(),
            category,
            balance_cents: 0,
            created_at: now,
            updated_at: now,
        };
        self.db.ledger().insert_account(&account).await?;

        Ok(account)
    }

    /// Posts a manual transaction to an account by business code.
    pub async fn post_transaction(
        &self,
        account_code: &str,
        amount: Money,
        direction: EntryDirection,
        description: &str,
    ) -> OpsResult<Transaction> {
        validation::validate_text("description", description).map_err(CoreError::from)?;

        let account = self
            .db
            .ledger()
            .get_account_by_code(account_code)
            .await?
            .ok_or_else(|| OpsError::not_found("Account", account_code))?;

        let txn = ledger::posting(
            Uuid::new_v4().to_string(),
            account.id,
            amount,
            direction,
            description.trim().to_string(),
            None,
            Utc::now(),
        )?;

        self.db.ledger().post(&txn).await?;

        Ok(txn)
    }

    /// Refuses to delete a ledger transaction.
    ///
    /// The ledger is append-only: an existing transaction fails with the
    /// dedicated append-only error, an unknown one with not-found. Never a
    /// silent no-op, and no SQL path exists that could delete the row.
    /// Corrections are made by posting an opposite-signed transaction.
    pub async fn delete_transaction(&self, txn_id: &str) -> OpsResult<()> {
        match self.db.ledger().get_transaction(txn_id).await? {
            Some(txn) => Err(CoreError::AppendOnlyLedger {
                id: txn.id,
                operation: "deleted".to_string(),
            }
            .into()),
            None => Err(OpsError::not_found("Transaction", txn_id)),
        }
    }

    // =========================================================================
    // Stock Transfers
    // =========================================================================

    /// Creates a pending transfer between two branches.
    ///
    /// Line metadata (name, category, unit cost) is snapshotted from the
    /// source branch's stock records so the destination record can be
    /// created later even if the source row changes.
    pub async fn create_transfer(
        &self,
        source_branch_id: &str,
        dest_branch_id: &str,
        lines: &[TransferLine],
    ) -> OpsResult<StockTransfer> {
        validation::validate_identifier("source_branch_id", source_branch_id)
            .map_err(CoreError::from)?;
        validation::validate_identifier("dest_branch_id", dest_branch_id)
            .map_err(CoreError::from)?;
        if lines.is_empty() {
            return Err(CoreError::from(gearbox_core::ValidationError::Required {
                field: "lines".to_string(),
            })
            .into());
        }

        let now = Utc::now();
        let transfer = StockTransfer {
            id: Uuid::new_v4().to_string(),
            transfer_number: self.document_number("TRF").await?,
            source_branch_id: source_branch_id.to_string(),
            dest_branch_id: dest_branch_id.to_string(),
            status: TransferStatus::Pending,
            created_at: now,
            updated_at: now,
            dispatched_at: None,
            completed_at: None,
        };

        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            validation::validate_quantity(line.quantity).map_err(CoreError::from)?;

            let stock = self
                .db
                .transfers()
                .get_stock(source_branch_id, &line.part_number)
                .await?
                .ok_or_else(|| {
                    OpsError::not_found(
                        "StockItem",
                        format!("{source_branch_id}/{}", line.part_number),
                    )
                })?;

            items.push(TransferItem {
                id: Uuid::new_v4().to_string(),
                transfer_id: transfer.id.clone(),
                part_number: stock.part_number,
                name: stock.name,
                category: stock.category,
                unit_cost_cents: stock.unit_cost_cents,
                quantity: line.quantity,
                created_at: now,
            });
        }

        self.db.transfers().create_transfer(&transfer, &items).await?;

        info!(
            transfer_number = %transfer.transfer_number,
            lines = items.len(),
            "Transfer created"
        );
        Ok(transfer)
    }

    /// Gets a transfer by ID.
    pub async fn get_transfer(&self, transfer_id: &str) -> OpsResult<StockTransfer> {
        self.db
            .transfers()
            .get_by_id(transfer_id)
            .await?
            .ok_or_else(|| OpsError::not_found("StockTransfer", transfer_id))
    }

    /// Moves a transfer to a new status, materializing the stock
    /// movements the transition synthesizes.
    ///
    /// Re-saving the current status is accepted and moves no stock;
    /// anything outside the fixed graph fails before any write.
    pub async fn transition_transfer(
        &self,
        transfer_id: &str,
        new_status: TransferStatus,
    ) -> OpsResult<StockTransfer> {
        let current = self.get_transfer(transfer_id).await?;
        let items = self.db.transfers().get_items(transfer_id).await?;

        let outcome = transfer::transition(&current, &items, new_status)?;

        self.db
            .transfers()
            .execute_transition(&current, outcome.to, &outcome.movements)
            .await?;

        info!(
            transfer_number = %current.transfer_number,
            from = ?outcome.from,
            to = ?outcome.to,
            movements = outcome.movements.len(),
            "Transfer transitioned"
        );

        self.get_transfer(transfer_id).await
    }
}

// =============================================================================
// Document Numbers
// =============================================================================

/// Renders a business document number: `{PREFIX}-{YYYYMMDD}-{NNNN}`.
///
/// ## Example
/// `JOB-20260825-0417`
///
/// Sequences past 9999 widen rather than wrap; the columns are UNIQUE.
fn format_document_number(prefix: &str, day: &str, seq: i64) -> String {
    format!("{}-{}-{:04}", prefix, day, seq)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_number_format() {
        assert_eq!(format_document_number("JOB", "20260825", 417), "JOB-20260825-0417");
        assert_eq!(format_document_number("INV", "20260825", 1), "INV-20260825-0001");
        // No wrap-around: the day's 10000th document just gets wider.
        assert_eq!(format_document_number("SLIP", "20260825", 10_000), "SLIP-20260825-10000");
    }
}
