//! # Billing Module
//!
//! Pure invoice and payment arithmetic: snapshotting a job into an
//! invoice, deriving payment aggregates, and deciding the paid-transition
//! outcome.
//!
//! ## The Billing Chain
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Billing Data Flow                                  │
//! │                                                                         │
//! │  Job financial snapshot                                                │
//! │   gross / tax / discount ──► net ──────────────┐                       │
//! │                                                ▼                       │
//! │  create_invoice ──► Invoice { net, pending } (at most one per job)     │
//! │                                                │                       │
//! │  record_payment ──► advance_received = Σ(advance, partial)             │
//! │                     balance_due     = net - advance_received           │
//! │                                                │                       │
//! │  mark_invoice_paid ──► ONE credit posting to Sales Revenue             │
//! │                        (idempotent via the ledger back-link)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is a pure function; the command layer persists the
//! results and executes the posting.

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Invoice, InvoiceStatus, Job, Payment};
use crate::validation::validate_amount;

// =============================================================================
// Invoice Snapshot
// =============================================================================

/// Builds a new pending invoice from a job's current financial snapshot.
///
/// ## Preconditions
/// The job must not already own an invoice: ownership is exclusive, so a
/// second request fails with [`CoreError::DuplicateInvoice`] and performs
/// no write. The caller passes whatever invoice it found for the job.
///
/// ## Snapshot Pattern
/// Totals are copied, not referenced: later estimate edits (which are
/// themselves guarded to the estimation stage) can never silently change
/// an issued document.
pub fn invoice_snapshot(
    job: &Job,
    existing: Option<&Invoice>,
    id: String,
    invoice_number: String,
    now: DateTime<Utc>,
) -> CoreResult<Invoice> {
    if let Some(existing) = existing {
        return Err(CoreError::DuplicateInvoice {
            job_number: job.job_number.clone(),
            invoice_number: existing.invoice_number.clone(),
        });
    }

    let net = Money::net_of(
        Money::from_cents(job.gross_cents),
        Money::from_cents(job.tax_cents),
        Money::from_cents(job.discount_cents),
    );
    let advance = Money::from_cents(job.advance_received_cents);

    Ok(Invoice {
        id,
        invoice_number,
        job_id: Some(job.id.clone()),
        gross_cents: job.gross_cents,
        tax_cents: job.tax_cents,
        net_cents: net.cents(),
        advance_paid_cents: advance.cents(),
        balance_due_cents: Money::balance_of(net, advance).cents(),
        status: InvoiceStatus::Pending,
        ledger_txn_id: None,
        created_at: now,
        updated_at: now,
    })
}

// =============================================================================
// Payment Aggregates
// =============================================================================

/// The recomputed job-side aggregates after a payment write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentTotals {
    /// Σ(amount) over advance and partial payments.
    pub advance_received: Money,
    /// net - advance_received.
    pub balance_due: Money,
}

/// Sums the advance/partial payments of a job.
///
/// ## Invariant
/// This sum must always equal the job's `advance_received` field. The
/// repository enforces it with an atomic aggregate UPDATE; this function
/// is the reference definition used by tests and by callers that already
/// hold the payment list.
pub fn advance_total(payments: &[Payment]) -> Money {
    Money::sum(
        payments
            .iter()
            .filter(|p| p.kind.counts_as_advance())
            .map(Payment::amount),
    )
}

/// Recomputes both job aggregates from the full payment list.
pub fn payment_totals(job: &Job, payments: &[Payment]) -> PaymentTotals {
    let advance_received = advance_total(payments);
    PaymentTotals {
        advance_received,
        balance_due: Money::balance_of(job.net(), advance_received),
    }
}

/// Validates a payment amount before any write happens.
///
/// All payment rows carry positive amounts; a refund is distinguished by
/// its kind, not by a negative number.
pub fn validate_payment_amount(amount: Money) -> CoreResult<()> {
    validate_amount("amount_cents", amount)?;
    Ok(())
}

// =============================================================================
// Paid Transition
// =============================================================================

/// The decision for a `mark_invoice_paid` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaidOutcome {
    /// The invoice already transitioned into paid; the posting exists.
    /// Callers return the existing linkage and write nothing.
    AlreadyPosted { ledger_txn_id: Option<String> },

    /// A genuine pending → paid transition: post exactly one credit of
    /// the net total to Sales Revenue, link it back to the invoice, and
    /// mark the job's diary entries completed.
    Post { credit: Money, description: String },
}

/// Decides what a `mark_invoice_paid` request must do.
///
/// ## Idempotency
/// Detection compares old state against the requested state, not the
/// requested state alone: an invoice that is already `Paid` (or that
/// carries a ledger back-link) short-circuits to `AlreadyPosted`, so a
/// second transition can never create a second transaction.
pub fn mark_paid(invoice: &Invoice) -> CoreResult<PaidOutcome> {
    if invoice.status == InvoiceStatus::Cancelled {
        return Err(CoreError::GuardViolation {
            job_number: invoice.job_id.clone().unwrap_or_default(),
            reason: format!("invoice {} is cancelled", invoice.invoice_number),
        });
    }

    if invoice.status == InvoiceStatus::Paid || invoice.is_posted() {
        return Ok(PaidOutcome::AlreadyPosted {
            ledger_txn_id: invoice.ledger_txn_id.clone(),
        });
    }

    Ok(PaidOutcome::Post {
        credit: invoice.net(),
        description: format!("Sales revenue for invoice {}", invoice.invoice_number),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{JobStatus, PaymentKind, PaymentMethod};

    fn job_with_snapshot(gross: i64, tax: i64, discount: i64) -> Job {
        let now = Utc::now();
        let net = gross + tax - discount;
        Job {
            id: "j1".into(),
            job_number: "JOB-20260825-0001".into(),
            customer_id: "c1".into(),
            customer_phone: None,
            vehicle: None,
            advisor_id: None,
            branch_id: None,
            status: JobStatus::Invoicing,
            gross_cents: gross,
            tax_cents: tax,
            discount_cents: discount,
            net_cents: net,
            advance_received_cents: 0,
            balance_due_cents: net,
            lead_id: None,
            booking_id: None,
            notes: None,
            sla_started_at: None,
            created_at: now,
            updated_at: now,
            closed_at: None,
        }
    }

    fn payment(kind: PaymentKind, amount: i64) -> Payment {
        let now = Utc::now();
        Payment {
            id: "p1".into(),
            slip_number: "SLIP-20260825-0001".into(),
            job_id: "j1".into(),
            invoice_id: None,
            kind,
            method: PaymentMethod::Cash,
            amount_cents: amount,
            received_at: now,
            created_at: now,
        }
    }

    #[test]
    fn test_invoice_snapshot_copies_totals() {
        let job = job_with_snapshot(100_000, 5_000, 0);
        let invoice = invoice_snapshot(
            &job,
            None,
            "i1".into(),
            "INV-20260825-0001".into(),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(invoice.net_cents, 105_000);
        assert_eq!(invoice.balance_due_cents, 105_000);
        assert_eq!(invoice.status, InvoiceStatus::Pending);
        assert_eq!(invoice.job_id.as_deref(), Some("j1"));
        assert!(invoice.ledger_txn_id.is_none());
    }

    #[test]
    fn test_second_invoice_is_rejected() {
        let job = job_with_snapshot(100_000, 5_000, 0);
        let first = invoice_snapshot(
            &job,
            None,
            "i1".into(),
            "INV-20260825-0001".into(),
            Utc::now(),
        )
        .unwrap();

        let err = invoice_snapshot(
            &job,
            Some(&first),
            "i2".into(),
            "INV-20260825-0002".into(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateInvoice { .. }));
    }

    #[test]
    fn test_advance_total_excludes_final_and_refund() {
        let payments = vec![
            payment(PaymentKind::Advance, 40_000),
            payment(PaymentKind::Partial, 10_000),
            payment(PaymentKind::Final, 55_000),
            payment(PaymentKind::Refund, 5_000),
        ];
        assert_eq!(advance_total(&payments).cents(), 50_000);
    }

    #[test]
    fn test_payment_totals_rederive_balance() {
        // gross 1000 + tax 50 → net 1050; 400 advance → balance 650
        let job = job_with_snapshot(100_000, 5_000, 0);
        let payments = vec![payment(PaymentKind::Advance, 40_000)];

        let totals = payment_totals(&job, &payments);
        assert_eq!(totals.advance_received.cents(), 40_000);
        assert_eq!(totals.balance_due.cents(), 65_000);
    }

    #[test]
    fn test_payment_amount_must_be_positive() {
        assert!(validate_payment_amount(Money::from_cents(1)).is_ok());
        assert!(validate_payment_amount(Money::zero()).is_err());
        assert!(validate_payment_amount(Money::from_cents(-100)).is_err());
    }

    #[test]
    fn test_mark_paid_posts_net_once() {
        let job = job_with_snapshot(100_000, 5_000, 0);
        let invoice = invoice_snapshot(
            &job,
            None,
            "i1".into(),
            "INV-20260825-0001".into(),
            Utc::now(),
        )
        .unwrap();

        match mark_paid(&invoice).unwrap() {
            PaidOutcome::Post { credit, description } => {
                assert_eq!(credit.cents(), 105_000);
                assert!(description.contains("INV-20260825-0001"));
            }
            other => panic!("expected Post, got {other:?}"),
        }
    }

    #[test]
    fn test_mark_paid_short_circuits_on_link() {
        let job = job_with_snapshot(100_000, 5_000, 0);
        let mut invoice = invoice_snapshot(
            &job,
            None,
            "i1".into(),
            "INV-20260825-0001".into(),
            Utc::now(),
        )
        .unwrap();
        invoice.status = InvoiceStatus::Paid;
        invoice.ledger_txn_id = Some("txn-1".into());

        match mark_paid(&invoice).unwrap() {
            PaidOutcome::AlreadyPosted { ledger_txn_id } => {
                assert_eq!(ledger_txn_id.as_deref(), Some("txn-1"));
            }
            other => panic!("expected AlreadyPosted, got {other:?}"),
        }
    }

    #[test]
    fn test_mark_paid_rejects_cancelled() {
        let job = job_with_snapshot(100_000, 5_000, 0);
        let mut invoice = invoice_snapshot(
            &job,
            None,
            "i1".into(),
            "INV-20260825-0001".into(),
            Utc::now(),
        )
        .unwrap();
        invoice.status = InvoiceStatus::Cancelled;

        assert!(mark_paid(&invoice).is_err());
    }
}
