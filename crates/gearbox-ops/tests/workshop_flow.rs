//! End-to-end workshop scenarios against an in-memory database.

use std::sync::Arc;

use async_trait::async_trait;

use gearbox_core::{
    ledger, AccountCategory, CoreError, EntryDirection, JobStatus, Money, PaymentKind,
    PaymentMethod, TransferStatus, SALES_REVENUE_ACCOUNT_CODE,
};
use gearbox_db::{Database, DbConfig};
use gearbox_ops::{
    DispatchConfig, JobIntake, LogChannel, NotificationChannel, NotificationDispatcher, OpsError,
    SlaPolicy, SlaSweep, TransferLine, Workshop,
};

/// Fresh isolated workshop with the revenue account seeded.
async fn setup() -> Workshop {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let workshop = Workshop::new(db);
    workshop
        .create_account(SALES_REVENUE_ACCOUNT_CODE, "Sales Revenue", AccountCategory::Revenue)
        .await
        .unwrap();
    workshop
}

fn intake_with_phone() -> JobIntake {
    JobIntake {
        customer_id: "cust-001".into(),
        customer_phone: Some("+15550001111".into()),
        vehicle: Some("ABC-123 Corolla".into()),
        ..Default::default()
    }
}

/// Advances a job repeatedly until it reaches the given status.
async fn advance_to(workshop: &Workshop, job_id: &str, target: JobStatus) {
    loop {
        let job = workshop.get_job(job_id).await.unwrap();
        if job.status == target {
            return;
        }
        workshop.advance_status(job_id).await.unwrap();
    }
}

// =============================================================================
// Lifecycle + Billing
// =============================================================================

#[tokio::test]
async fn full_lifecycle_with_billing() {
    let workshop = setup().await;

    let job = workshop.create_job(intake_with_phone()).await.unwrap();
    assert_eq!(job.status, JobStatus::Reception);
    assert!(job.job_number.starts_with("JOB-"));

    // gross 1000 + tax 50 - discount 0 → net 1050
    advance_to(&workshop, &job.id, JobStatus::Estimation).await;
    let job = workshop
        .update_estimate(
            &job.id,
            Money::from_cents(100_000),
            Money::from_cents(5_000),
            Money::zero(),
        )
        .await
        .unwrap();
    assert_eq!(job.net_cents, 105_000);
    assert_eq!(job.balance_due_cents, 105_000);

    // 400 advance → balance 650
    advance_to(&workshop, &job.id, JobStatus::QualityControl).await;
    let job = workshop
        .record_payment(
            &job.id,
            Money::from_cents(40_000),
            PaymentKind::Advance,
            PaymentMethod::Cash,
        )
        .await
        .unwrap();
    assert_eq!(job.advance_received_cents, 40_000);
    assert_eq!(job.balance_due_cents, 65_000);

    advance_to(&workshop, &job.id, JobStatus::Invoicing).await;

    // No invoice yet: the delivery guard blocks.
    let err = workshop.advance_status(&job.id).await.unwrap_err();
    assert!(matches!(
        err,
        OpsError::Core(CoreError::GuardViolation { .. })
    ));

    let invoice = workshop.create_invoice(&job.id).await.unwrap();
    assert_eq!(invoice.net_cents, 105_000);
    assert_eq!(invoice.advance_paid_cents, 40_000);
    assert_eq!(invoice.balance_due_cents, 65_000);

    let job = workshop.advance_status(&job.id).await.unwrap();
    assert_eq!(job.status, JobStatus::Delivery);

    workshop.add_diary_entry(&job.id, "Final detailing done").await.unwrap();

    // Settlement posts net once to Sales Revenue and completes the diary.
    let invoice = workshop.mark_invoice_paid(&invoice.id).await.unwrap();
    assert!(invoice.ledger_txn_id.is_some());

    let account = workshop
        .db()
        .ledger()
        .get_account_by_code(SALES_REVENUE_ACCOUNT_CODE)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(account.balance_cents, 105_000);

    let diary = workshop.db().billing().list_diary(&job.id).await.unwrap();
    assert!(diary.iter().all(|e| e.completed));

    let job = workshop.advance_status(&job.id).await.unwrap();
    assert_eq!(job.status, JobStatus::Closed);
    assert!(job.closed_at.is_some());

    // Terminal: no further advance, ever.
    let err = workshop.advance_status(&job.id).await.unwrap_err();
    assert!(matches!(err, OpsError::Core(CoreError::CannotAdvance { .. })));

    // Notes are the one mutation CLOSED still allows.
    let job = workshop.append_note(&job.id, "Customer picked up keys").await.unwrap();
    assert!(job.notes.unwrap().contains("picked up keys"));
}

#[tokio::test]
async fn estimate_editable_only_during_estimation() {
    let workshop = setup().await;
    let job = workshop.create_job(intake_with_phone()).await.unwrap();

    // RECEPTION: too early.
    let err = workshop
        .update_estimate(&job.id, Money::from_cents(1_000), Money::zero(), Money::zero())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OpsError::Core(CoreError::GuardViolation { .. })
    ));

    advance_to(&workshop, &job.id, JobStatus::WorkAssignment).await;

    // Past ESTIMATION: too late, money now moves via payments only.
    let err = workshop
        .update_estimate(&job.id, Money::from_cents(1_000), Money::zero(), Money::zero())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OpsError::Core(CoreError::GuardViolation { .. })
    ));
}

#[tokio::test]
async fn second_invoice_rejected_leaving_one() {
    let workshop = setup().await;
    let job = workshop.create_job(intake_with_phone()).await.unwrap();

    workshop.create_invoice(&job.id).await.unwrap();
    let err = workshop.create_invoice(&job.id).await.unwrap_err();
    assert!(matches!(
        err,
        OpsError::Core(CoreError::DuplicateInvoice { .. })
    ));

    let invoice = workshop
        .db()
        .billing()
        .get_invoice_by_job(&job.id)
        .await
        .unwrap();
    assert!(invoice.is_some());
}

#[tokio::test]
async fn payment_aggregates_follow_kind() {
    let workshop = setup().await;
    let job = workshop.create_job(intake_with_phone()).await.unwrap();

    advance_to(&workshop, &job.id, JobStatus::Estimation).await;
    workshop
        .update_estimate(&job.id, Money::from_cents(100_000), Money::zero(), Money::zero())
        .await
        .unwrap();

    let job = workshop
        .record_payment(&job.id, Money::from_cents(30_000), PaymentKind::Advance, PaymentMethod::Cash)
        .await
        .unwrap();
    let job = workshop
        .record_payment(&job.id, Money::from_cents(20_000), PaymentKind::Partial, PaymentMethod::Card)
        .await
        .unwrap();
    assert_eq!(job.advance_received_cents, 50_000);
    assert_eq!(job.balance_due_cents, 50_000);

    // Final and refund payments never accumulate into the advance.
    let job = workshop
        .record_payment(&job.id, Money::from_cents(50_000), PaymentKind::Final, PaymentMethod::Cash)
        .await
        .unwrap();
    assert_eq!(job.advance_received_cents, 50_000);

    let payments = workshop.db().billing().list_payments(&job.id).await.unwrap();
    assert_eq!(payments.len(), 3);

    // Zero and negative amounts are rejected before any write.
    assert!(workshop
        .record_payment(&job.id, Money::zero(), PaymentKind::Advance, PaymentMethod::Cash)
        .await
        .is_err());
}

#[tokio::test]
async fn payment_after_invoice_rederives_invoice_aggregates() {
    let workshop = setup().await;
    let job = workshop.create_job(intake_with_phone()).await.unwrap();

    advance_to(&workshop, &job.id, JobStatus::Estimation).await;
    workshop
        .update_estimate(&job.id, Money::from_cents(100_000), Money::from_cents(5_000), Money::zero())
        .await
        .unwrap();

    let invoice = workshop.create_invoice(&job.id).await.unwrap();
    assert_eq!(invoice.advance_paid_cents, 0);
    assert_eq!(invoice.balance_due_cents, 105_000);

    // A payment recorded after the invoice exists links to it and
    // rederives the invoice aggregates, not just the job's.
    workshop
        .record_payment(&job.id, Money::from_cents(40_000), PaymentKind::Advance, PaymentMethod::Cash)
        .await
        .unwrap();

    let invoice = workshop.get_invoice(&invoice.id).await.unwrap();
    assert_eq!(invoice.advance_paid_cents, 40_000);
    assert_eq!(invoice.balance_due_cents, 65_000);

    let payments = workshop.db().billing().list_payments(&job.id).await.unwrap();
    assert_eq!(payments[0].invoice_id.as_deref(), Some(invoice.id.as_str()));

    // Settlement kinds do not accumulate into the invoice advance either.
    workshop
        .record_payment(&job.id, Money::from_cents(65_000), PaymentKind::Final, PaymentMethod::Card)
        .await
        .unwrap();

    let invoice = workshop.get_invoice(&invoice.id).await.unwrap();
    assert_eq!(invoice.advance_paid_cents, 40_000);
    assert_eq!(invoice.balance_due_cents, 65_000);
}

#[tokio::test]
async fn document_numbers_continue_across_service_instances() {
    let workshop = setup().await;
    let first = workshop.create_job(intake_with_phone()).await.unwrap();

    // A fresh service over the same database, as after a restart: the
    // counter is stored, so the next number cannot collide with the
    // UNIQUE job_number written by the previous instance.
    let reopened = Workshop::new(workshop.db().clone());
    let second = reopened.create_job(intake_with_phone()).await.unwrap();

    assert_ne!(first.job_number, second.job_number);
    assert!(second.job_number > first.job_number);
}

#[tokio::test]
async fn double_mark_paid_posts_exactly_once() {
    let workshop = setup().await;
    let job = workshop.create_job(intake_with_phone()).await.unwrap();

    advance_to(&workshop, &job.id, JobStatus::Estimation).await;
    workshop
        .update_estimate(&job.id, Money::from_cents(100_000), Money::from_cents(5_000), Money::zero())
        .await
        .unwrap();
    let invoice = workshop.create_invoice(&job.id).await.unwrap();

    let first = workshop.mark_invoice_paid(&invoice.id).await.unwrap();
    let link = first.ledger_txn_id.clone().unwrap();

    let second = workshop.mark_invoice_paid(&invoice.id).await.unwrap();
    assert_eq!(second.ledger_txn_id.as_deref(), Some(link.as_str()));

    let account = workshop
        .db()
        .ledger()
        .get_account_by_code(SALES_REVENUE_ACCOUNT_CODE)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(account.balance_cents, 105_000);

    let history = workshop
        .db()
        .ledger()
        .list_transactions(&account.id)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].invoice_id.as_deref(), Some(invoice.id.as_str()));
}

// =============================================================================
// Ledger
// =============================================================================

#[tokio::test]
async fn ledger_balance_matches_replay() {
    let workshop = setup().await;
    workshop
        .create_account("1000-CASH", "Cash", AccountCategory::Asset)
        .await
        .unwrap();

    workshop
        .post_transaction("1000-CASH", Money::from_cents(105_000), EntryDirection::Credit, "Opening float")
        .await
        .unwrap();
    workshop
        .post_transaction("1000-CASH", Money::from_cents(20_000), EntryDirection::Debit, "Parts purchase")
        .await
        .unwrap();
    workshop
        .post_transaction("1000-CASH", Money::from_cents(5_000), EntryDirection::Credit, "Sundry income")
        .await
        .unwrap();

    let account = workshop
        .db()
        .ledger()
        .get_account_by_code("1000-CASH")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(account.balance_cents, 90_000);

    // balance == initial + sum(credits) - sum(debits)
    let history = workshop
        .db()
        .ledger()
        .list_transactions(&account.id)
        .await
        .unwrap();
    let replayed = ledger::replay(Money::zero(), &history);
    assert_eq!(replayed.cents(), account.balance_cents);
}

#[tokio::test]
async fn delete_transaction_always_fails() {
    let workshop = setup().await;
    workshop
        .create_account("1000-CASH", "Cash", AccountCategory::Asset)
        .await
        .unwrap();
    let txn = workshop
        .post_transaction("1000-CASH", Money::from_cents(1_000), EntryDirection::Credit, "Opening float")
        .await
        .unwrap();

    // Existing transaction: the dedicated append-only error.
    let err = workshop.delete_transaction(&txn.id).await.unwrap_err();
    assert!(matches!(
        err,
        OpsError::Core(CoreError::AppendOnlyLedger { .. })
    ));

    // Unknown id: not-found, never a silent no-op.
    let err = workshop.delete_transaction("no-such-txn").await.unwrap_err();
    assert!(matches!(err, OpsError::NotFound { .. }));

    // The row is still there.
    let still_there = workshop
        .db()
        .ledger()
        .get_transaction(&txn.id)
        .await
        .unwrap();
    assert!(still_there.is_some());
}

#[tokio::test]
async fn posting_requires_positive_amount() {
    let workshop = setup().await;
    workshop
        .create_account("1000-CASH", "Cash", AccountCategory::Asset)
        .await
        .unwrap();

    assert!(workshop
        .post_transaction("1000-CASH", Money::zero(), EntryDirection::Credit, "Zero")
        .await
        .is_err());
    assert!(workshop
        .post_transaction("1000-CASH", Money::from_cents(-5), EntryDirection::Debit, "Negative")
        .await
        .is_err());
}

// =============================================================================
// Stock Transfers
// =============================================================================

async fn seed_source_stock(workshop: &Workshop, quantity: i64) {
    let now = chrono::Utc::now();
    workshop
        .db()
        .transfers()
        .insert_stock_item(&gearbox_core::StockItem {
            id: uuid::Uuid::new_v4().to_string(),
            branch_id: "branch-a".into(),
            part_number: "OIL-5W30".into(),
            name: "Engine Oil 5W30".into(),
            category: Some("lubricants".into()),
            unit_cost_cents: 4_500,
            quantity,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn transfer_moves_stock_between_branches() {
    let workshop = setup().await;
    seed_source_stock(&workshop, 100).await;

    let transfer = workshop
        .create_transfer(
            "branch-a",
            "branch-b",
            &[TransferLine { part_number: "OIL-5W30".into(), quantity: 10 }],
        )
        .await
        .unwrap();
    assert_eq!(transfer.status, TransferStatus::Pending);

    // Dispatch: source decremented, one outbound movement.
    let transfer = workshop
        .transition_transfer(&transfer.id, TransferStatus::InTransit)
        .await
        .unwrap();
    assert!(transfer.dispatched_at.is_some());

    let source = workshop
        .db()
        .transfers()
        .get_stock("branch-a", "OIL-5W30")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(source.quantity, 90);

    // Re-save of the current status: accepted, no extra movements.
    workshop
        .transition_transfer(&transfer.id, TransferStatus::InTransit)
        .await
        .unwrap();
    let movements = workshop
        .db()
        .transfers()
        .list_movements(&transfer.id)
        .await
        .unwrap();
    assert_eq!(movements.len(), 1);

    // Completion: destination record created on demand with the snapshot.
    let transfer = workshop
        .transition_transfer(&transfer.id, TransferStatus::Completed)
        .await
        .unwrap();
    assert!(transfer.completed_at.is_some());

    let dest = workshop
        .db()
        .transfers()
        .get_stock("branch-b", "OIL-5W30")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(dest.quantity, 10);
    assert_eq!(dest.name, "Engine Oil 5W30");
    assert_eq!(dest.unit_cost_cents, 4_500);

    let movements = workshop
        .db()
        .transfers()
        .list_movements(&transfer.id)
        .await
        .unwrap();
    assert_eq!(movements.len(), 2);
}

#[tokio::test]
async fn transfer_transition_graph_is_enforced() {
    let workshop = setup().await;
    seed_source_stock(&workshop, 100).await;

    let transfer = workshop
        .create_transfer(
            "branch-a",
            "branch-b",
            &[TransferLine { part_number: "OIL-5W30".into(), quantity: 5 }],
        )
        .await
        .unwrap();

    // pending → completed skips in_transit.
    let err = workshop
        .transition_transfer(&transfer.id, TransferStatus::Completed)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OpsError::Core(CoreError::InvalidTransferTransition { .. })
    ));

    // Cancellation from pending is fine and moves no stock.
    workshop
        .transition_transfer(&transfer.id, TransferStatus::Cancelled)
        .await
        .unwrap();
    let source = workshop
        .db()
        .transfers()
        .get_stock("branch-a", "OIL-5W30")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(source.quantity, 100);

    // Cancelled is terminal.
    let err = workshop
        .transition_transfer(&transfer.id, TransferStatus::InTransit)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OpsError::Core(CoreError::InvalidTransferTransition { .. })
    ));
}

#[tokio::test]
async fn transfer_requires_known_source_stock() {
    let workshop = setup().await;

    let err = workshop
        .create_transfer(
            "branch-a",
            "branch-b",
            &[TransferLine { part_number: "NO-SUCH-PART".into(), quantity: 1 }],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OpsError::NotFound { .. }));
}

// =============================================================================
// Notifications
// =============================================================================

/// Channel that always fails, for retry accounting tests.
struct DeadChannel;

#[async_trait]
impl NotificationChannel for DeadChannel {
    async fn deliver(&self, _recipient: &str, _body: &str) -> Result<(), String> {
        Err("gateway unreachable".into())
    }
}

#[tokio::test]
async fn transition_queues_notification_and_dispatcher_drains() {
    let workshop = setup().await;
    let job = workshop.create_job(intake_with_phone()).await.unwrap();

    workshop.advance_status(&job.id).await.unwrap();
    assert_eq!(workshop.db().outbox().count_pending().await.unwrap(), 1);

    let (dispatcher, _handle) = NotificationDispatcher::new(
        workshop.db().clone(),
        Arc::new(LogChannel),
        DispatchConfig::default(),
    );
    let delivered = dispatcher.drain_once().await.unwrap();
    assert_eq!(delivered, 1);
    assert_eq!(workshop.db().outbox().count_pending().await.unwrap(), 0);
}

#[tokio::test]
async fn job_without_phone_queues_nothing() {
    let workshop = setup().await;
    let job = workshop
        .create_job(JobIntake {
            customer_id: "cust-002".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    workshop.advance_status(&job.id).await.unwrap();
    assert_eq!(workshop.db().outbox().count_pending().await.unwrap(), 0);
}

#[tokio::test]
async fn failed_delivery_retries_within_bounded_budget() {
    let workshop = setup().await;
    let job = workshop.create_job(intake_with_phone()).await.unwrap();
    workshop.advance_status(&job.id).await.unwrap();

    let (dispatcher, _handle) = NotificationDispatcher::new(
        workshop.db().clone(),
        Arc::new(DeadChannel),
        DispatchConfig {
            max_attempts: 1,
            ..Default::default()
        },
    );

    // First pass fails and records the attempt.
    assert_eq!(dispatcher.drain_once().await.unwrap(), 0);
    let pending = workshop.db().outbox().get_pending(10, 10).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].attempts, 1);
    assert!(pending[0].last_error.as_deref().unwrap().contains("unreachable"));

    // Budget exhausted: the entry is no longer fetched, not retried forever.
    assert_eq!(dispatcher.drain_once().await.unwrap(), 0);
    assert!(workshop.db().outbox().get_pending(10, 1).await.unwrap().is_empty());
    let pending = workshop.db().outbox().get_pending(10, 10).await.unwrap();
    assert_eq!(pending[0].attempts, 1);

    // The failed delivery never failed the transition itself.
    let job = workshop.get_job(&job.id).await.unwrap();
    assert_eq!(job.status, JobStatus::Estimation);
}

/// Channel that fails for one recipient and delivers for everyone else.
struct SelectiveChannel {
    broken_recipient: String,
}

#[async_trait]
impl NotificationChannel for SelectiveChannel {
    async fn deliver(&self, recipient: &str, _body: &str) -> Result<(), String> {
        if recipient == self.broken_recipient {
            Err("gateway unreachable".into())
        } else {
            Ok(())
        }
    }
}

#[tokio::test]
async fn exhausted_entry_does_not_starve_newer_notifications() {
    let workshop = setup().await;
    let outbox = workshop.db().outbox();

    // Older entry to an unreachable recipient, newer one deliverable.
    outbox.enqueue(None, "+15550000000", "older, dead").await.unwrap();
    outbox.enqueue(None, "+15559999999", "newer, fine").await.unwrap();

    let (dispatcher, _handle) = NotificationDispatcher::new(
        workshop.db().clone(),
        Arc::new(SelectiveChannel {
            broken_recipient: "+15550000000".into(),
        }),
        DispatchConfig {
            batch_size: 1,
            max_attempts: 1,
            ..Default::default()
        },
    );

    // First pass burns the dead entry's budget.
    assert_eq!(dispatcher.drain_once().await.unwrap(), 0);

    // With batch_size 1, the dead entry must not keep occupying the
    // head of every batch: the next pass reaches the newer entry.
    assert_eq!(dispatcher.drain_once().await.unwrap(), 1);

    // Only the exhausted entry remains undelivered.
    assert_eq!(workshop.db().outbox().count_pending().await.unwrap(), 1);
    let remaining = workshop.db().outbox().get_pending(10, 10).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].recipient, "+15550000000");
}

// =============================================================================
// SLA Sweep
// =============================================================================

#[tokio::test]
async fn sla_sweep_is_idempotent() {
    let workshop = setup().await;
    let job = workshop.create_job(intake_with_phone()).await.unwrap();

    // Zero-hour window: every open job is immediately overdue.
    let (sweep, _handle) = SlaSweep::new(
        workshop.db().clone(),
        SlaPolicy {
            max_open_hours: 0,
            ..Default::default()
        },
    );

    assert_eq!(sweep.sweep_once().await.unwrap(), 1);
    // Re-run flags nothing new.
    assert_eq!(sweep.sweep_once().await.unwrap(), 0);

    let violations = workshop.db().sla().list_for_job(&job.id).await.unwrap();
    assert_eq!(violations.len(), 1);
}

#[tokio::test]
async fn sla_sweep_ignores_closed_jobs() {
    let workshop = setup().await;
    let job = workshop.create_job(intake_with_phone()).await.unwrap();
    workshop.create_invoice(&job.id).await.unwrap();
    advance_to(&workshop, &job.id, JobStatus::Closed).await;

    let (sweep, _handle) = SlaSweep::new(
        workshop.db().clone(),
        SlaPolicy {
            max_open_hours: 0,
            ..Default::default()
        },
    );

    assert_eq!(sweep.sweep_once().await.unwrap(), 0);
    assert!(workshop.db().sla().list_for_job(&job.id).await.unwrap().is_empty());
}
