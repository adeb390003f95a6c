//! # Domain Types
//!
//! Core domain types used throughout Gearbox ERP.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Job        │   │    Invoice      │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │1:1│  id (UUID)      │   │  id (UUID)      │       │
//! │  │  job_number     ├───┤  invoice_number │   │  slip_number    │       │
//! │  │  status (8)     │   │  status         │1:n│  kind / method  │       │
//! │  │  net_cents      │   │  ledger_txn_id  ├───┤  amount_cents   │       │
//! │  └─────────────────┘   └────────┬────────┘   └─────────────────┘       │
//! │                                 │                                       │
//! │  ┌─────────────────┐   ┌────────▼────────┐   ┌─────────────────┐       │
//! │  │    Account      │1:n│   Transaction   │   │  StockTransfer  │       │
//! │  │  ─────────────  ├───┤  ─────────────  │   │  ─────────────  │       │
//! │  │  code, category │   │  direction      │   │  status (4)     │       │
//! │  │  balance_cents  │   │  amount_cents   │   │  + movements    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (job_number, invoice_number, slip_number, account code)
//!   - human-readable, shown on documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Job Status
// =============================================================================

/// The position of a job in its fixed forward lifecycle.
///
/// Stored in the database as the literal SCREAMING_SNAKE_CASE strings
/// (`RECEPTION`, ..., `CLOSED`); the declaration order below IS the
/// required forward order and doubles as the progress index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Vehicle checked in at the front desk. The only initial state.
    Reception,
    /// Estimate being prepared; the one stage where financial fields
    /// are directly editable.
    Estimation,
    /// Approved estimate assigned to a technician.
    WorkAssignment,
    /// Work underway in the bay.
    WorkInProgress,
    /// Post-work inspection.
    QualityControl,
    /// Billing document being raised.
    Invoicing,
    /// Vehicle handover to the customer.
    Delivery,
    /// Job finished. The only terminal state; afterwards mutation is
    /// additive (notes) only.
    Closed,
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Reception
    }
}

// =============================================================================
// Job
// =============================================================================

/// One vehicle service order, tracked end-to-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Job {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business identifier shown on documents (JOB-YYYYMMDD-NNNN).
    pub job_number: String,

    /// Opaque customer id owned by the CRM module.
    pub customer_id: String,

    /// Customer's phone - the notification recipient.
    pub customer_phone: Option<String>,

    /// Free-text vehicle description (registration, model).
    pub vehicle: Option<String>,

    /// Opaque service advisor id owned by the HR module.
    pub advisor_id: Option<String>,

    /// Opaque branch id owned by the branch module.
    pub branch_id: Option<String>,

    /// Lifecycle position.
    pub status: JobStatus,

    /// Gross amount in cents.
    pub gross_cents: i64,

    /// Tax amount in cents.
    pub tax_cents: i64,

    /// Discount amount in cents.
    pub discount_cents: i64,

    /// Net amount: gross + tax - discount.
    pub net_cents: i64,

    /// Sum of advance/partial payments received so far.
    pub advance_received_cents: i64,

    /// Outstanding balance: net - advance_received.
    pub balance_due_cents: i64,

    /// Originating lead, for conversion tracking.
    pub lead_id: Option<String>,

    /// Originating booking, for conversion tracking.
    pub booking_id: Option<String>,

    /// Free-text notes. The only field still writable after CLOSED.
    pub notes: Option<String>,

    /// Start of the SLA clock (falls back to created_at when None).
    pub sla_started_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Returns the net amount as Money.
    #[inline]
    pub fn net(&self) -> Money {
        Money::from_cents(self.net_cents)
    }

    /// Returns the advance received as Money.
    #[inline]
    pub fn advance_received(&self) -> Money {
        Money::from_cents(self.advance_received_cents)
    }

    /// Returns the outstanding balance as Money.
    #[inline]
    pub fn balance_due(&self) -> Money {
        Money::from_cents(self.balance_due_cents)
    }

    /// The instant the SLA clock started for this job.
    #[inline]
    pub fn sla_clock_start(&self) -> DateTime<Utc> {
        self.sla_started_at.unwrap_or(self.created_at)
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// Payment status of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Raised, awaiting settlement.
    Pending,
    /// Settled; the revenue posting exists.
    Paid,
    /// Withdrawn before settlement.
    Cancelled,
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Pending
    }
}

/// A billing document snapshotted from a job.
///
/// At most one invoice may exist per job; `job_id` is nullable so the
/// document survives deletion of its job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Invoice {
    pub id: String,
    /// Business identifier (INV-YYYYMMDD-NNNN).
    pub invoice_number: String,
    /// Owning job; None once the job has been deleted.
    pub job_id: Option<String>,
    pub gross_cents: i64,
    pub tax_cents: i64,
    /// Net total: gross + tax - discount at snapshot time.
    pub net_cents: i64,
    pub advance_paid_cents: i64,
    /// Outstanding: net - advance_paid, recomputed on every write.
    pub balance_due_cents: i64,
    pub status: InvoiceStatus,
    /// The revenue posting created by the first transition into Paid.
    /// Set exactly once; its presence short-circuits retries.
    pub ledger_txn_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Returns the net total as Money.
    #[inline]
    pub fn net(&self) -> Money {
        Money::from_cents(self.net_cents)
    }

    /// True once the paid transition has posted revenue.
    ///
    /// Checked against the ledger link, not the status alone, so a
    /// retried transition can short-circuit even if the status write
    /// and the posting were observed separately.
    #[inline]
    pub fn is_posted(&self) -> bool {
        self.ledger_txn_id.is_some()
    }
}

// =============================================================================
// Payment
// =============================================================================

/// What a payment represents within the job's settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    /// Up-front deposit taken before or during the work.
    Advance,
    /// Instalment against the outstanding balance.
    Partial,
    /// Settlement at handover.
    Final,
    /// Money returned to the customer.
    Refund,
}

impl PaymentKind {
    /// Whether this kind counts towards the job's `advance_received`
    /// aggregate. Only advance and partial receipts do; final and refund
    /// payments settle or reverse, they do not accumulate.
    #[inline]
    pub const fn counts_as_advance(self) -> bool {
        matches!(self, PaymentKind::Advance | PaymentKind::Partial)
    }
}

/// How the money arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    Online,
}

/// A receipt applied against a job (and optionally its invoice).
///
/// Immutable after creation: no edit or delete operation is defined.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: String,
    /// Business identifier (SLIP-YYYYMMDD-NNNN).
    pub slip_number: String,
    pub job_id: String,
    pub invoice_id: Option<String>,
    pub kind: PaymentKind,
    pub method: PaymentMethod,
    pub amount_cents: i64,
    pub received_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Returns the payment amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Ledger: Account & Transaction
// =============================================================================

/// Accounting category of a ledger bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum AccountCategory {
    Asset,
    Liability,
    Revenue,
    Expense,
    Equity,
}

/// A named ledger bucket with a cached running balance.
///
/// Invariant: `balance == sum(credits) - sum(debits)` over all
/// transactions ever posted, given the append-only rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Account {
    pub id: String,
    /// Business code (e.g. "4000-SALES").
    pub code: String,
    pub name: String,
    pub category: AccountCategory,
    pub balance_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Returns the cached balance as Money.
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }
}

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum EntryDirection {
    /// Subtracts from the account balance.
    Debit,
    /// Adds to the account balance.
    Credit,
}

/// A single signed ledger entry against one account.
///
/// Append-only: created once, never updated or deleted. The account
/// balance is adjusted exactly once, at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Transaction {
    pub id: String,
    pub account_id: String,
    pub direction: EntryDirection,
    /// Always positive; the sign lives in `direction`.
    pub amount_cents: i64,
    pub description: String,
    /// Back-link from a revenue posting to its invoice (the
    /// mark-invoice-paid idempotency chain).
    pub invoice_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Returns the amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Stock: Item, Transfer, Movement
// =============================================================================

/// Per-branch stock record for one part.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockItem {
    pub id: String,
    pub branch_id: String,
    pub part_number: String,
    pub name: String,
    pub category: Option<String>,
    pub unit_cost_cents: i64,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Status of an inter-branch stock transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    /// Created, goods not yet dispatched.
    Pending,
    /// Dispatched; source stock already decremented.
    InTransit,
    /// Received; destination stock incremented.
    Completed,
    /// Abandoned before completion.
    Cancelled,
}

/// A stock transfer between two branch inventories.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockTransfer {
    pub id: String,
    /// Business identifier (TRF-YYYYMMDD-NNNN).
    pub transfer_number: String,
    pub source_branch_id: String,
    pub dest_branch_id: String,
    pub status: TransferStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A line item on a transfer. Snapshots part metadata so the destination
/// stock record can be created even if the source row changes later.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TransferItem {
    pub id: String,
    pub transfer_id: String,
    pub part_number: String,
    pub name: String,
    pub category: Option<String>,
    pub unit_cost_cents: i64,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

/// Direction of a synthesized stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum MovementDirection {
    /// Into the branch (destination side of a transfer).
    Inbound,
    /// Out of the branch (source side of a transfer).
    Outbound,
}

/// A pre-approved stock movement: its quantity effect is applied to the
/// stock record in the same database transaction that creates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    pub id: String,
    pub stock_item_id: String,
    pub branch_id: String,
    pub transfer_id: Option<String>,
    pub direction: MovementDirection,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Workshop Diary (external collaborator shadow)
// =============================================================================

/// A workshop diary row. The diary belongs to an external module; only
/// its completion trigger matters to this subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DiaryEntry {
    pub id: String,
    pub job_id: String,
    pub entry: String,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Notification Outbox
// =============================================================================

/// An entry in the notification outbox queue.
///
/// Written in the same logical operation as the transition that triggered
/// it; drained asynchronously by the dispatcher with bounded retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct NotificationOutboxEntry {
    pub id: String,
    pub job_id: Option<String>,
    /// Customer phone number.
    pub recipient: String,
    /// Message text from the per-state template.
    pub body: String,
    /// Number of delivery attempts so far.
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub attempted_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
}

// =============================================================================
// SLA Violation
// =============================================================================

/// A breach record created by the periodic SLA sweep.
///
/// At most one row per (job, rule) pair; the sweep is idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SlaViolation {
    pub id: String,
    pub job_id: String,
    pub rule: String,
    pub detected_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_default() {
        assert_eq!(JobStatus::default(), JobStatus::Reception);
    }

    #[test]
    fn test_job_status_serde_strings() {
        // The wire/database representation is the literal state string.
        let s = serde_json::to_string(&JobStatus::WorkInProgress).unwrap();
        assert_eq!(s, "\"WORK_IN_PROGRESS\"");
        let back: JobStatus = serde_json::from_str("\"QUALITY_CONTROL\"").unwrap();
        assert_eq!(back, JobStatus::QualityControl);
    }

    #[test]
    fn test_payment_kind_aggregation_rule() {
        assert!(PaymentKind::Advance.counts_as_advance());
        assert!(PaymentKind::Partial.counts_as_advance());
        assert!(!PaymentKind::Final.counts_as_advance());
        assert!(!PaymentKind::Refund.counts_as_advance());
    }

    #[test]
    fn test_invoice_posted_check() {
        let invoice = Invoice {
            id: "i1".into(),
            invoice_number: "INV-20260825-0001".into(),
            job_id: Some("j1".into()),
            gross_cents: 100_000,
            tax_cents: 5_000,
            net_cents: 105_000,
            advance_paid_cents: 0,
            balance_due_cents: 105_000,
            status: InvoiceStatus::Pending,
            ledger_txn_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(!invoice.is_posted());

        let posted = Invoice {
            ledger_txn_id: Some("txn-1".into()),
            ..invoice
        };
        assert!(posted.is_posted());
    }

    #[test]
    fn test_sla_clock_fallback() {
        let now = Utc::now();
        let job = Job {
            id: "j1".into(),
            job_number: "JOB-20260825-0001".into(),
            customer_id: "c1".into(),
            customer_phone: None,
            vehicle: None,
            advisor_id: None,
            branch_id: None,
            status: JobStatus::Reception,
            gross_cents: 0,
            tax_cents: 0,
            discount_cents: 0,
            net_cents: 0,
            advance_received_cents: 0,
            balance_due_cents: 0,
            lead_id: None,
            booking_id: None,
            notes: None,
            sla_started_at: None,
            created_at: now,
            updated_at: now,
            closed_at: None,
        };
        assert_eq!(job.sla_clock_start(), now);
    }
}
