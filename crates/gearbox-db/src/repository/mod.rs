//! # Repository Pattern
//!
//! Data access layer using the repository pattern.
//!
//! ## Design
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Repository Pattern                                 │
//! │                                                                         │
//! │  Command Layer (gearbox-ops)                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Repository (this module) ← SQL lives here, nowhere else               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SqlitePool ← Shared connection pool                                   │
//! │                                                                         │
//! │  Each repository owns the tables of one aggregate:                     │
//! │  • JobRepository      → jobs (+ status-coupled outbox writes)          │
//! │  • BillingRepository  → invoices, payments, workshop_diary             │
//! │  • LedgerRepository   → accounts, transactions (append-only)           │
//! │  • TransferRepository → stock_items, stock_transfers, movements        │
//! │  • NotificationOutboxRepository → notification_outbox                  │
//! │  • SlaRepository      → sla_violations                                 │
//! │  • SequenceRepository → document_sequences                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod billing;
pub mod job;
pub mod ledger;
pub mod outbox;
pub mod sequence;
pub mod sla;
pub mod transfer;
