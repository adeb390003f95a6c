//! # gearbox-db: Database Layer
//!
//! SQLite persistence for the Gearbox workshop ERP.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         gearbox-db                                      │
//! │                                                                         │
//! │  ┌──────────────┐     ┌──────────────────────────────────────┐         │
//! │  │   Database   │────►│           Repositories               │         │
//! │  │  (SqlitePool)│     │  jobs / billing / ledger / transfers │         │
//! │  └──────┬───────┘     │  outbox / sla                        │         │
//! │         │             └──────────────────────────────────────┘         │
//! │         ▼                                                               │
//! │  ┌──────────────┐                                                       │
//! │  │  Migrations  │  Embedded SQL, applied on connect                     │
//! │  └──────────────┘                                                       │
//! │                                                                         │
//! │  Writes that must be atomic (payment + aggregates, posting + balance,  │
//! │  transfer status + movements) run inside a single SQL transaction.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// Re-export commonly used types
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::billing::BillingRepository;
pub use repository::job::JobRepository;
pub use repository::ledger::LedgerRepository;
pub use repository::outbox::NotificationOutboxRepository;
pub use repository::sequence::SequenceRepository;
pub use repository::sla::SlaRepository;
pub use repository::transfer::TransferRepository;
