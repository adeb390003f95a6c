//! # gearbox-ops: Command Layer
//!
//! The operation surface of the Gearbox job lifecycle subsystem.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         gearbox-ops                                     │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Workshop (workshop.rs)                       │   │
//! │  │                                                                 │   │
//! │  │  create_job      update_estimate    advance_status              │   │
//! │  │  append_note     create_invoice     record_payment              │   │
//! │  │  mark_invoice_paid    post_transaction    delete_transaction    │   │
//! │  │  create_transfer      transition_transfer                       │   │
//! │  │                                                                 │   │
//! │  │  Each op: validate (gearbox-core) → persist (gearbox-db)        │   │
//! │  │           → execute side-effect intents                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌──────────────────────────┐   ┌──────────────────────────────────┐  │
//! │  │  Dispatcher (dispatch.rs)│   │       SLA Sweep (sweep.rs)       │  │
//! │  │  drains the notification │   │  flags jobs open past the policy │  │
//! │  │  outbox, bounded retries │   │  window, idempotently            │  │
//! │  └──────────────────────────┘   └──────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod dispatch;
pub mod error;
pub mod sweep;
pub mod workshop;

// Re-export commonly used types
pub use dispatch::{
    DispatchConfig, DispatcherHandle, LogChannel, NotificationChannel, NotificationDispatcher,
};
pub use error::{OpsError, OpsResult};
pub use sweep::{SlaPolicy, SlaSweep, SlaSweepHandle};
pub use workshop::{JobIntake, TransferLine, Workshop};
