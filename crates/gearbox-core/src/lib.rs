//! # gearbox-core: Pure Business Logic for Gearbox ERP
//!
//! This crate is the **heart** of the job lifecycle subsystem. It contains
//! all business rules as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Gearbox ERP Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  gearbox-ops (Command Layer)                    │   │
//! │  │   advance_status, create_invoice, record_payment, post, ...     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ gearbox-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │ lifecycle │  │  billing  │  │  ledger   │  │ transfer  │  │   │
//! │  │   │ 8 states  │  │ invoices  │  │ postings  │  │ movements │  │   │
//! │  │   │ + guards  │  │ payments  │  │ balances  │  │ + guards  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                   gearbox-db (Database Layer)                   │   │
//! │  │             SQLite queries, migrations, repositories            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Job, Invoice, Payment, Account, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`lifecycle`] - The 8-state job lifecycle state machine
//! - [`billing`] - Invoice snapshots and payment aggregate math
//! - [`ledger`] - Append-only posting rules and balance application
//! - [`transfer`] - Inter-branch stock transfer state machine
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every operation is (current state, input) →
//!    (outcome, list of side-effect intents). Persistence and effect
//!    execution happen in the caller, after validation succeeds.
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64)
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod billing;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod money;
pub mod transfer;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use gearbox_core::Money` instead of
// `use gearbox_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Account code of the fixed revenue account credited when an invoice is
/// marked paid.
///
/// ## Why a constant?
/// The paid transition always books against the same "Sales Revenue"
/// bucket; per-service revenue accounts can replace this when the chart
/// of accounts grows configurable.
pub const SALES_REVENUE_ACCOUNT_CODE: &str = "4000-SALES";

/// The SLA rule name written by the maximum-resolution-time sweep.
///
/// One violation row may exist per (job, rule) pair; keeping the rule
/// name in one place keeps the sweep idempotent across code paths.
pub const SLA_RULE_MAX_RESOLUTION: &str = "max_resolution_time";
