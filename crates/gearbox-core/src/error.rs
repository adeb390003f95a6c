//! # Error Types
//!
//! Domain-specific error types for gearbox-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  gearbox-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  gearbox-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  gearbox-ops errors (service layer)                                    │
//! │  └── OpsError         - What callers see (wraps both)                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → OpsError → Caller                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (job number, status, ...)
//! 3. Errors are enum variants, never String
//! 4. Every error here is recoverable per-operation; none are fatal

use thiserror::Error;

use crate::types::{JobStatus, TransferStatus};

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations: a transition that the
/// state machine forbids, a duplicate billing document, or an attempt to
/// rewrite history in the append-only ledger.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The job is in its terminal state (or an unknown position) and has
    /// no permitted next state.
    ///
    /// ## When This Occurs
    /// - `advance` called on a job already in `CLOSED`
    #[error("Job {job_number} cannot advance further from {status:?}")]
    CannotAdvance {
        job_number: String,
        status: JobStatus,
    },

    /// A transition guard rejected the operation.
    ///
    /// ## When This Occurs
    /// - Leaving `INVOICING` for `DELIVERY` with no invoice on the job
    /// - Editing the financial estimate outside `ESTIMATION`
    /// - An invalid transfer status change (e.g. completed → pending)
    #[error("Guard violation on job {job_number}: {reason}")]
    GuardViolation { job_number: String, reason: String },

    /// A second invoice was requested for a job that already owns one.
    ///
    /// Invoice ownership is exclusive: the caller must fail, never
    /// silently update the existing document.
    #[error("Job {job_number} already has invoice {invoice_number}")]
    DuplicateInvoice {
        job_number: String,
        invoice_number: String,
    },

    /// Attempted mutation or deletion of an append-only record.
    ///
    /// ## When This Occurs
    /// - `delete_transaction` on any posted ledger transaction
    ///
    /// Corrections are made by posting a new, opposite-signed transaction,
    /// never by rewriting history.
    #[error("Ledger is append-only: transaction {id} cannot be {operation}")]
    AppendOnlyLedger { id: String, operation: String },

    /// An invalid transfer status change was requested.
    #[error("Transfer {transfer_number}: cannot move from {from:?} to {to:?}")]
    InvalidTransferTransition {
        transfer_number: String,
        from: TransferStatus,
        to: TransferStatus,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    ///
    /// Applies to payment amounts and ledger posting amounts; the sign of
    /// a ledger entry is carried by its direction, never by the amount.
    #[error("{field} must be positive, got {value}")]
    MustBePositive { field: String, value: i64 },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., unknown status string).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::CannotAdvance {
            job_number: "JOB-20260825-0001".to_string(),
            status: JobStatus::Closed,
        };
        assert_eq!(
            err.to_string(),
            "Job JOB-20260825-0001 cannot advance further from Closed"
        );

        let err = CoreError::AppendOnlyLedger {
            id: "txn-1".to_string(),
            operation: "deleted".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Ledger is append-only: transaction txn-1 cannot be deleted"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::MustBePositive {
            field: "amount_cents".to_string(),
            value: -50,
        };
        assert_eq!(err.to_string(), "amount_cents must be positive, got -50");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "customer_id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
