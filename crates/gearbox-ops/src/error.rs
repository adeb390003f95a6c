//! # Operation Error Types
//!
//! The single error surface callers of the command layer see.
//!
//! ## Error Flow
//! ```text
//! CoreError (business rule)  ──┐
//! DbError   (persistence)    ──┼──► OpsError ──► caller
//! NotFound  (missing entity) ──┘
//! ```

use thiserror::Error;

use gearbox_core::CoreError;
use gearbox_db::DbError;

/// Errors returned by workshop operations.
#[derive(Debug, Error)]
pub enum OpsError {
    /// A business rule rejected the operation (guard violation, duplicate
    /// invoice, append-only ledger, invalid transfer transition, ...).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The database layer failed.
    #[error(transparent)]
    Db(#[from] DbError),

    /// The entity addressed by the operation does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },
}

impl OpsError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        OpsError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

/// Result type for workshop operations.
pub type OpsResult<T> = Result<T, OpsError>;
