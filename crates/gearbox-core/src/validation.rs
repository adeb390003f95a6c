//! # Validation Module
//!
//! Input validation utilities for Gearbox ERP.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Command layer (gearbox-ops)                                  │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: business rule validation, before any write           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  ├── UNIQUE constraints (job_number, invoice job_id, ...)              │
//! │  └── Foreign key constraints                                           │
//! │                                                                         │
//! │  Defense in depth: multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required identifier field (customer id, branch id, ...).
///
/// ## Rules
/// - Must not be empty after trimming
/// - Must be at most 64 characters
pub fn validate_identifier(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > 64 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 64,
        });
    }

    Ok(())
}

/// Validates a free-text field (description, note).
///
/// ## Rules
/// - Must not be empty after trimming
/// - Must be at most 1000 characters
pub fn validate_text(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > 1000 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 1000,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates that a monetary amount is strictly positive.
///
/// Payments and ledger postings carry positive amounts only; sign lives
/// in the payment kind or the entry direction.
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
            value: amount.cents(),
        });
    }
    Ok(())
}

/// Validates that a financial snapshot component is non-negative.
///
/// Gross, tax and discount are magnitudes; only derived values (balance
/// after overpayment) may legitimately go negative.
pub fn validate_non_negative(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
            value: cents,
        });
    }
    Ok(())
}

/// Validates a stock quantity on a transfer line.
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
            value: quantity,
        });
    }

    // Guard against fat-fingered entry (10000 instead of 100).
    if quantity > 100_000 {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: 100_000,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
