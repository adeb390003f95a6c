//! # Ledger Module
//!
//! Pure posting rules for the append-only Account/Transaction store.
//!
//! ## Append-Only Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        The Ledger Contract                              │
//! │                                                                         │
//! │  post(account, amount, direction)                                      │
//! │    ├── INSERT one permanent Transaction row                            │
//! │    └── balance += amount (credit) / balance -= amount (debit)          │
//! │        exactly once, at creation, in the same database transaction    │
//! │                                                                         │
//! │  UPDATE / DELETE a posted Transaction ──► AppendOnlyLedger error       │
//! │                                                                         │
//! │  There is no void/reverse primitive. Correcting an error means         │
//! │  posting a new, opposite-signed Transaction.                           │
//! │                                                                         │
//! │  Invariant: balance == sum(credits) - sum(debits) over history         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};

use crate::error::CoreResult;
use crate::money::Money;
use crate::types::{EntryDirection, Transaction};
use crate::validation::validate_amount;

// =============================================================================
// Balance Application
// =============================================================================

impl EntryDirection {
    /// The signed effect of an entry on its account balance.
    ///
    /// Credits add, debits subtract. The amount itself is always
    /// positive; sign lives here and nowhere else.
    #[inline]
    pub const fn signed(self, amount: Money) -> Money {
        match self {
            EntryDirection::Credit => amount,
            EntryDirection::Debit => Money::from_cents(-amount.cents()),
        }
    }
}

/// Applies one entry to a running balance.
#[inline]
pub fn apply(balance: Money, direction: EntryDirection, amount: Money) -> Money {
    balance + direction.signed(amount)
}

/// Replays a transaction history over an initial balance.
///
/// Reference definition of the account invariant
/// `balance == initial + sum(credits) - sum(debits)`; the repository
/// maintains the cached balance incrementally, tests check it against
/// this replay.
pub fn replay(initial: Money, history: &[Transaction]) -> Money {
    history
        .iter()
        .fold(initial, |bal, txn| apply(bal, txn.direction, txn.amount()))
}

// =============================================================================
// Posting
// =============================================================================

/// Builds the transaction row for a posting, after validating the amount.
///
/// Pure: the caller inserts the row and applies the balance delta
/// atomically. Posting amounts are strictly positive; direction carries
/// the sign.
pub fn posting(
    id: String,
    account_id: String,
    amount: Money,
    direction: EntryDirection,
    description: String,
    invoice_id: Option<String>,
    now: DateTime<Utc>,
) -> CoreResult<Transaction> {
    validate_amount("amount_cents", amount)?;

    Ok(Transaction {
        id,
        account_id,
        direction,
        amount_cents: amount.cents(),
        description,
        invoice_id,
        created_at: now,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn txn(direction: EntryDirection, amount: i64) -> Transaction {
        Transaction {
            id: "t".into(),
            account_id: "a".into(),
            direction,
            amount_cents: amount,
            description: "test".into(),
            invoice_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_signed_effect() {
        let amount = Money::from_cents(1000);
        assert_eq!(EntryDirection::Credit.signed(amount).cents(), 1000);
        assert_eq!(EntryDirection::Debit.signed(amount).cents(), -1000);
    }

    #[test]
    fn test_apply() {
        let balance = Money::from_cents(5000);
        assert_eq!(
            apply(balance, EntryDirection::Credit, Money::from_cents(1000)).cents(),
            6000
        );
        assert_eq!(
            apply(balance, EntryDirection::Debit, Money::from_cents(1000)).cents(),
            4000
        );
    }

    #[test]
    fn test_replay_matches_invariant() {
        // balance == initial + sum(credits) - sum(debits)
        let history = vec![
            txn(EntryDirection::Credit, 105_000),
            txn(EntryDirection::Debit, 20_000),
            txn(EntryDirection::Credit, 5_000),
            txn(EntryDirection::Debit, 1_000),
        ];
        let replayed = replay(Money::from_cents(10_000), &history);
        assert_eq!(replayed.cents(), 10_000 + 105_000 - 20_000 + 5_000 - 1_000);
    }

    #[test]
    fn test_posting_builds_row() {
        let txn = posting(
            "t1".into(),
            "a1".into(),
            Money::from_cents(105_000),
            EntryDirection::Credit,
            "Sales revenue for invoice INV-1".into(),
            Some("i1".into()),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(txn.amount_cents, 105_000);
        assert_eq!(txn.direction, EntryDirection::Credit);
        assert_eq!(txn.invoice_id.as_deref(), Some("i1"));
    }

    #[test]
    fn test_posting_rejects_non_positive() {
        assert!(posting(
            "t1".into(),
            "a1".into(),
            Money::zero(),
            EntryDirection::Credit,
            "zero".into(),
            None,
            Utc::now(),
        )
        .is_err());

        assert!(posting(
            "t1".into(),
            "a1".into(),
            Money::from_cents(-500),
            EntryDirection::Debit,
            "negative".into(),
            None,
            Utc::now(),
        )
        .is_err());
    }

    #[test]
    fn test_correction_is_opposite_posting() {
        // No reversal primitive: a mistaken credit is corrected by a
        // debit of the same amount, leaving the balance unchanged.
        let start = Money::from_cents(1_000);
        let mistaken = apply(start, EntryDirection::Credit, Money::from_cents(999));
        let corrected = apply(mistaken, EntryDirection::Debit, Money::from_cents(999));
        assert_eq!(corrected, start);
    }
}
