//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A ledger that drifts by a cent per posting fails its own core         │
//! │  invariant: balance == sum(credits) - sum(debits).                     │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Every amount in the system is an i64 number of cents.               │
//! │    The database, the billing math, and the ledger all use cents.       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Where Money Flows
//! ```text
//! Job.gross/tax/discount ──► net ──► Invoice totals ──► Ledger posting
//!                             │
//! Payments ──► advance_received ──► balance_due
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: negative values are legal for refunds and for
///   ledger balances that go below zero
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Derives**: full serde support for JSON serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use gearbox_core::money::Money;
    ///
    /// let labour = Money::from_cents(105000); // 1050.00
    /// assert_eq!(labour.cents(), 105000);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Derives a net amount from a gross/tax/discount snapshot.
    ///
    /// ## Invariant
    /// `net = gross + tax - discount`. Every Job and Invoice financial
    /// snapshot is recomputed through this single function so the
    /// derivation can never diverge between the two record types.
    ///
    /// ## Example
    /// ```rust
    /// use gearbox_core::money::Money;
    ///
    /// let net = Money::net_of(
    ///     Money::from_cents(100_000), // gross 1000.00
    ///     Money::from_cents(5_000),   // tax      50.00
    ///     Money::from_cents(0),       // discount  0.00
    /// );
    /// assert_eq!(net.cents(), 105_000);
    /// ```
    #[inline]
    pub const fn net_of(gross: Money, tax: Money, discount: Money) -> Money {
        Money(gross.0 + tax.0 - discount.0)
    }

    /// Derives an outstanding balance from a net total and the advance
    /// received so far.
    ///
    /// ## Invariant
    /// `balance_due = net - advance_received`, recomputed on every
    /// payment write. Never stored independently of its inputs.
    #[inline]
    pub const fn balance_of(net: Money, advance_received: Money) -> Money {
        Money(net.0 - advance_received.0)
    }

    /// Sums an iterator of Money values.
    pub fn sum<I: IntoIterator<Item = Money>>(iter: I) -> Money {
        iter.into_iter().fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for logs and debugging. Receipt formatting lives with the
/// document renderer, not here.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

/// Addition of two Money values.
impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

/// Addition assignment (+=).
impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

/// Subtraction of two Money values.
impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

/// Subtraction assignment (-=).
impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Negation (for opposite-signed correction postings).
impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(105_000);
        assert_eq!(money.cents(), 105_000);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(105_000)), "1050.00");
        assert_eq!(format!("{}", Money::from_cents(500)), "5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(400);

        assert_eq!((a + b).cents(), 1400);
        assert_eq!((a - b).cents(), 600);
        assert_eq!((-a).cents(), -1000);
    }

    #[test]
    fn test_net_derivation() {
        // gross 1000.00 + tax 50.00 - discount 0.00 = net 1050.00
        let net = Money::net_of(
            Money::from_cents(100_000),
            Money::from_cents(5_000),
            Money::zero(),
        );
        assert_eq!(net.cents(), 105_000);

        // discount reduces net
        let net = Money::net_of(
            Money::from_cents(100_000),
            Money::from_cents(5_000),
            Money::from_cents(10_000),
        );
        assert_eq!(net.cents(), 95_000);
    }

    #[test]
    fn test_balance_derivation() {
        // net 1050.00 - advance 400.00 = balance 650.00
        let balance = Money::balance_of(Money::from_cents(105_000), Money::from_cents(40_000));
        assert_eq!(balance.cents(), 65_000);

        // overpayment yields a negative balance (credit owed back)
        let balance = Money::balance_of(Money::from_cents(105_000), Money::from_cents(120_000));
        assert_eq!(balance.cents(), -15_000);
    }

    #[test]
    fn test_sum() {
        let total = Money::sum([
            Money::from_cents(100),
            Money::from_cents(250),
            Money::from_cents(-50),
        ]);
        assert_eq!(total.cents(), 300);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let positive = Money::from_cents(100);
        assert!(positive.is_positive());

        let negative = Money::from_cents(-100);
        assert!(negative.is_negative());
        assert_eq!(negative.abs().cents(), 100);
    }
}
