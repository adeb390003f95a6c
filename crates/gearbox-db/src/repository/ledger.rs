//! # Ledger Repository
//!
//! Database operations for accounts and the append-only transaction log.
//!
//! ## The Append-Only Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Ledger Writes                                     │
//! │                                                                         │
//! │  post(txn)   [single transaction]                                      │
//! │    1. UPDATE accounts SET balance += signed(amount)                    │
//! │    2. INSERT INTO transactions (permanent row)                         │
//! │                                                                         │
//! │  There is NO update_transaction and NO delete_transaction here.        │
//! │  The command layer rejects deletion attempts; this module simply       │
//! │  contains no SQL that could mutate a posted row.                       │
//! │                                                                         │
//! │  Invariant: accounts.balance == sum(credits) - sum(debits)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use gearbox_core::{Account, Transaction};

/// Repository for ledger operations.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Inserts an account.
    pub async fn insert_account(&self, account: &Account) -> DbResult<()> {
        debug!(id = %account.id, code = %account.code, "Inserting account");

        sqlx::query(
            r#"
            INSERT INTO accounts (
                id, code, name, category, balance_cents, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&account.id)
        .bind(&account.code)
        .bind(&account.name)
        .bind(account.category)
        .bind(account.balance_cents)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets an account by ID.
    pub async fn get_account(&self, id: &str) -> DbResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, code, name, category, balance_cents, created_at, updated_at
            FROM accounts
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// Gets an account by its business code (e.g. "4000-SALES").
    pub async fn get_account_by_code(&self, code: &str) -> DbResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, code, name, category, balance_cents, created_at, updated_at
            FROM accounts
            WHERE code = ?1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    // =========================================================================
    // Transactions (append-only)
    // =========================================================================

    /// Posts a transaction: inserts the permanent row and applies its
    /// balance effect, in one database transaction.
    ///
    /// The balance delta is applied with `balance = balance + ?`, never
    /// read-modify-write, so concurrent postings to the same account
    /// serialize correctly.
    pub async fn post(&self, txn: &Transaction) -> DbResult<()> {
        let now = Utc::now();
        let delta = txn.direction.signed(txn.amount()).cents();

        debug!(
            id = %txn.id,
            account_id = %txn.account_id,
            delta = %delta,
            "Posting ledger transaction"
        );

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                balance_cents = balance_cents + ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(&txn.account_id)
        .bind(delta)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Account", &txn.account_id));
        }

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, account_id, direction, amount_cents,
                description, invoice_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&txn.id)
        .bind(&txn.account_id)
        .bind(txn.direction)
        .bind(txn.amount_cents)
        .bind(&txn.description)
        .bind(&txn.invoice_id)
        .bind(txn.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Gets a transaction by ID.
    pub async fn get_transaction(&self, id: &str) -> DbResult<Option<Transaction>> {
        let txn = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, account_id, direction, amount_cents,
                   description, invoice_id, created_at
            FROM transactions
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(txn)
    }

    /// Gets the full posting history of an account, oldest first.
    ///
    /// Replaying this history must reproduce the cached balance; tests
    /// check the invariant through `gearbox_core::ledger::replay`.
    pub async fn list_transactions(&self, account_id: &str) -> DbResult<Vec<Transaction>> {
        let txns = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, account_id, direction, amount_cents,
                   description, invoice_id, created_at
            FROM transactions
            WHERE account_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(txns)
    }
}
