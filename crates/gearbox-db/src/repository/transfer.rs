//! # Transfer Repository
//!
//! Database operations for branch stock and inter-branch transfers.
//!
//! ## Transition Execution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              execute_transition (single transaction)                    │
//! │                                                                         │
//! │  1. UPDATE stock_transfers SET status = <to>                           │
//! │       WHERE id = ? AND status = <from>                                 │
//! │     ← zero rows = concurrent transition won, everything rolls back     │
//! │                                                                         │
//! │  2. For each movement intent:                                          │
//! │     OUTBOUND (→ in_transit)                                            │
//! │       • source stock row must exist                                    │
//! │       • INSERT stock_movement + quantity -= n                          │
//! │     INBOUND (→ completed)                                              │
//! │       • destination stock row created if absent (metadata snapshot)    │
//! │       • INSERT stock_movement + quantity += n                          │
//! │                                                                         │
//! │  Movement + quantity effect always commit together: an executed        │
//! │  movement row is proof its stock adjustment happened.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use gearbox_core::transfer::MovementIntent;
use gearbox_core::{MovementDirection, StockItem, StockMovement, StockTransfer, TransferItem, TransferStatus};

/// Repository for stock transfer operations.
#[derive(Debug, Clone)]
pub struct TransferRepository {
    pool: SqlitePool,
}

impl TransferRepository {
    /// Creates a new TransferRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransferRepository { pool }
    }

    // =========================================================================
    // Stock Items
    // =========================================================================

    /// Inserts a branch stock record.
    pub async fn insert_stock_item(&self, item: &StockItem) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_items (
                id, branch_id, part_number, name, category,
                unit_cost_cents, quantity, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&item.id)
        .bind(&item.branch_id)
        .bind(&item.part_number)
        .bind(&item.name)
        .bind(&item.category)
        .bind(item.unit_cost_cents)
        .bind(item.quantity)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets the stock record for a part at a branch.
    pub async fn get_stock(&self, branch_id: &str, part_number: &str) -> DbResult<Option<StockItem>> {
        let item = sqlx::query_as::<_, StockItem>(
            r#"
            SELECT id, branch_id, part_number, name, category,
                   unit_cost_cents, quantity, created_at, updated_at
            FROM stock_items
            WHERE branch_id = ?1 AND part_number = ?2
            "#,
        )
        .bind(branch_id)
        .bind(part_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    // =========================================================================
    // Transfers
    // =========================================================================

    /// Creates a transfer header and its line items in one transaction.
    pub async fn create_transfer(
        &self,
        transfer: &StockTransfer,
        items: &[TransferItem],
    ) -> DbResult<()> {
        debug!(
            id = %transfer.id,
            transfer_number = %transfer.transfer_number,
            lines = items.len(),
            "Creating transfer"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO stock_transfers (
                id, transfer_number, source_branch_id, dest_branch_id,
                status, created_at, updated_at, dispatched_at, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&transfer.id)
        .bind(&transfer.transfer_number)
        .bind(&transfer.source_branch_id)
        .bind(&transfer.dest_branch_id)
        .bind(transfer.status)
        .bind(transfer.created_at)
        .bind(transfer.updated_at)
        .bind(transfer.dispatched_at)
        .bind(transfer.completed_at)
        .execute(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO transfer_items (
                    id, transfer_id, part_number, name, category,
                    unit_cost_cents, quantity, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&item.id)
            .bind(&item.transfer_id)
            .bind(&item.part_number)
            .bind(&item.name)
            .bind(&item.category)
            .bind(item.unit_cost_cents)
            .bind(item.quantity)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Gets a transfer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<StockTransfer>> {
        let transfer = sqlx::query_as::<_, StockTransfer>(
            r#"
            SELECT id, transfer_number, source_branch_id, dest_branch_id,
                   status, created_at, updated_at, dispatched_at, completed_at
            FROM stock_transfers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transfer)
    }

    /// Gets all line items of a transfer.
    pub async fn get_items(&self, transfer_id: &str) -> DbResult<Vec<TransferItem>> {
        let items = sqlx::query_as::<_, TransferItem>(
            r#"
            SELECT id, transfer_id, part_number, name, category,
                   unit_cost_cents, quantity, created_at
            FROM transfer_items
            WHERE transfer_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(transfer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    // =========================================================================
    // Transition Execution
    // =========================================================================

    /// Applies a validated status change and materializes its movements.
    ///
    /// The caller has already validated the transition; this method
    /// executes it atomically. A re-save (from == to) skips the stock
    /// work entirely because `movements` is empty.
    pub async fn execute_transition(
        &self,
        transfer: &StockTransfer,
        to: TransferStatus,
        movements: &[MovementIntent],
    ) -> DbResult<()> {
        let now = Utc::now();
        let dispatched_at = (to == TransferStatus::InTransit).then_some(now);
        let completed_at = (to == TransferStatus::Completed).then_some(now);

        debug!(
            id = %transfer.id,
            from = ?transfer.status,
            to = ?to,
            movements = movements.len(),
            "Executing transfer transition"
        );

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE stock_transfers SET
                status = ?3,
                updated_at = ?4,
                dispatched_at = COALESCE(?5, dispatched_at),
                completed_at = COALESCE(?6, completed_at)
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(&transfer.id)
        .bind(transfer.status)
        .bind(to)
        .bind(now)
        .bind(dispatched_at)
        .bind(completed_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::TransactionFailed(format!(
                "transfer {} was not in the expected status",
                transfer.id
            )));
        }

        for intent in movements {
            let stock_id: Option<String> = sqlx::query_scalar(
                "SELECT id FROM stock_items WHERE branch_id = ?1 AND part_number = ?2",
            )
            .bind(&intent.branch_id)
            .bind(&intent.part_number)
            .fetch_optional(&mut *tx)
            .await?;

            let stock_id = match (stock_id, intent.direction) {
                (Some(id), _) => id,
                // Outbound from a branch that never stocked the part:
                // the transfer was created against phantom inventory.
                (None, MovementDirection::Outbound) => {
                    return Err(DbError::not_found(
                        "StockItem",
                        format!("{}/{}", intent.branch_id, intent.part_number),
                    ));
                }
                // Destination record created on demand from the line's
                // metadata snapshot, starting at zero.
                (None, MovementDirection::Inbound) => {
                    let id = Uuid::new_v4().to_string();
                    sqlx::query(
                        r#"
                        INSERT INTO stock_items (
                            id, branch_id, part_number, name, category,
                            unit_cost_cents, quantity, created_at, updated_at
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?7)
                        "#,
                    )
                    .bind(&id)
                    .bind(&intent.branch_id)
                    .bind(&intent.part_number)
                    .bind(&intent.name)
                    .bind(&intent.category)
                    .bind(intent.unit_cost_cents)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;
                    id
                }
            };

            let delta = match intent.direction {
                MovementDirection::Inbound => intent.quantity,
                MovementDirection::Outbound => -intent.quantity,
            };

            sqlx::query(
                r#"
                UPDATE stock_items SET
                    quantity = quantity + ?2,
                    updated_at = ?3
                WHERE id = ?1
                "#,
            )
            .bind(&stock_id)
            .bind(delta)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO stock_movements (
                    id, stock_item_id, branch_id, transfer_id,
                    direction, quantity, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&stock_id)
            .bind(&intent.branch_id)
            .bind(&transfer.id)
            .bind(intent.direction)
            .bind(intent.quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Gets the movements synthesized for a transfer, oldest first.
    pub async fn list_movements(&self, transfer_id: &str) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, stock_item_id, branch_id, transfer_id,
                   direction, quantity, created_at
            FROM stock_movements
            WHERE transfer_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(transfer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }
}
