//! # Document Sequence Repository
//!
//! Per-day counters for business document numbers.
//!
//! Every document number column (`job_number`, `invoice_number`,
//! `slip_number`, `transfer_number`) carries a UNIQUE constraint, so the
//! sequence must survive process restarts: an in-process counter would
//! restart at zero and collide with rows written by the previous run.
//! The counter row is bumped with a single conflict-upsert, so concurrent
//! allocations of the same (prefix, day) serialize and never hand out the
//! same value twice.

use sqlx::SqlitePool;

use crate::error::DbResult;

/// Repository for document number sequences.
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    pool: SqlitePool,
}

impl SequenceRepository {
    /// Creates a new SequenceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SequenceRepository { pool }
    }

    /// Allocates the next sequence value for (prefix, day), starting at 1.
    ///
    /// The bump and the read happen in one statement; two callers racing
    /// on the same pair get distinct values.
    pub async fn next(&self, prefix: &str, day: &str) -> DbResult<i64> {
        let seq: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO document_sequences (prefix, day, next_seq)
            VALUES (?1, ?2, 1)
            ON CONFLICT (prefix, day) DO UPDATE SET next_seq = next_seq + 1
            RETURNING next_seq
            "#,
        )
        .bind(prefix)
        .bind(day)
        .fetch_one(&self.pool)
        .await?;

        Ok(seq)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_sequence_increments_per_pair() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert_eq!(db.sequences().next("JOB", "20260825").await.unwrap(), 1);
        assert_eq!(db.sequences().next("JOB", "20260825").await.unwrap(), 2);

        // Other prefixes and other days count independently.
        assert_eq!(db.sequences().next("INV", "20260825").await.unwrap(), 1);
        assert_eq!(db.sequences().next("JOB", "20260826").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sequence_is_stored_not_process_local() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        db.sequences().next("SLIP", "20260825").await.unwrap();

        // A fresh repository over the same database continues the count,
        // the way a restarted process would.
        let repo = super::SequenceRepository::new(db.pool().clone());
        assert_eq!(repo.next("SLIP", "20260825").await.unwrap(), 2);
    }
}
