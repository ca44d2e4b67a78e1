// Counter stores hold the last issued number per (company prefix, document
// type). An increment is one atomic unit: read-highest, add one and persist
// never span two round trips.

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::MySqlPool;

use crate::core::{AppError, Result};
use crate::modules::sequences::models::SequenceKey;

/// Store capable of atomic per-key increments
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically bump the counter for `key` and return the new value (first call returns 1)
    async fn increment(&self, key: &SequenceKey) -> Result<u64>;

    /// Raise the counter to at least `last_issued`; never lowers it. Returns the resulting value.
    async fn seed(&self, key: &SequenceKey, last_issued: u64) -> Result<u64>;

    /// Last issued value, if the key has ever been used
    async fn current(&self, key: &SequenceKey) -> Result<Option<u64>>;
}

/// Single-process counter store
///
/// Each key is guarded by its own shard lock, so allocations for different
/// keys never wait on each other.
#[derive(Default)]
pub struct InMemoryCounterStore {
    counters: DashMap<SequenceKey, u64>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment(&self, key: &SequenceKey) -> Result<u64> {
        let mut entry = self.counters.entry(key.clone()).or_insert(0);
        let next = entry
            .checked_add(1)
            .ok_or_else(|| AppError::allocation_failure(format!("Sequence {} exhausted", key)))?;
        *entry = next;
        Ok(next)
    }

    async fn seed(&self, key: &SequenceKey, last_issued: u64) -> Result<u64> {
        let mut entry = self.counters.entry(key.clone()).or_insert(0);
        if *entry < last_issued {
            *entry = last_issued;
        }
        Ok(*entry)
    }

    async fn current(&self, key: &SequenceKey) -> Result<Option<u64>> {
        Ok(self.counters.get(key).map(|v| *v))
    }
}

/// MySQL-backed counter store
///
/// The increment runs in one transaction holding a row lock
/// (`SELECT ... FOR UPDATE`), so concurrent requests for the same key are
/// linearised by the database while other keys proceed independently.
pub struct MySqlCounterStore {
    pool: MySqlPool,
}

impl MySqlCounterStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    fn unreachable(key: &SequenceKey, e: sqlx::Error) -> AppError {
        AppError::allocation_failure(format!("Counter store unavailable for {}: {}", key, e))
    }
}

#[async_trait]
impl CounterStore for MySqlCounterStore {
    async fn increment(&self, key: &SequenceKey) -> Result<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Self::unreachable(key, e))?;

        sqlx::query(
            r#"
            INSERT IGNORE INTO document_sequences (company_prefix, document_type, last_issued)
            VALUES (?, ?, 0)
            "#,
        )
        .bind(&key.company_prefix)
        .bind(key.document_type.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| Self::unreachable(key, e))?;

        let (last_issued,): (u64,) = sqlx::query_as(
            r#"
            SELECT last_issued FROM document_sequences
            WHERE company_prefix = ? AND document_type = ?
            FOR UPDATE
            "#,
        )
        .bind(&key.company_prefix)
        .bind(key.document_type.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| Self::unreachable(key, e))?;

        let next = last_issued
            .checked_add(1)
            .ok_or_else(|| AppError::allocation_failure(format!("Sequence {} exhausted", key)))?;

        sqlx::query(
            r#"
            UPDATE document_sequences
            SET last_issued = ?, updated_at = NOW()
            WHERE company_prefix = ? AND document_type = ?
            "#,
        )
        .bind(next)
        .bind(&key.company_prefix)
        .bind(key.document_type.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| Self::unreachable(key, e))?;

        tx.commit().await.map_err(|e| Self::unreachable(key, e))?;

        Ok(next)
    }

    async fn seed(&self, key: &SequenceKey, last_issued: u64) -> Result<u64> {
        sqlx::query(
            r#"
            INSERT INTO document_sequences (company_prefix, document_type, last_issued)
            VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE
                last_issued = GREATEST(last_issued, VALUES(last_issued)),
                updated_at = NOW()
            "#,
        )
        .bind(&key.company_prefix)
        .bind(key.document_type.as_str())
        .bind(last_issued)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::unreachable(key, e))?;

        self.current(key)
            .await?
            .ok_or_else(|| AppError::internal(format!("Seeded sequence {} vanished", key)))
    }

    async fn current(&self, key: &SequenceKey) -> Result<Option<u64>> {
        let row: Option<(u64,)> = sqlx::query_as(
            r#"
            SELECT last_issued FROM document_sequences
            WHERE company_prefix = ? AND document_type = ?
            "#,
        )
        .bind(&key.company_prefix)
        .bind(key.document_type.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Self::unreachable(key, e))?;

        Ok(row.map(|(v,)| v))
    }
}
