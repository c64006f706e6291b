//! Persistence for tracked protocols and collected transactions.
//!
//! Two tables back the collector:
//! - `tracked_protocols(public_key, watershed_block, last_block_collected)`
//! - `raw_transactions(signature, source, slot, block_time, payload, stream)`,
//!   unique on `(signature, source)`.
//!
//! [`PgStorage`] is the production backend. [`MemoryStorage`] keeps the same
//! contract in process memory.

pub mod memory;

use crate::types::records::{RawTransactionRecord, TrackedProtocol};
use crate::utils::error::{CollectorError, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub use memory::MemoryStorage;

/// Abstract interface for storage operations.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Creates tables and indices if they are missing.
    async fn initialize(&self) -> Result<()>;

    /// Tracked rows for the given keys. Keys without a row are omitted.
    async fn tracked_protocols(&self, public_keys: &[String]) -> Result<Vec<TrackedProtocol>>;

    /// Inserts a protocol row unless one exists. Returns whether a row was added.
    async fn register_protocol(&self, public_key: &str, watershed_block: u64) -> Result<bool>;

    /// Smallest distinct slots among rows whose payload is still null.
    async fn pending_slots(&self, limit: usize, offset: u64) -> Result<Vec<u64>>;

    /// Upserts every record by `(signature, source)` in one transaction.
    ///
    /// An existing row only has its payload replaced. Returns the number of records applied.
    async fn upsert_transactions(&self, records: &[RawTransactionRecord]) -> Result<usize>;

    /// Raises `last_block_collected` to `value` for every listed key whose
    /// watermark is unset or lower. Returns the number of rows moved.
    async fn advance_watermark(&self, public_keys: &[String], value: u64) -> Result<u64>;
}

fn to_db(value: u64) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| CollectorError::DataError(format!("slot {value} exceeds BIGINT range")))
}

fn from_db(value: i64) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| CollectorError::DataError(format!("negative slot {value} in storage")))
}

/// `PostgreSQL` storage backend.
///
/// # Example
///
/// ```no_run
/// use solana_tx_collector::{PgStorage, StorageBackend};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let storage = PgStorage::new("postgresql://localhost/collector").await?;
/// storage.initialize().await?;
/// # Ok(())
/// # }
/// ```
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    /// Connects a small pool to `database_url`.
    ///
    /// # Errors
    ///
    /// Returns `CollectorError::DatabaseError` if connection fails.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl StorageBackend for PgStorage {
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS tracked_protocols (
                public_key TEXT PRIMARY KEY,
                watershed_block BIGINT NOT NULL,
                last_block_collected BIGINT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS raw_transactions (
                id BIGSERIAL PRIMARY KEY,
                signature TEXT NOT NULL,
                source TEXT NOT NULL,
                slot BIGINT NOT NULL,
                block_time BIGINT NOT NULL,
                payload JSONB,
                stream TEXT NOT NULL,
                UNIQUE (signature, source)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        for (name, column) in [
            ("idx_raw_transactions_slot", "slot"),
            ("idx_raw_transactions_block_time", "block_time"),
            ("idx_raw_transactions_signature", "signature"),
            ("idx_raw_transactions_source", "source"),
        ] {
            sqlx::query(&format!(
                "CREATE INDEX IF NOT EXISTS {name} ON raw_transactions({column})"
            ))
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    async fn tracked_protocols(&self, public_keys: &[String]) -> Result<Vec<TrackedProtocol>> {
        let rows = sqlx::query_as::<_, (String, i64, Option<i64>)>(
            r"
            SELECT public_key, watershed_block, last_block_collected
            FROM tracked_protocols
            WHERE public_key = ANY($1)
            ORDER BY public_key
            ",
        )
        .bind(public_keys)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(public_key, watershed, last)| {
                Ok(TrackedProtocol {
                    public_key,
                    watershed_block: from_db(watershed)?,
                    last_block_collected: last.map(from_db).transpose()?,
                })
            })
            .collect()
    }

    async fn register_protocol(&self, public_key: &str, watershed_block: u64) -> Result<bool> {
        let result = sqlx::query(
            r"
            INSERT INTO tracked_protocols (public_key, watershed_block)
            VALUES ($1, $2)
            ON CONFLICT (public_key) DO NOTHING
            ",
        )
        .bind(public_key)
        .bind(to_db(watershed_block)?)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn pending_slots(&self, limit: usize, offset: u64) -> Result<Vec<u64>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let slots = sqlx::query_scalar::<_, i64>(
            r"
            SELECT DISTINCT slot
            FROM raw_transactions
            WHERE payload IS NULL
            ORDER BY slot ASC
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(limit)
        .bind(to_db(offset)?)
        .fetch_all(&self.pool)
        .await?;

        slots.into_iter().map(from_db).collect()
    }

    async fn upsert_transactions(&self, records: &[RawTransactionRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for record in records {
            sqlx::query(
                r"
                INSERT INTO raw_transactions (signature, source, slot, block_time, payload, stream)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (signature, source) DO UPDATE SET payload = EXCLUDED.payload
                ",
            )
            .bind(&record.signature)
            .bind(&record.source)
            .bind(to_db(record.slot)?)
            .bind(record.block_time)
            .bind(&record.payload)
            .bind(record.stream.as_str())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(records.len())
    }

    async fn advance_watermark(&self, public_keys: &[String], value: u64) -> Result<u64> {
        let value = to_db(value)?;
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r"
            UPDATE tracked_protocols
            SET last_block_collected = $2
            WHERE public_key = ANY($1)
              AND (last_block_collected IS NULL OR last_block_collected < $2)
            ",
        )
        .bind(public_keys)
        .bind(value)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(result.rows_affected())
    }
}
