//! In-process storage backend.
//!
//! Mirrors the `PostgreSQL` contract closely enough to drive planners and
//! the collector without a database. Writes can be made to fail on demand to
//! exercise the retry paths.

use super::StorageBackend;
use crate::types::records::{RawTransactionRecord, TrackedProtocol};
use crate::utils::error::{CollectorError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct MemoryState {
    protocols: BTreeMap<String, TrackedProtocol>,
    transactions: BTreeMap<(String, String), RawTransactionRecord>,
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: Mutex<MemoryState>,
    failing_writes: AtomicU32,
    write_attempts: AtomicU32,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds tracked protocol rows.
    #[must_use]
    pub fn with_protocols(protocols: impl IntoIterator<Item = TrackedProtocol>) -> Self {
        let state = MemoryState {
            protocols: protocols
                .into_iter()
                .map(|p| (p.public_key.clone(), p))
                .collect(),
            transactions: BTreeMap::new(),
        };
        Self {
            state: Mutex::new(state),
            ..Self::default()
        }
    }

    /// Makes the next `count` write calls fail with a connection error.
    pub fn fail_next_writes(&self, count: u32) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    /// Write calls seen so far, failed ones included.
    #[must_use]
    pub fn write_attempts(&self) -> u32 {
        self.write_attempts.load(Ordering::SeqCst)
    }

    /// Inserts a row as-is, bypassing upsert semantics.
    pub async fn insert_transaction(&self, record: RawTransactionRecord) {
        let key = (record.signature.clone(), record.source.clone());
        self.state.lock().await.transactions.insert(key, record);
    }

    pub async fn transactions(&self) -> Vec<RawTransactionRecord> {
        self.state.lock().await.transactions.values().cloned().collect()
    }

    pub async fn protocol(&self, public_key: &str) -> Option<TrackedProtocol> {
        self.state.lock().await.protocols.get(public_key).cloned()
    }

    fn check_write(&self) -> Result<()> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(CollectorError::ConnectionError(
                "connection to storage lost".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn tracked_protocols(&self, public_keys: &[String]) -> Result<Vec<TrackedProtocol>> {
        let state = self.state.lock().await;
        Ok(state
            .protocols
            .values()
            .filter(|p| public_keys.contains(&p.public_key))
            .cloned()
            .collect())
    }

    async fn register_protocol(&self, public_key: &str, watershed_block: u64) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state.protocols.contains_key(public_key) {
            return Ok(false);
        }
        state.protocols.insert(
            public_key.to_string(),
            TrackedProtocol {
                public_key: public_key.to_string(),
                watershed_block,
                last_block_collected: None,
            },
        );
        Ok(true)
    }

    async fn pending_slots(&self, limit: usize, offset: u64) -> Result<Vec<u64>> {
        let state = self.state.lock().await;
        let slots: BTreeSet<u64> = state
            .transactions
            .values()
            .filter(|r| r.payload.is_none())
            .map(|r| r.slot)
            .collect();
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        Ok(slots.into_iter().skip(skip).take(limit).collect())
    }

    async fn upsert_transactions(&self, records: &[RawTransactionRecord]) -> Result<usize> {
        self.check_write()?;
        let mut state = self.state.lock().await;
        for record in records {
            let key = (record.signature.clone(), record.source.clone());
            match state.transactions.get_mut(&key) {
                Some(existing) => existing.payload.clone_from(&record.payload),
                None => {
                    state.transactions.insert(key, record.clone());
                }
            }
        }
        Ok(records.len())
    }

    async fn advance_watermark(&self, public_keys: &[String], value: u64) -> Result<u64> {
        self.check_write()?;
        let mut state = self.state.lock().await;
        let mut moved = 0;
        for key in public_keys {
            if let Some(protocol) = state.protocols.get_mut(key) {
                if protocol.last_block_collected.map_or(true, |last| last < value) {
                    protocol.last_block_collected = Some(value);
                    moved += 1;
                }
            }
        }
        Ok(moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::records::CollectionStream;
    use serde_json::json;

    fn record(signature: &str, source: &str, slot: u64, payload: Option<serde_json::Value>) -> RawTransactionRecord {
        RawTransactionRecord {
            signature: signature.to_string(),
            source: source.to_string(),
            slot,
            block_time: 1_700_000_000,
            payload,
            stream: CollectionStream::Current,
        }
    }

    #[tokio::test]
    async fn test_upsert_keeps_one_row_per_signature_and_source() {
        let storage = MemoryStorage::new();
        let batch = vec![
            record("s1", "A", 10, Some(json!({"v": 1}))),
            record("s1", "B", 10, Some(json!({"v": 1}))),
        ];

        storage.upsert_transactions(&batch).await.unwrap();
        storage
            .upsert_transactions(&[record("s1", "A", 10, Some(json!({"v": 2})))])
            .await
            .unwrap();

        let rows = storage.transactions().await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].payload, Some(json!({"v": 2})));
    }

    #[tokio::test]
    async fn test_pending_slots_distinct_sorted_with_offset() {
        let storage = MemoryStorage::new();
        for (sig, slot) in [("a", 30), ("b", 10), ("c", 10), ("d", 20), ("e", 40)] {
            storage.insert_transaction(record(sig, "A", slot, None)).await;
        }
        storage
            .insert_transaction(record("f", "A", 5, Some(json!({}))))
            .await;

        assert_eq!(storage.pending_slots(3, 0).await.unwrap(), vec![10, 20, 30]);
        assert_eq!(storage.pending_slots(3, 2).await.unwrap(), vec![30, 40]);
    }

    #[tokio::test]
    async fn test_watermark_only_moves_forward() {
        let storage = MemoryStorage::new();
        storage.register_protocol("A", 100).await.unwrap();
        assert!(!storage.register_protocol("A", 999).await.unwrap());

        let keys = vec!["A".to_string()];
        assert_eq!(storage.advance_watermark(&keys, 130).await.unwrap(), 1);
        assert_eq!(storage.advance_watermark(&keys, 120).await.unwrap(), 0);

        let protocol = storage.protocol("A").await.unwrap();
        assert_eq!(protocol.watershed_block, 100);
        assert_eq!(protocol.last_block_collected, Some(130));
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let storage = MemoryStorage::new();
        storage.fail_next_writes(1);

        assert!(storage.upsert_transactions(&[]).await.is_err());
        assert!(storage.upsert_transactions(&[]).await.is_ok());
        assert_eq!(storage.write_attempts(), 2);
    }
}
