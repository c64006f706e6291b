//! Durable writes for filtered batches and watermarks.
//!
//! Each call is applied in a single storage transaction and retried as a
//! whole on transient storage failures. Upserts are keyed by
//! `(signature, source)`, so replaying a batch after a partial failure is safe.

use crate::config::RetryConfig;
use crate::core::filter::RelevanceFilter;
use crate::storage::StorageBackend;
use crate::types::records::{CollectedTransaction, CollectionStream, RawTransactionRecord};
use crate::utils::error::Result;
use crate::utils::retry::{is_transient_storage, with_retry};
use std::sync::Arc;

pub struct Persister {
    storage: Arc<dyn StorageBackend>,
    retry: RetryConfig,
}

impl Persister {
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>, retry: RetryConfig) -> Self {
        Self { storage, retry }
    }

    #[must_use]
    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    /// Builds one record per (transaction, matching protocol).
    ///
    /// Transactions without a signature or without a serializable body are skipped.
    #[must_use]
    pub fn records(
        batch: &[CollectedTransaction],
        filter: &RelevanceFilter,
        stream: CollectionStream,
    ) -> Vec<RawTransactionRecord> {
        let mut records = Vec::new();
        for collected in batch {
            let Some(signature) = collected.signature() else {
                tracing::warn!(slot = collected.slot, "Transaction without signature, skipping");
                continue;
            };
            let Some(payload) = collected.payload() else {
                tracing::warn!(slot = collected.slot, %signature, "Unserializable transaction, skipping");
                continue;
            };
            for source in filter.sources(&collected.transaction) {
                records.push(RawTransactionRecord {
                    signature: signature.clone(),
                    source,
                    slot: collected.slot,
                    block_time: collected.block_time,
                    payload: Some(payload.clone()),
                    stream,
                });
            }
        }
        records
    }

    /// Upserts the batch, attributing each transaction to every matching protocol.
    ///
    /// Returns the number of records written; an empty batch writes nothing.
    ///
    /// # Errors
    ///
    /// Non-transient storage errors, or `RetryExhausted` under a bounded policy.
    pub async fn write_batch(
        &self,
        batch: &[CollectedTransaction],
        filter: &RelevanceFilter,
        stream: CollectionStream,
    ) -> Result<usize> {
        let records = Self::records(batch, filter, stream);
        if records.is_empty() {
            return Ok(0);
        }

        let storage = &self.storage;
        let records = &records;
        with_retry(
            &self.retry,
            is_transient_storage,
            "write_batch",
            move || async move { storage.upsert_transactions(records).await },
        )
        .await
    }

    /// Moves `last_block_collected` forward to `value` for every key.
    ///
    /// # Errors
    ///
    /// Same as [`Self::write_batch`].
    pub async fn advance_watermark(&self, public_keys: &[String], value: u64) -> Result<u64> {
        let storage = &self.storage;
        let moved = with_retry(
            &self.retry,
            is_transient_storage,
            "advance_watermark",
            move || async move { storage.advance_watermark(public_keys, value).await },
        )
        .await?;

        tracing::debug!(value, moved, "Watermark advanced");
        Ok(moved)
    }
}
