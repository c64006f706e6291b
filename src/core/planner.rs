//! Slot assignment strategies.
//!
//! [`CurrentPlanner`] crawls forward from the slowest tracked protocol's
//! watermark towards the finalized tip. [`HistoricalPlanner`] treats rows in
//! `raw_transactions` with a null payload as its work queue.

use crate::config::{RetryConfig, BATCH_SIZE_CURRENT, BATCH_SIZE_HISTORICAL, HISTORICAL_LOOKAHEAD};
use crate::core::block_source::RpcBlockSource;
use crate::core::persister::Persister;
use crate::storage::StorageBackend;
use crate::types::records::{Assignment, CollectionStream, TrackedProtocol};
use crate::utils::error::Result;
use crate::utils::retry::{is_transient_storage, with_retry};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Decides which slots a collector cycle fetches and records its progress.
#[async_trait]
pub trait AssignmentPlanner: Send + Sync {
    /// Tag written on every record this planner's batches produce.
    fn collection_stream(&self) -> CollectionStream;

    /// Slots for the next cycle. Empty when there is nothing to do yet.
    async fn get_assignment(&self) -> Result<Assignment>;

    /// Called once the batch for `assignment` is durably stored.
    async fn on_batch_persisted(&self, assignment: &[u64], written: usize) -> Result<()>;

    /// Slots of the last assignment the node permanently refused to serve.
    async fn on_slots_skipped(&self, _slots: &[u64]) {}
}

/// Forward crawl bounded by the latest finalized slot.
pub struct CurrentPlanner {
    storage: Arc<dyn StorageBackend>,
    source: Arc<RpcBlockSource>,
    persister: Arc<Persister>,
    protocol_keys: Vec<String>,
    excluded_slots: BTreeSet<u64>,
    retry: RetryConfig,
}

impl CurrentPlanner {
    #[must_use]
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        source: Arc<RpcBlockSource>,
        persister: Arc<Persister>,
        protocol_keys: Vec<String>,
    ) -> Self {
        Self {
            storage,
            source,
            persister,
            protocol_keys,
            excluded_slots: BTreeSet::new(),
            retry: RetryConfig::storage_default(),
        }
    }

    /// Slots never handed out, whatever the watermark.
    #[must_use]
    pub fn with_excluded_slots(mut self, slots: BTreeSet<u64>) -> Self {
        self.excluded_slots = slots;
        self
    }

    /// Policy for re-planning after a transient storage failure.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Adds a row for every configured key that has none, using the current
    /// finalized slot as its watershed.
    async fn register_missing(&self, known: &[TrackedProtocol], latest: u64) -> Result<()> {
        for key in &self.protocol_keys {
            if known.iter().any(|p| &p.public_key == key) {
                continue;
            }
            if self.storage.register_protocol(key, latest).await? {
                tracing::info!(protocol = %key, watershed = latest, "Registered new protocol");
            }
        }
        Ok(())
    }

    async fn plan(&self) -> Result<Assignment> {
        let latest = self.source.latest_finalized_slot().await?;

        let mut protocols = self.storage.tracked_protocols(&self.protocol_keys).await?;
        if protocols.len() < self.protocol_keys.len() {
            self.register_missing(&protocols, latest).await?;
            protocols = self.storage.tracked_protocols(&self.protocol_keys).await?;
        }

        let Some(start) = protocols.iter().map(TrackedProtocol::resume_slot).min() else {
            return Ok(Vec::new());
        };
        let end = start.saturating_add(BATCH_SIZE_CURRENT).min(latest);

        Ok((start..end)
            .filter(|slot| !self.excluded_slots.contains(slot))
            .collect())
    }
}

#[async_trait]
impl AssignmentPlanner for CurrentPlanner {
    fn collection_stream(&self) -> CollectionStream {
        CollectionStream::Current
    }

    async fn get_assignment(&self) -> Result<Assignment> {
        with_retry(&self.retry, is_transient_storage, "plan_current", || self.plan()).await
    }

    async fn on_batch_persisted(&self, assignment: &[u64], written: usize) -> Result<()> {
        let Some(&high) = assignment.iter().max() else {
            return Ok(());
        };
        self.persister
            .advance_watermark(&self.protocol_keys, high)
            .await?;
        tracing::debug!(last_block_collected = high, written, "Current batch persisted");
        Ok(())
    }
}

/// Backfill of slots whose stored transactions still lack a payload.
///
/// A slot the node will not serve keeps its null payload, so it is
/// remembered for the life of the process and paged past on later cycles.
pub struct HistoricalPlanner {
    storage: Arc<dyn StorageBackend>,
    offset: u64,
    retry: RetryConfig,
    skipped: Mutex<BTreeSet<u64>>,
}

impl HistoricalPlanner {
    /// `offset` skips that many pending slots, so parallel workers can split the backlog.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>, offset: u64) -> Self {
        Self {
            storage,
            offset,
            retry: RetryConfig::storage_default(),
            skipped: Mutex::new(BTreeSet::new()),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn plan(&self) -> Result<Assignment> {
        let window = BATCH_SIZE_HISTORICAL * HISTORICAL_LOOKAHEAD;
        let skipped = self.skipped.lock().await.clone();

        let mut slots = Vec::new();
        let mut query_offset = self.offset;
        loop {
            let page = self.storage.pending_slots(window, query_offset).await?;
            let exhausted = page.len() < window;
            slots.extend(page.into_iter().filter(|slot| !skipped.contains(slot)));
            if exhausted || slots.len() >= BATCH_SIZE_HISTORICAL {
                break;
            }
            query_offset = query_offset.saturating_add(window as u64);
        }

        slots.sort_unstable();
        slots.dedup();
        slots.truncate(BATCH_SIZE_HISTORICAL);
        Ok(slots)
    }
}

#[async_trait]
impl AssignmentPlanner for HistoricalPlanner {
    fn collection_stream(&self) -> CollectionStream {
        CollectionStream::Historical
    }

    async fn get_assignment(&self) -> Result<Assignment> {
        with_retry(&self.retry, is_transient_storage, "plan_historical", || self.plan()).await
    }

    async fn on_batch_persisted(&self, assignment: &[u64], written: usize) -> Result<()> {
        tracing::info!(blocks = assignment.len(), written, "Historical batch persisted");
        Ok(())
    }

    async fn on_slots_skipped(&self, slots: &[u64]) {
        let mut skipped = self.skipped.lock().await;
        skipped.extend(slots.iter().copied());
        tracing::info!(
            blocks = slots.len(),
            total = skipped.len(),
            "Unservable slots excluded from backfill"
        );
    }
}
