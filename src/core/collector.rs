//! Collection loop.
//!
//! One cycle plans an assignment, fetches every slot in it concurrently,
//! keeps the transactions that touch a tracked protocol, persists them and
//! only then reports progress back to the planner. A crash mid-cycle leaves
//! the watermark where it was, and the next run re-fetches the same slots.

use crate::core::block_source::RpcBlockSource;
use crate::core::events::ProgramLogDecoder;
use crate::core::filter::RelevanceFilter;
use crate::core::persister::Persister;
use crate::core::planner::AssignmentPlanner;
use crate::types::records::{CollectedTransaction, CollectionStream, UNKNOWN_BLOCK_TIME};
use crate::utils::error::Result;
use crate::utils::logging;
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Outcome of one collection cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Slots in the assignment.
    pub planned: usize,
    /// Slots that produced a block.
    pub fetched: usize,
    /// Slots the node permanently refused.
    pub skipped: usize,
    /// Relevant transactions found.
    pub relevant: usize,
    /// Records written, one per (transaction, matching protocol).
    pub written: usize,
    /// Program events decoded from the relevant transactions.
    pub events: usize,
}

pub struct Collector {
    planner: Arc<dyn AssignmentPlanner>,
    source: Arc<RpcBlockSource>,
    persister: Arc<Persister>,
    filter: RelevanceFilter,
    events: Option<Arc<ProgramLogDecoder>>,
    poll_interval: Duration,
}

impl Collector {
    #[must_use]
    pub fn new(
        planner: Arc<dyn AssignmentPlanner>,
        source: Arc<RpcBlockSource>,
        persister: Arc<Persister>,
        filter: RelevanceFilter,
    ) -> Self {
        Self {
            planner,
            source,
            persister,
            filter,
            events: None,
            poll_interval: Duration::from_secs(5),
        }
    }

    /// Pause after an empty or failed cycle.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Decodes program events of every relevant transaction after it is persisted.
    #[must_use]
    pub fn with_event_decoder(mut self, decoder: Arc<ProgramLogDecoder>) -> Self {
        self.events = Some(decoder);
        self
    }

    #[must_use]
    pub fn collection_stream(&self) -> CollectionStream {
        self.planner.collection_stream()
    }

    /// Fetches every slot of `assignment` concurrently and keeps relevant transactions.
    ///
    /// Also returns the slots the node permanently rejects, in assignment
    /// order. Admission is bounded by the shared rate limiter only.
    ///
    /// # Errors
    ///
    /// `RetryExhausted` from any slot under a bounded RPC retry policy, or
    /// the node rejecting the request itself.
    pub async fn get_data(
        &self,
        assignment: &[u64],
    ) -> Result<(Vec<u64>, Vec<CollectedTransaction>)> {
        let fetches = assignment.iter().map(|&slot| async move {
            self.source.fetch_block(slot).await.map(|block| (slot, block))
        });

        let mut skipped = Vec::new();
        let mut collected = Vec::new();
        for result in join_all(fetches).await {
            let (slot, block) = result?;
            let Some(block) = block else {
                skipped.push(slot);
                continue;
            };
            let block_time = block.block_time.unwrap_or(UNKNOWN_BLOCK_TIME);
            for transaction in block.transactions.unwrap_or_default() {
                if self.filter.is_relevant(&transaction) {
                    collected.push(CollectedTransaction {
                        slot,
                        block_time,
                        transaction,
                    });
                }
            }
        }

        Ok((skipped, collected))
    }

    /// Persists a filtered batch under this collector's stream tag.
    ///
    /// # Errors
    ///
    /// See [`Persister::write_batch`].
    pub async fn write_data(&self, batch: &[CollectedTransaction]) -> Result<usize> {
        self.persister
            .write_batch(batch, &self.filter, self.collection_stream())
            .await
    }

    /// Decodes and logs the program events of a persisted batch.
    ///
    /// A layout mismatch is logged per record and does not fail the cycle.
    pub fn decode_events(&self, batch: &[CollectedTransaction]) -> usize {
        let Some(decoder) = &self.events else {
            return 0;
        };
        let mut decoded = 0;
        for collected in batch {
            let logs = decoder.decode_transaction(&collected.transaction);
            for event in &logs.events {
                tracing::debug!(
                    slot = collected.slot,
                    program = %event.program_id,
                    event = %event.event.name,
                    "Decoded program event"
                );
            }
            for failure in &logs.failures {
                tracing::warn!(
                    slot = collected.slot,
                    signature = collected.signature().unwrap_or_default(),
                    program = %failure.program_id,
                    error = %failure.error,
                    "Program event does not match its IDL layout"
                );
            }
            decoded += logs.events.len();
        }
        decoded
    }

    /// Runs a single plan, fetch, filter and persist cycle.
    ///
    /// # Errors
    ///
    /// Any error that escaped the retry policies. The planner is not told
    /// about a batch that was not persisted.
    pub async fn run_once(&self) -> Result<CycleReport> {
        let assignment = self.planner.get_assignment().await?;
        logging::log_assignment(self.collection_stream().as_str(), &assignment);
        if assignment.is_empty() {
            return Ok(CycleReport::default());
        }

        let (skipped, batch) = self.get_data(&assignment).await?;
        let written = self.write_data(&batch).await?;
        if !skipped.is_empty() {
            self.planner.on_slots_skipped(&skipped).await;
        }
        self.planner.on_batch_persisted(&assignment, written).await?;

        Ok(CycleReport {
            planned: assignment.len(),
            fetched: assignment.len() - skipped.len(),
            skipped: skipped.len(),
            relevant: batch.len(),
            written,
            events: self.decode_events(&batch),
        })
    }

    /// Runs cycles until the task is cancelled.
    ///
    /// A failed cycle is logged and re-planned from scratch after the poll
    /// interval; nothing it fetched is kept.
    pub async fn run(&self) -> Result<()> {
        let mut iteration: u64 = 0;
        loop {
            iteration += 1;
            let started = Instant::now();

            match self.run_once().await {
                Ok(report) if report.planned == 0 => sleep(self.poll_interval).await,
                Ok(report) => logging::log_batch(
                    iteration,
                    report.fetched,
                    report.relevant,
                    report.written,
                    report.events,
                    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                ),
                Err(e) => {
                    logging::log_error("Collection cycle failed", &e.to_string());
                    sleep(self.poll_interval).await;
                }
            }
        }
    }
}
