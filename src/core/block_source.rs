//! Rate-limited block and slot fetching.
//!
//! Every RPC attempt, including each retry, first passes through the shared
//! [`RateLimiter`]. Transient failures are retried with the configured
//! [`RetryConfig`] (unbounded by default). A permanent failure for a single
//! slot is logged and reported as "no block" so the caller can move on; an
//! HTTP 4xx rejection of the request is returned as an error instead.

use crate::config::RetryConfig;
use crate::utils::error::{CollectorError, Result};
use crate::utils::rate_limiter::RateLimiter;
use crate::utils::retry::{is_request_rejected, is_transient, with_retry};
use crate::utils::rpc::{DefaultRpcProvider, RpcProvider};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_transaction_status::UiConfirmedBlock;
use std::sync::Arc;

/// Fetches finalized blocks and the finalized tip through an [`RpcProvider`].
pub struct RpcBlockSource {
    rpc: Arc<dyn RpcProvider>,
    limiter: Arc<RateLimiter>,
    retry: RetryConfig,
    commitment: CommitmentConfig,
}

impl RpcBlockSource {
    /// Creates a source backed by a [`DefaultRpcProvider`] at finalized commitment.
    #[must_use]
    pub fn new(rpc_url: &str, limiter: Arc<RateLimiter>, retry: RetryConfig) -> Self {
        let commitment = CommitmentConfig::finalized();
        let provider = DefaultRpcProvider::new_with_commitment(rpc_url, commitment);
        Self::with_provider(Arc::new(provider), limiter, retry)
    }

    /// Creates a source backed by a custom [`RpcProvider`], e.g. a mock.
    #[must_use]
    pub fn with_provider(
        rpc: Arc<dyn RpcProvider>,
        limiter: Arc<RateLimiter>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            rpc,
            limiter,
            retry,
            commitment: CommitmentConfig::finalized(),
        }
    }

    #[must_use]
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Fetches one block.
    ///
    /// Returns `Ok(None)` when the node permanently rejects this slot
    /// (skipped slot, pruned ledger, unparsable response).
    ///
    /// # Errors
    ///
    /// [`CollectorError::RetryExhausted`] when a retry bound is configured, or
    /// the HTTP error when the node rejects the request itself (see
    /// [`is_request_rejected`]). Neither is a property of the slot.
    pub async fn fetch_block(&self, slot: u64) -> Result<Option<UiConfirmedBlock>> {
        let (rpc, limiter, commitment) = (&self.rpc, &self.limiter, self.commitment);
        let result = with_retry(&self.retry, is_transient, "getBlock", move || async move {
            limiter.acquire().await;
            rpc.get_block(slot, Some(commitment)).await
        })
        .await;

        match result {
            Ok(block) => Ok(Some(block)),
            Err(err @ CollectorError::RetryExhausted { .. }) => Err(err),
            Err(err) if is_request_rejected(&err) => Err(err),
            Err(err) => {
                tracing::warn!(slot, error = %err, "Skipping slot after permanent RPC failure");
                Ok(None)
            }
        }
    }

    /// Latest finalized slot, retried like [`Self::fetch_block`].
    ///
    /// # Errors
    ///
    /// Returns a permanent RPC error or [`CollectorError::RetryExhausted`];
    /// there is no slot to skip here.
    pub async fn latest_finalized_slot(&self) -> Result<u64> {
        let (rpc, limiter) = (&self.rpc, &self.limiter);
        with_retry(&self.retry, is_transient, "getSlot", move || async move {
            limiter.acquire().await;
            rpc.get_slot(Some(CommitmentConfig::finalized())).await
        })
        .await
    }
}
