//! Seam between the collector and the Solana JSON-RPC client.

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcBlockConfig;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_transaction_status::{TransactionDetails, UiConfirmedBlock, UiTransactionEncoding};

use crate::utils::error::Result;

/// Highest transaction version requested from the node.
pub const MAX_SUPPORTED_TRANSACTION_VERSION: u8 = 0;

/// The two RPC calls the collector depends on.
///
/// Implemented by [`DefaultRpcProvider`] for real nodes and by mocks in tests.
#[async_trait]
pub trait RpcProvider: Send + Sync {
    /// Fetches a block with full, JSON-parsed transaction detail.
    async fn get_block(
        &self,
        slot: u64,
        commitment: Option<CommitmentConfig>,
    ) -> Result<UiConfirmedBlock>;

    async fn get_slot(&self, commitment: Option<CommitmentConfig>) -> Result<u64>;
}

pub struct DefaultRpcProvider {
    client: RpcClient,
}

impl DefaultRpcProvider {
    /// Creates a provider with a specific commitment configuration.
    pub fn new_with_commitment(rpc_url: &str, commitment: CommitmentConfig) -> Self {
        Self {
            client: RpcClient::new_with_commitment(rpc_url.to_string(), commitment),
        }
    }
}

#[async_trait]
impl RpcProvider for DefaultRpcProvider {
    async fn get_block(
        &self,
        slot: u64,
        commitment: Option<CommitmentConfig>,
    ) -> Result<UiConfirmedBlock> {
        Ok(self
            .client
            .get_block_with_config(
                slot,
                RpcBlockConfig {
                    encoding: Some(UiTransactionEncoding::JsonParsed),
                    transaction_details: Some(TransactionDetails::Full),
                    rewards: Some(false),
                    commitment,
                    max_supported_transaction_version: Some(MAX_SUPPORTED_TRANSACTION_VERSION),
                },
            )
            .await?)
    }

    async fn get_slot(&self, commitment: Option<CommitmentConfig>) -> Result<u64> {
        Ok(self
            .client
            .get_slot_with_commitment(commitment.unwrap_or_else(|| self.client.commitment()))
            .await?)
    }
}
