//! Records exchanged between planner, collector and storage.

use serde::{Deserialize, Serialize};
use solana_transaction_status::{EncodedTransaction, EncodedTransactionWithStatusMeta};
use std::fmt;

/// Block time stored when the node does not report one.
pub const UNKNOWN_BLOCK_TIME: i64 = -1;

/// A tracked program and its collection progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedProtocol {
    pub public_key: String,
    /// First slot worth scanning for this protocol.
    pub watershed_block: u64,
    /// Highest slot of the last fully persisted current-mode batch.
    pub last_block_collected: Option<u64>,
}

impl TrackedProtocol {
    /// Slot the next current-mode batch starts from.
    #[must_use]
    pub fn resume_slot(&self) -> u64 {
        self.last_block_collected.unwrap_or(self.watershed_block)
    }
}

/// Which collector produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CollectionStream {
    Current,
    Historical,
}

impl CollectionStream {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Current => "CURRENT",
            Self::Historical => "HISTORICAL",
        }
    }
}

impl fmt::Display for CollectionStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored row: a transaction signature seen by one tracked protocol.
///
/// `(signature, source)` is unique. `payload` may be `None` when the row was
/// created by a signature-only pass and not yet enriched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTransactionRecord {
    pub signature: String,
    pub source: String,
    pub slot: u64,
    pub block_time: i64,
    pub payload: Option<serde_json::Value>,
    pub stream: CollectionStream,
}

/// A relevant transaction pulled out of a fetched block.
#[derive(Debug, Clone)]
pub struct CollectedTransaction {
    pub slot: u64,
    /// Block time in seconds, or [`UNKNOWN_BLOCK_TIME`].
    pub block_time: i64,
    pub transaction: EncodedTransactionWithStatusMeta,
}

impl CollectedTransaction {
    /// First signature of the transaction, base58 encoded.
    #[must_use]
    pub fn signature(&self) -> Option<String> {
        match &self.transaction.transaction {
            EncodedTransaction::Json(tx) => tx.signatures.first().cloned(),
            EncodedTransaction::Accounts(list) => list.signatures.first().cloned(),
            binary => binary
                .decode()
                .and_then(|tx| tx.signatures.first().map(ToString::to_string)),
        }
    }

    /// JSON form of the transaction and its status meta, as persisted.
    #[must_use]
    pub fn payload(&self) -> Option<serde_json::Value> {
        serde_json::to_value(&self.transaction).ok()
    }
}

/// Slots one collector cycle should fetch, in planning order.
pub type Assignment = Vec<u64>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resume_slot_prefers_watermark() {
        let mut protocol = TrackedProtocol {
            public_key: "A".to_string(),
            watershed_block: 100,
            last_block_collected: None,
        };
        assert_eq!(protocol.resume_slot(), 100);

        protocol.last_block_collected = Some(180);
        assert_eq!(protocol.resume_slot(), 180);
    }

    #[test]
    fn test_stream_tags() {
        assert_eq!(CollectionStream::Current.as_str(), "CURRENT");
        assert_eq!(
            serde_json::to_value(CollectionStream::Historical).unwrap(),
            json!("HISTORICAL")
        );
    }

    #[test]
    fn test_signature_and_payload_from_json_transaction() {
        let transaction: EncodedTransactionWithStatusMeta = serde_json::from_value(json!({
            "transaction": {
                "signatures": ["sigA", "sigB"],
                "message": {
                    "accountKeys": [],
                    "recentBlockhash": "11111111111111111111111111111111",
                    "instructions": []
                }
            },
            "meta": null
        }))
        .unwrap();
        let collected = CollectedTransaction {
            slot: 5,
            block_time: UNKNOWN_BLOCK_TIME,
            transaction,
        };

        assert_eq!(collected.signature().as_deref(), Some("sigA"));
        let payload = collected.payload().unwrap();
        assert_eq!(payload["transaction"]["signatures"][1], "sigB");
    }
}
