//! Protocol relevance checks over fetched transactions.
//!
//! Pure functions over the in-memory transaction: no RPC or storage access.

use solana_transaction_status::{EncodedTransaction, EncodedTransactionWithStatusMeta, UiMessage};

/// Account keys referenced by the transaction's top-level message, base58 encoded.
///
/// For `jsonParsed` v0 transactions this includes addresses loaded from
/// lookup tables, since the node inlines them into `accountKeys`.
#[must_use]
pub fn account_keys(transaction: &EncodedTransactionWithStatusMeta) -> Vec<String> {
    match &transaction.transaction {
        EncodedTransaction::Json(ui_tx) => match &ui_tx.message {
            UiMessage::Parsed(msg) => msg.account_keys.iter().map(|acc| acc.pubkey.clone()).collect(),
            UiMessage::Raw(msg) => msg.account_keys.clone(),
        },
        EncodedTransaction::Accounts(list) => {
            list.account_keys.iter().map(|acc| acc.pubkey.clone()).collect()
        }
        binary => binary
            .decode()
            .map(|tx| {
                tx.message
                    .static_account_keys()
                    .iter()
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default(),
    }
}

/// Matches transactions against the tracked protocol keys.
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    tracked: Vec<String>,
}

impl RelevanceFilter {
    #[must_use]
    pub fn new(tracked: Vec<String>) -> Self {
        Self { tracked }
    }

    #[must_use]
    pub fn tracked_keys(&self) -> &[String] {
        &self.tracked
    }

    /// True iff any account key of the message is a tracked key.
    #[must_use]
    pub fn is_relevant(&self, transaction: &EncodedTransactionWithStatusMeta) -> bool {
        let keys = account_keys(transaction);
        self.tracked.iter().any(|tracked| keys.contains(tracked))
    }

    /// Every tracked key present in the transaction, in tracking order.
    ///
    /// A transaction touching several tracked programs is attributed to each.
    #[must_use]
    pub fn sources(&self, transaction: &EncodedTransactionWithStatusMeta) -> Vec<String> {
        let keys = account_keys(transaction);
        let matched: Vec<String> = self
            .tracked
            .iter()
            .filter(|tracked| keys.contains(tracked))
            .cloned()
            .collect();

        if matched.is_empty() {
            tracing::error!(
                account_keys = keys.len(),
                "Transaction reached persistence without a tracked account key"
            );
        }
        matched
    }
}
