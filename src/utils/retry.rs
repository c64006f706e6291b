//! Retry policy shared by RPC and storage calls.
//!
//! This module provides:
//! - [`is_transient`] / [`is_transient_storage`]: classify a [`CollectorError`]
//!   as retryable or not.
//! - [`is_request_rejected`]: an RPC failure caused by the request, not the slot.
//! - [`with_retry`]: loop that re-runs an operation while its errors are transient.

use crate::config::RetryConfig;
use crate::utils::error::{CollectorError, Result};
use solana_client::client_error::ClientErrorKind;
use solana_client::rpc_request::RpcError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// JSON-RPC codes a node returns while it is temporarily unable to serve.
///
/// `-32004` block not available yet, `-32005` node unhealthy / behind,
/// `-32014` block status not yet available.
const TRANSIENT_RPC_CODES: &[i64] = &[-32004, -32005, -32014];

// ─────────────────────────────────────────────────────────────────────────────
// Error classification
// ─────────────────────────────────────────────────────────────────────────────

/// Returns `true` if an RPC-side `err` is worth retrying.
///
/// | Error                                   | Retried | Reason                          |
/// |-----------------------------------------|---------|---------------------------------|
/// | `RpcError`, `ConnectionError`           | yes     | Network blip, HTTP 429 / 5xx    |
/// | `RpcClientError` I/O, connect, timeout  | yes     | Connection reset, node away     |
/// | `RpcClientError` HTTP 429 / 5xx         | yes     | Rate limited or node overloaded |
/// | `RpcClientError` other HTTP status      | no      | Bad endpoint, key or request    |
/// | `RpcClientError` node-busy codes        | yes     | Node behind or block pending    |
/// | `RpcClientError` other JSON-RPC errors  | no      | Slot skipped, pruned, rejected  |
/// | `RpcClientError` parse / serde          | no      | Response will not improve       |
/// | `DataError`, `DecodingError`            | no      | Bad data will not self-heal     |
/// | `ConfigError`, `RetryExhausted`         | no      | Programmer error / already done |
#[must_use]
pub fn is_transient(err: &CollectorError) -> bool {
    match err {
        CollectorError::RpcError(_) | CollectorError::ConnectionError(_) => true,
        CollectorError::RpcClientError(client_err) => match client_err.kind() {
            ClientErrorKind::Io(_) => true,
            ClientErrorKind::Reqwest(http_err) => match http_err.status() {
                Some(status) => status.as_u16() == 429 || status.is_server_error(),
                None => http_err.is_timeout() || http_err.is_connect() || http_err.is_request(),
            },
            ClientErrorKind::RpcError(RpcError::RpcResponseError { code, .. }) => {
                TRANSIENT_RPC_CODES.contains(code)
            }
            _ => false,
        },
        _ => false,
    }
}

/// Returns `true` if the node refused the request itself with an HTTP 4xx
/// other than 429, e.g. a wrong endpoint path or a revoked API key.
///
/// Such a refusal says nothing about the slot asked for.
#[must_use]
pub fn is_request_rejected(err: &CollectorError) -> bool {
    let CollectorError::RpcClientError(client_err) = err else {
        return false;
    };
    match client_err.kind() {
        ClientErrorKind::Reqwest(http_err) => http_err
            .status()
            .is_some_and(|status| status.is_client_error() && status.as_u16() != 429),
        _ => false,
    }
}

/// Returns `true` if a storage-side `err` is a dropped or unavailable connection.
///
/// Constraint violations and malformed queries are not retried: re-running
/// them would fail identically.
#[must_use]
pub fn is_transient_storage(err: &CollectorError) -> bool {
    let CollectorError::DatabaseError(db_err) = err else {
        return matches!(err, CollectorError::ConnectionError(_));
    };
    match db_err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db) => db.code().is_some_and(|code| {
            // Class 08 is connection exceptions, 57P0x is operator shutdown.
            code.starts_with("08") || code.starts_with("57P0")
        }),
        _ => false,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Retry loop
// ─────────────────────────────────────────────────────────────────────────────

/// Calls `op()` until it succeeds, fails with an error `classify` rejects,
/// or `config.max_retries` is reached.
///
/// With `max_retries = None` the loop never gives up on a transient error.
///
/// # Errors
///
/// Returns the first non-transient error unchanged, or
/// [`CollectorError::RetryExhausted`] once the retry budget is spent.
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    classify: fn(&CollectorError) -> bool,
    operation: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match op().await {
            Ok(val) => return Ok(val),
            Err(err) if !classify(&err) => return Err(err),
            Err(err) => err,
        };

        attempt = attempt.saturating_add(1);
        if config.max_retries.is_some_and(|max| attempt > max) {
            return Err(CollectorError::RetryExhausted {
                attempts: attempt,
                last_error: err.to_string(),
            });
        }

        tracing::warn!(
            operation,
            attempt,
            max = ?config.max_retries,
            delay_ms = config.delay_ms,
            error = %err,
            "Transient error, retrying"
        );
        sleep(Duration::from_millis(config.delay_ms)).await;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
