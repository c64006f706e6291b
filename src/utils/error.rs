//! Error types for collector operations.
//!
//! One `thiserror` enumeration covers configuration, RPC, storage and
//! decoding failures. Whether a given error is worth retrying is decided in
//! [`crate::utils::retry`], not here.

use thiserror::Error;

/// Custom error type for collector operations.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// Errors encountered during database operations.
    ///
    /// Wraps `sqlx::Error` so storage code can use `?` directly.
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// A compiled IDL layout did not match the bytes it was given.
    #[error("Decoding error: {0}")]
    DecodingError(#[from] solana_idl_parser::DecodeError),

    /// An IDL document could not be compiled into layouts.
    #[error("IDL error: {0}")]
    IdlError(#[from] solana_idl_parser::IdlError),

    /// Errors interacting with the Solana RPC that carry only a message.
    #[error("RPC error: {0}")]
    RpcError(String),

    /// Errors from the Solana RPC client.
    #[error("RPC client error: {0}")]
    RpcClientError(Box<solana_client::client_error::ClientError>),

    /// Missing or invalid configuration. Never retried.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Connection-level failure outside the RPC client (e.g. a dropped socket).
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// A response or record that is well-formed but unusable.
    #[error("Data error: {0}")]
    DataError(String),

    /// All retry attempts were exhausted on a transient error.
    #[error("Retry exhausted after {attempts} attempts: {last_error}")]
    RetryExhausted {
        /// Total number of attempts (initial call + retries).
        attempts: u32,
        /// String representation of the last error.
        last_error: String,
    },
}

/// Type alias for Results using `CollectorError`.
pub type Result<T> = std::result::Result<T, CollectorError>;

impl From<solana_client::client_error::ClientError> for CollectorError {
    fn from(err: solana_client::client_error::ClientError) -> Self {
        CollectorError::RpcClientError(Box::new(err))
    }
}
