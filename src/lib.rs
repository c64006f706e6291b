//! `solana-tx-collector` - resumable, rate-limited ingestion of Solana
//! lending and DEX protocol transactions.
//!
//! # Architecture
//!
//! Each collection cycle runs:
//!
//! 1. **`AssignmentPlanner`** - picks the slots to fetch (forward crawl or
//!    historical backfill)
//! 2. **`RpcBlockSource`** - fetches those blocks concurrently behind a
//!    shared `RateLimiter`
//! 3. **`RelevanceFilter`** - keeps transactions touching a tracked program
//! 4. **`Persister`** - upserts one row per (signature, protocol) and moves
//!    the watermark forward once the batch is durable
//!
//! Program events inside stored transactions are decoded with
//! [`ProgramLogDecoder`], built on the IDL-driven decoders of the
//! `solana-idl-parser` crate.
//!
//! # Example
//!
//! ```no_run
//! use solana_tx_collector::{
//!     Collector, CollectorConfigBuilder, CurrentPlanner, PgStorage, Persister, RateLimiter,
//!     RelevanceFilter, RpcBlockSource, StorageBackend,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CollectorConfigBuilder::new()
//!     .with_rpc("http://127.0.0.1:8899")
//!     .with_database("postgresql://localhost/collector")
//!     .with_rate_limit(10)
//!     .build()?;
//!
//! let storage = Arc::new(PgStorage::new(&config.database_url).await?);
//! storage.initialize().await?;
//!
//! let limiter = Arc::new(RateLimiter::new(config.rate_limit));
//! let source = Arc::new(RpcBlockSource::new(&config.rpc_url, limiter, config.rpc_retry.clone()));
//! let persister = Arc::new(Persister::new(storage.clone(), config.storage_retry.clone()));
//! let keys = config.protocol_key_strings();
//! let planner = CurrentPlanner::new(storage, source.clone(), persister.clone(), keys.clone());
//!
//! Collector::new(Arc::new(planner), source, persister, RelevanceFilter::new(keys))
//!     .run()
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub use config::{CollectionMode, CollectorConfig, CollectorConfigBuilder, RetryConfig};
pub use core::{
    AssignmentPlanner, Collector, CurrentPlanner, CycleReport, DecodedLogs, EventDecodeFailure,
    HistoricalPlanner, Persister, ProgramEvent, ProgramLogDecoder, RelevanceFilter,
    RpcBlockSource,
};
pub use storage::{MemoryStorage, PgStorage, StorageBackend};
pub use types::{
    Assignment, CollectedTransaction, CollectionStream, RawTransactionRecord, TrackedProtocol,
    KNOWN_PROTOCOLS,
};
pub use utils::error::{CollectorError, Result};
pub use utils::rate_limiter::RateLimiter;
pub use utils::rpc::{DefaultRpcProvider, RpcProvider};

pub use solana_idl_parser::{AccountDecoder, DecodedEvent, EventDecoder, Idl};

pub mod config;
pub mod core;
pub mod storage;
pub mod telemetry;
pub mod types;
pub mod utils;
