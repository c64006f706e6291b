//! Collector process entry point.
//!
//! Reads its configuration from the environment (a `.env` file is honoured),
//! creates the schema if needed and runs one collector in the configured
//! mode until interrupted.

use solana_tx_collector::config::CollectionMode;
use solana_tx_collector::telemetry::{init_telemetry, TelemetryConfig};
use solana_tx_collector::utils::logging;
use solana_tx_collector::{
    AssignmentPlanner, Collector, CollectorConfigBuilder, CurrentPlanner, HistoricalPlanner,
    Persister, PgStorage, ProgramLogDecoder, RateLimiter, RelevanceFilter, Result,
    RpcBlockSource, StorageBackend,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_telemetry(TelemetryConfig::default());

    let config = CollectorConfigBuilder::from_env()?.build()?;
    let keys = config.protocol_key_strings();
    let mode = match config.mode {
        CollectionMode::Current => "current",
        CollectionMode::Historical => "historical",
    };
    logging::log_startup(mode, &config.rpc_url, config.rate_limit, &keys);

    let storage: Arc<dyn StorageBackend> = Arc::new(PgStorage::new(&config.database_url).await?);
    storage.initialize().await?;

    // One limiter for every RPC call this process makes.
    let limiter = Arc::new(RateLimiter::new(config.rate_limit));
    let source = Arc::new(RpcBlockSource::new(
        &config.rpc_url,
        limiter,
        config.rpc_retry.clone(),
    ));
    let persister = Arc::new(Persister::new(storage.clone(), config.storage_retry.clone()));

    let planner: Arc<dyn AssignmentPlanner> = match config.mode {
        CollectionMode::Current => Arc::new(
            CurrentPlanner::new(storage.clone(), source.clone(), persister.clone(), keys.clone())
                .with_excluded_slots(config.excluded_slots.clone())
                .with_retry(config.storage_retry.clone()),
        ),
        CollectionMode::Historical => Arc::new(
            HistoricalPlanner::new(storage.clone(), config.offset)
                .with_retry(config.storage_retry.clone()),
        ),
    };

    let mut collector = Collector::new(planner, source, persister, RelevanceFilter::new(keys))
        .with_poll_interval(Duration::from_secs(config.poll_interval_secs));
    if let Some(dir) = &config.idl_dir {
        let decoder = ProgramLogDecoder::from_dir(dir)?;
        tracing::info!(dir = %dir.display(), programs = decoder.len(), "Loaded IDLs");
        collector = collector.with_event_decoder(Arc::new(decoder));
    }

    tokio::select! {
        result = collector.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received, stopping collector");
        }
    }

    Ok(())
}
