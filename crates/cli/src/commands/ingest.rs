//! Ingest CLI command.
//!
//! Walks every day from the configured start date to today and refetches
//! the days whose stored candles are missing, incomplete or duplicated.

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use coin_forecast_collector::{CoinbaseClient, IngestOutcome, Ingestor};
use coin_forecast_core::AppConfig;
use coin_forecast_data::Store;
use tokio::sync::watch;

/// Arguments for the ingest command.
#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    /// Coin to ingest (e.g., "BTC-USD")
    pub coin: String,
}

/// Runs the ingest command.
///
/// # Errors
/// Returns an error for an unsupported coin, an upstream outage, or a
/// database or HTTP failure.
pub async fn run_ingest(args: IngestArgs, config: &AppConfig) -> Result<()> {
    config.ensure_coin(&args.coin)?;
    let shutdown = super::interrupt_watch();

    let outcome = Store::scoped(&config.database, |store| async move {
        ingest_coin(&store, config, &args.coin, shutdown).await
    })
    .await?;

    if outcome.is_interrupted() {
        tracing::warn!("Interrupted: {}", outcome.stats().summary());
    }
    Ok(())
}

/// Ingests one coin against the configured exchange.
///
/// # Errors
/// Returns an error if the client cannot be built or ingestion fails.
pub async fn ingest_coin(
    store: &Store,
    config: &AppConfig,
    coin: &str,
    shutdown: watch::Receiver<bool>,
) -> Result<IngestOutcome> {
    let client = CoinbaseClient::with_config(&config.exchange)?;
    let ingestor = Ingestor::new(client, store.repositories().candles, config.exchange.clone());
    ingestor.run(coin, Utc::now().date_naive(), shutdown).await
}
