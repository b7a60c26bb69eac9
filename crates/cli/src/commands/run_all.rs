//! Run-all CLI command.
//!
//! Runs ingest, train and predict for every configured coin and window. A
//! failing coin is logged and skipped; the command fails at the end if any
//! coin failed.

use anyhow::{bail, Result};
use clap::Args;
use coin_forecast_core::AppConfig;
use coin_forecast_data::Store;
use coin_forecast_model::{predict_window, train_window, ArtifactStore};
use tokio::sync::watch;

use super::ingest::ingest_coin;

/// Arguments for the run-all command.
#[derive(Args, Debug, Clone)]
pub struct RunAllArgs {
    /// Skip ingestion and work from the stored candles
    #[arg(long, default_value = "false")]
    pub skip_ingest: bool,
}

/// Runs the run-all command.
///
/// # Errors
/// Returns an error if the store cannot be opened or any coin failed.
pub async fn run_run_all(args: RunAllArgs, config: &AppConfig) -> Result<()> {
    let shutdown = super::interrupt_watch();
    let artifacts = ArtifactStore::new(&config.output.models_dir);

    let failed = Store::scoped(&config.database, |store| async move {
        let mut failed = Vec::new();
        for coin in &config.pipeline.coins {
            match process_coin(&store, &artifacts, config, coin, &args, shutdown.clone()).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!(coin = %coin, "Interrupted, skipping remaining coins");
                    break;
                }
                Err(e) => {
                    tracing::error!(coin = %coin, "Pipeline failed: {:#}", e);
                    failed.push(coin.clone());
                }
            }
        }
        Ok(failed)
    })
    .await?;

    if !failed.is_empty() {
        bail!("Pipeline failed for {}", failed.join(", "));
    }
    Ok(())
}

/// Returns `false` when interrupted. The flag is read before ingestion and
/// before every window; fitting itself is never cut short.
async fn process_coin(
    store: &Store,
    artifacts: &ArtifactStore,
    config: &AppConfig,
    coin: &str,
    args: &RunAllArgs,
    shutdown: watch::Receiver<bool>,
) -> Result<bool> {
    if *shutdown.borrow() {
        return Ok(false);
    }

    if !args.skip_ingest {
        let outcome = ingest_coin(store, config, coin, shutdown.clone()).await?;
        if outcome.is_interrupted() {
            return Ok(false);
        }
    }

    let repos = store.repositories();
    for window in &config.pipeline.windows {
        if *shutdown.borrow() {
            tracing::warn!(coin, window = %window.name, "Interrupted before training");
            return Ok(false);
        }
        let report = train_window(&repos, artifacts, config, coin, window).await?;
        println!("{}", report.summary());
        let prediction = predict_window(&repos, artifacts, config, coin, window).await?;
        println!("{}", prediction.summary());
    }
    Ok(true)
}
