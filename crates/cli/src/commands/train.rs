//! Train CLI command.

use anyhow::Result;
use clap::Args;
use coin_forecast_core::AppConfig;
use coin_forecast_data::Store;
use coin_forecast_model::{train_window, ArtifactStore};

/// Arguments for the train command.
#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// Coin to train (e.g., "BTC-USD")
    pub coin: String,

    /// Prediction window to train (all configured windows when omitted)
    #[arg(long)]
    pub window: Option<String>,
}

/// Runs the train command.
///
/// # Errors
/// Returns an error for an unsupported coin or window, missing candles, or a
/// fit or storage failure.
pub async fn run_train(args: TrainArgs, config: &AppConfig) -> Result<()> {
    config.ensure_coin(&args.coin)?;
    let windows = config.select_windows(args.window.as_deref())?;
    let artifacts = ArtifactStore::new(&config.output.models_dir);

    Store::scoped(&config.database, |store| async move {
        let repos = store.repositories();
        for window in &windows {
            let report = train_window(&repos, &artifacts, config, &args.coin, window).await?;
            println!("{}", report.summary());
        }
        Ok(())
    })
    .await
}
