//! Predict CLI command.

use anyhow::Result;
use clap::Args;
use coin_forecast_core::AppConfig;
use coin_forecast_data::Store;
use coin_forecast_model::{predict_window, ArtifactStore};

/// Arguments for the predict command.
#[derive(Args, Debug, Clone)]
pub struct PredictArgs {
    /// Coin to forecast (e.g., "BTC-USD")
    pub coin: String,

    /// Prediction window (all configured windows when omitted)
    #[arg(long)]
    pub window: Option<String>,
}

/// Runs the predict command.
///
/// # Errors
/// Returns an error for an unsupported coin or window, a missing model or
/// performance row, a feature mismatch, or a storage failure.
pub async fn run_predict(args: PredictArgs, config: &AppConfig) -> Result<()> {
    config.ensure_coin(&args.coin)?;
    let windows = config.select_windows(args.window.as_deref())?;
    let artifacts = ArtifactStore::new(&config.output.models_dir);

    Store::scoped(&config.database, |store| async move {
        let repos = store.repositories();
        for window in &windows {
            let report = predict_window(&repos, &artifacts, config, &args.coin, window).await?;
            println!("{}", report.summary());
        }
        Ok(())
    })
    .await
}
