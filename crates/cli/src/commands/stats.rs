//! Model statistics CLI command.

use anyhow::Result;
use clap::Args;
use coin_forecast_core::AppConfig;
use coin_forecast_data::Store;
use coin_forecast_model::{resolve_model, ArtifactStore};

/// Arguments for the stats command.
#[derive(Args, Debug, Clone)]
pub struct StatsArgs {
    /// Coin to report (e.g., "BTC-USD")
    pub coin: String,

    /// Prediction window (all configured windows when omitted)
    #[arg(long)]
    pub window: Option<String>,

    /// Also list the N most recent training runs of each window
    #[arg(long, default_value = "0")]
    pub history: usize,
}

/// Runs the stats command.
///
/// # Errors
/// Returns an error for an unsupported coin or window, or when a window has
/// no model or no performance row.
pub async fn run_stats(args: StatsArgs, config: &AppConfig) -> Result<()> {
    config.ensure_coin(&args.coin)?;
    let windows = config.select_windows(args.window.as_deref())?;
    let artifacts = ArtifactStore::new(&config.output.models_dir);

    Store::scoped(&config.database, |store| async move {
        let repos = store.repositories();
        for window in &windows {
            let resolved = resolve_model(&repos, &artifacts, &args.coin, &window.name).await?;
            println!("{}", resolved.summary());

            if args.history > 0 {
                let runs = repos.performance.history(&args.coin, &window.name).await?;
                for run in runs.iter().take(args.history) {
                    println!(
                        "  history: {} {} MAE {:.8} MAPE {:.2}% [{}]",
                        run.trained_at.format("%Y-%m-%d %H:%M:%S"),
                        run.strategy,
                        run.mae,
                        run.mape * 100.0,
                        run.model_id
                    );
                }
            }
        }
        Ok(())
    })
    .await
}
