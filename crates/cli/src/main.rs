use clap::{Parser, Subcommand};
use coin_forecast_core::config_loader::DEFAULT_CONFIG_PATH;
use coin_forecast_core::ConfigLoader;

mod commands;

use commands::{
    ImportIndexArgs, IngestArgs, PredictArgs, RunAllArgs, StatsArgs, TrainArgs,
};

#[derive(Parser)]
#[command(name = "coin-forecast")]
#[command(about = "Collect coin candles, train price models and publish forecasts", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch missing and incomplete days of candles from the exchange
    Ingest(IngestArgs),
    /// Train the model roster and keep the best ensemble
    Train(TrainArgs),
    /// Forecast from the latest candle and rewrite the JSON snapshots
    Predict(PredictArgs),
    /// Show the current model and its scores
    Stats(StatsArgs),
    /// Import a daily reference-index CSV as auxiliary series
    ImportIndex(ImportIndexArgs),
    /// Ingest, train and predict every configured coin and window
    RunAll(RunAllArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ConfigLoader::load_from(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log.level)),
        )
        .init();

    match cli.command {
        Commands::Ingest(args) => commands::run_ingest(args, &config).await?,
        Commands::Train(args) => commands::run_train(args, &config).await?,
        Commands::Predict(args) => commands::run_predict(args, &config).await?,
        Commands::Stats(args) => commands::run_stats(args, &config).await?,
        Commands::ImportIndex(args) => commands::run_import_index(args, &config).await?,
        Commands::RunAll(args) => commands::run_run_all(args, &config).await?,
    }

    Ok(())
}
