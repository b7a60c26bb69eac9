//! Import-index CLI command.
//!
//! Loads a daily `Date,Open,Close` CSV (such as a stock-index download) into
//! the auxiliary series `<name>_open` and `<name>_close`.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use coin_forecast_core::AppConfig;
use coin_forecast_data::{CsvStorage, Store};

/// Arguments for the import-index command.
#[derive(Args, Debug, Clone)]
pub struct ImportIndexArgs {
    /// Series name prefix (e.g., "spy")
    #[arg(long)]
    pub name: String,

    /// CSV file path
    #[arg(long)]
    pub path: PathBuf,
}

/// Runs the import-index command.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed, or the database
/// write fails.
pub async fn run_import_index(args: ImportIndexArgs, config: &AppConfig) -> Result<()> {
    let stats = Store::scoped(&config.database, |store| async move {
        CsvStorage::import_index(&store.repositories().auxiliary, &args.name, &args.path).await
    })
    .await?;

    println!(
        "Imported {} rows ({} skipped): {} open and {} close values",
        stats.rows, stats.skipped, stats.open_written, stats.close_written
    );
    Ok(())
}
