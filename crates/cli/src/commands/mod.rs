//! CLI commands of the forecasting pipeline.

pub mod import_index;
pub mod ingest;
pub mod predict;
pub mod run_all;
pub mod stats;
pub mod train;

pub use import_index::{run_import_index, ImportIndexArgs};
pub use ingest::{run_ingest, IngestArgs};
pub use predict::{run_predict, PredictArgs};
pub use run_all::{run_run_all, RunAllArgs};
pub use stats::{run_stats, StatsArgs};
pub use train::{run_train, TrainArgs};

use tokio::sync::watch;

/// A receiver that turns `true` on Ctrl-C.
pub fn interrupt_watch() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Received SIGINT (Ctrl+C), stopping after the current step");
            let _ = tx.send(true);
        }
    });
    rx
}
