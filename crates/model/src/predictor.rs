//! Predictor: scores the most recent candle with the current model and
//! publishes the forecast.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Months, Utc};
use coin_forecast_core::{AppConfig, PipelineError, PredictionWindow};
use coin_forecast_data::{PredictionRecord, Repositories, TrainingPerformanceRecord};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::artifact::{ArtifactStore, ModelArtifact};
use crate::features::load_frame;
use crate::snapshot::{
    format_datetime, format_unix, write_json, ActualPoint, ChartsSnapshot, LatestSnapshot,
    PredictionPoint, PriceChange, CHARTS_FILE, LATEST_FILE,
};

/// The current artifact of a coin and window with its latest performance row.
#[derive(Debug, Clone)]
pub struct ResolvedModel {
    pub path: PathBuf,
    pub artifact: ModelArtifact,
    pub performance: TrainingPerformanceRecord,
}

impl ResolvedModel {
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} ({}): {} trained at {}, MAE {:.8}, MAPE {:.2}% [{}]",
            self.artifact.coin,
            self.artifact.window,
            self.performance.strategy,
            format_datetime(&self.performance.trained_at),
            self.artifact.mae,
            self.performance.mape * 100.0,
            self.path.display()
        )
    }
}

/// Locates the current artifact: the manifest row first, then the artifact
/// with the lowest embedded MAE in the coin's directory.
///
/// # Errors
/// Returns `PipelineError::NoModel` if neither yields an artifact and
/// `PipelineError::MissingPerformance` if the artifact has no performance row.
pub async fn resolve_model(
    repos: &Repositories,
    artifacts: &ArtifactStore,
    coin: &str,
    window: &str,
) -> Result<ResolvedModel> {
    let from_manifest = repos
        .manifest
        .current(coin, window)
        .await?
        .map(|record| PathBuf::from(record.path))
        .filter(|path| path.is_file());

    let path = match from_manifest {
        Some(path) => path,
        None => {
            tracing::debug!(coin, window, "No usable manifest row, scanning artifacts");
            artifacts
                .lowest_error_in_dir(coin, window)?
                .ok_or_else(|| PipelineError::NoModel {
                    coin: coin.to_string(),
                    window: window.to_string(),
                })?
        }
    };

    let artifact = artifacts
        .load(&path)
        .with_context(|| format!("Failed to load model artifact {}", path.display()))?;
    let performance = repos
        .performance
        .latest_for_model(&artifact.model_id)
        .await?
        .ok_or_else(|| PipelineError::MissingPerformance {
            coin: coin.to_string(),
            window: window.to_string(),
            model_id: artifact.model_id.clone(),
        })?;

    Ok(ResolvedModel {
        path,
        artifact,
        performance,
    })
}

/// Outcome of one prediction run.
#[derive(Debug, Clone)]
pub struct PredictionReport {
    pub coin: String,
    pub window: String,
    pub actual_time: i64,
    pub prediction_time: i64,
    pub change: PriceChange,
    pub latest_path: PathBuf,
    pub charts_path: PathBuf,
}

impl PredictionReport {
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} ({}): close {} at {} -> {} at {} ({} {})",
            self.coin,
            self.window,
            self.change.close,
            format_unix(self.actual_time),
            self.change.prediction,
            format_unix(self.prediction_time),
            self.change.direction(),
            self.change.change
        )
    }
}

/// Forecasts the price `horizon` candles after the most recent candle,
/// records it and rewrites the coin's JSON snapshots.
///
/// # Errors
/// Returns `PipelineError::NoModel`, `PipelineError::MissingPerformance`,
/// `PipelineError::FeatureMismatch`, `PipelineError::NoCandles`, or a storage error.
pub async fn predict_window(
    repos: &Repositories,
    artifacts: &ArtifactStore,
    config: &AppConfig,
    coin: &str,
    window: &PredictionWindow,
) -> Result<PredictionReport> {
    let resolved = resolve_model(repos, artifacts, coin, &window.name).await?;
    let artifact = &resolved.artifact;
    tracing::info!(
        coin,
        window = %window.name,
        path = %resolved.path.display(),
        strategy = %artifact.strategy(),
        "Loaded model"
    );

    let frame = load_frame(repos, coin, &config.features, artifact.horizon).await?;
    if frame.names != artifact.feature_names {
        return Err(PipelineError::FeatureMismatch {
            expected: artifact.feature_names.clone(),
            actual: frame.names.clone(),
        }
        .into());
    }
    let (actual_time, actual_close, row) = frame.last_row().ok_or_else(|| PipelineError::NoCandles {
        coin: coin.to_string(),
    })?;

    let raw_prediction = artifact.predict_row(row);
    let change = PriceChange::new(actual_close, raw_prediction)?;
    let horizon_secs = i64::try_from(artifact.horizon)
        .context("Horizon out of range")?
        .saturating_mul(config.exchange.granularity_secs);
    let prediction_time = actual_time + horizon_secs;

    repos
        .predictions
        .insert(&PredictionRecord {
            coin: coin.to_string(),
            window: window.name.clone(),
            created_at: Utc::now(),
            actual_time,
            actual_close: decimal_to_f64(change.close),
            prediction_time,
            prediction: decimal_to_f64(change.prediction),
        })
        .await?;

    let dir = artifacts.dir(coin, &window.name);
    let latest = LatestSnapshot {
        predict_time: format_unix(prediction_time),
        predict_now: format_unix(actual_time),
        predict_close: change.close,
        prediction: change.prediction,
        expected_change: change.change,
        expected_change_pct: change.change_pct,
        change_direction: change.direction().to_string(),
        stats_training_time: format_datetime(&resolved.performance.trained_at),
        stats_mae: artifact.mae,
        stats_mape: resolved.performance.mape,
    };
    let latest_path = write_json(&dir, LATEST_FILE, &latest)?;

    let charts = chart_snapshot(repos, coin, &window.name, config.output.chart_months).await?;
    tracing::debug!(
        actuals = charts.actuals.len(),
        predictions = charts.predictions.len(),
        "Collected chart points"
    );
    let charts_path = write_json(&dir, CHARTS_FILE, &charts)?;

    let report = PredictionReport {
        coin: coin.to_string(),
        window: window.name.clone(),
        actual_time,
        prediction_time,
        change,
        latest_path,
        charts_path,
    };
    tracing::info!("{}", report.summary());
    Ok(report)
}

/// Actual closes and forecasts of the last `months` months.
///
/// # Errors
/// Returns an error if the database queries fail.
pub async fn chart_snapshot(
    repos: &Repositories,
    coin: &str,
    window: &str,
    months: u32,
) -> Result<ChartsSnapshot> {
    let now = Utc::now();
    let from = now
        .checked_sub_months(Months::new(months))
        .unwrap_or(now)
        .timestamp();

    let predictions = repos
        .predictions
        .since(coin, window, from)
        .await?
        .into_iter()
        .map(|p| PredictionPoint {
            time: p.prediction_time,
            prediction: p.prediction,
        })
        .collect();
    let actuals = repos
        .candles
        .query_since(coin, from)
        .await?
        .into_iter()
        .map(|c| ActualPoint {
            time: c.time,
            close: c.close,
        })
        .collect();

    Ok(ChartsSnapshot::new(actuals, predictions))
}

fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}
