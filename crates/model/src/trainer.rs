//! Model trainer.
//!
//! Fits the configured roster on the train split, scores every single model
//! and every pair and triple of them on the test split, and persists the
//! lowest-MAE candidate as the artifact of the coin and window.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use coin_forecast_core::{AppConfig, ModelKind, PipelineError, PredictionWindow, TrainerConfig};
use coin_forecast_data::{ManifestRecord, Repositories, TrainingPerformanceRecord};
use uuid::Uuid;

use crate::artifact::{ArtifactStore, ModelArtifact};
use crate::dataset::{Dataset, TrainTestSplit};
use crate::error::ModelError;
use crate::features::load_frame;
use crate::metrics::{mae, mape};
use crate::regressors::{fit_model, FittedModel, Regressor};
use crate::selection::{combine_predictions, enumerate_ensembles, select_best, Candidate};

/// Result of fitting and scoring the roster on one dataset.
#[derive(Debug, Clone)]
pub struct TrainedEnsemble {
    pub best: Candidate,
    pub mape: f64,
    /// Fitted members of the winning candidate, in component order
    pub models: Vec<FittedModel>,
    /// Every scored candidate, in enumeration order
    pub candidates: Vec<Candidate>,
    pub train_rows: usize,
    pub test_rows: usize,
}

impl TrainedEnsemble {
    #[must_use]
    pub fn moving_average_column(&self) -> Option<String> {
        self.models
            .iter()
            .find_map(FittedModel::moving_average_column)
            .map(str::to_string)
    }
}

/// Fits, scores and selects on `dataset`.
///
/// # Errors
/// Returns `ModelError::EmptyDataset` for an empty dataset, a split error if
/// the policy leaves a partition empty, the first fit failure, or
/// `ModelError::NonFinite` if no candidate has a finite score.
pub fn train_models(dataset: &Dataset, config: &TrainerConfig) -> Result<TrainedEnsemble, ModelError> {
    if dataset.is_empty() {
        return Err(ModelError::EmptyDataset);
    }
    let split = TrainTestSplit::from_config(dataset, &config.test_split)?;
    let test_y = split.test.targets_f64();

    let mut fitted = Vec::with_capacity(config.models.len());
    let mut test_predictions = Vec::with_capacity(config.models.len());
    for &kind in &config.models {
        let model = fit_model(kind, &split, config)?;
        let predictions = model.predict(&split.test.features);
        tracing::info!(model = %kind, test_mae = mae(&predictions, &test_y), "Fitted model");
        fitted.push(model);
        test_predictions.push(predictions);
    }

    let combos = enumerate_ensembles(fitted.len());
    let mut candidates = Vec::with_capacity(combos.len());
    for combo in &combos {
        let members: Vec<&[f64]> = combo.iter().map(|&i| test_predictions[i].as_slice()).collect();
        let combined = combine_predictions(&members);
        candidates.push(Candidate {
            components: combo.iter().map(|&i| config.models[i]).collect(),
            mae: mae(&combined, &test_y),
        });
    }
    for candidate in &candidates {
        tracing::debug!(%candidate, "Scored candidate");
    }

    let best_index = select_best(&candidates)
        .and_then(|best| candidates.iter().position(|c| std::ptr::eq(c, best)))
        .ok_or_else(|| ModelError::NonFinite("every candidate score".to_string()))?;
    let best = candidates[best_index].clone();
    let combo = &combos[best_index];

    let members: Vec<&[f64]> = combo.iter().map(|&i| test_predictions[i].as_slice()).collect();
    let winner_mape = mape(&combine_predictions(&members), &test_y);
    let models = combo.iter().map(|&i| fitted[i].clone()).collect();

    Ok(TrainedEnsemble {
        best,
        mape: winner_mape,
        models,
        candidates,
        train_rows: split.train.n_samples(),
        test_rows: split.test.n_samples(),
    })
}

/// Summary of a persisted training run.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub model_id: String,
    pub coin: String,
    pub window: String,
    pub mae: f64,
    pub mape: f64,
    pub strategy: String,
    pub components: Vec<ModelKind>,
    pub path: PathBuf,
    pub train_rows: usize,
    pub test_rows: usize,
}

impl TrainingReport {
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} ({}): {} with MAE {:.8}, MAPE {:.2}% on {} test rows ({} train rows)",
            self.coin,
            self.window,
            self.strategy,
            self.mae,
            self.mape * 100.0,
            self.test_rows,
            self.train_rows
        )
    }
}

/// Trains a coin and window and persists the artifact, a performance row
/// and the manifest row.
///
/// # Errors
/// Returns `PipelineError::NoCandles` if the coin has no candles, any fit or
/// selection error, or a storage error.
pub async fn train_window(
    repos: &Repositories,
    artifacts: &ArtifactStore,
    config: &AppConfig,
    coin: &str,
    window: &PredictionWindow,
) -> Result<TrainingReport> {
    tracing::info!(coin, window = %window.name, horizon = window.horizon, "Training");

    let frame = load_frame(repos, coin, &config.features, window.horizon).await?;
    let dataset = frame
        .training_dataset()
        .map_err(|e| match e {
            ModelError::EmptyDataset => anyhow::Error::new(PipelineError::NoCandles {
                coin: coin.to_string(),
            })
            .context(format!(
                "{} candles do not cover a horizon of {}",
                frame.n_rows(),
                window.horizon
            )),
            other => other.into(),
        })?;
    tracing::info!(
        coin,
        rows = dataset.n_samples(),
        features = dataset.n_features(),
        "Built training dataset"
    );

    let trained = train_models(&dataset, &config.trainer)
        .with_context(|| format!("Failed to train models for {coin} ({})", window.name))?;

    let created_at = Utc::now();
    let artifact = ModelArtifact {
        model_id: Uuid::new_v4().to_string(),
        coin: coin.to_string(),
        window: window.name.clone(),
        horizon: window.horizon,
        created_at,
        mae: trained.best.mae,
        mape: trained.mape,
        components: trained.best.components.clone(),
        moving_average_column: trained.moving_average_column(),
        models: trained.models,
        feature_names: dataset.feature_names.clone(),
    };
    let path = artifacts
        .write(&artifact)
        .context("Failed to write model artifact")?;

    let strategy = artifact.strategy();
    repos
        .performance
        .insert(&TrainingPerformanceRecord {
            model_id: artifact.model_id.clone(),
            coin: coin.to_string(),
            window: window.name.clone(),
            trained_at: created_at,
            mae: artifact.mae,
            mape: artifact.mape,
            strategy: strategy.clone(),
        })
        .await?;
    repos
        .manifest
        .replace(&ManifestRecord {
            model_id: artifact.model_id.clone(),
            coin: coin.to_string(),
            window: window.name.clone(),
            mae: artifact.mae,
            mape: artifact.mape,
            created_at,
            path: path.to_string_lossy().into_owned(),
        })
        .await?;

    let report = TrainingReport {
        model_id: artifact.model_id,
        coin: coin.to_string(),
        window: window.name.clone(),
        mae: artifact.mae,
        mape: artifact.mape,
        strategy,
        components: artifact.components,
        path,
        train_rows: trained.train_rows,
        test_rows: trained.test_rows,
    };
    tracing::info!("{}", report.summary());
    Ok(report)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::features::{FeatureFrame, FeatureSpec};
    use chrono::NaiveDate;
    use coin_forecast_core::{day_start, Candle, TestSplitConfig};
    use coin_forecast_data::Store;

    pub(crate) fn synthetic_candles(coin: &str, n: usize) -> Vec<Candle> {
        let start = day_start(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        (0..n)
            .map(|i| {
                let t = i as f64;
                let close = 100.0 + 10.0 * (t / 25.0).sin() + 0.05 * t;
                Candle {
                    coin: coin.to_string(),
                    time: start + i as i64 * 300,
                    low: close - (i % 7) as f64 * 0.3,
                    high: close + (i % 5) as f64 * 0.2,
                    open: close + ((i * 3) % 11) as f64 * 0.1 - 0.5,
                    close,
                    volume: 1000.0 + ((i * 13) % 17) as f64,
                }
            })
            .collect()
    }

    pub(crate) fn small_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.features.ma_min = 10;
        config.features.ma_max = 40;
        config.features.ma_step = 10;
        config.pipeline.windows = vec![PredictionWindow {
            name: "1h".into(),
            horizon: 12,
        }];
        config.trainer.test_split = TestSplitConfig::Tail { rows: 80 };
        config.trainer.random_forest.n_trees = 8;
        config.trainer.random_forest.max_depth = 6;
        config.trainer.gradient_boosting.max_rounds = 30;
        config
    }

    fn dataset(config: &AppConfig) -> Dataset {
        let spec = FeatureSpec::from_config(&config.features, 12).unwrap();
        FeatureFrame::build("BTC-USD", &synthetic_candles("BTC-USD", 500), &[], &spec)
            .unwrap()
            .training_dataset()
            .unwrap()
    }

    #[test]
    fn test_selects_lowest_scored_candidate() {
        let config = small_config();
        let trained = train_models(&dataset(&config), &config.trainer).unwrap();

        assert_eq!(trained.candidates.len(), 4 + 6 + 4);
        let min = trained
            .candidates
            .iter()
            .map(|c| c.mae)
            .fold(f64::INFINITY, f64::min);
        assert_eq!(trained.best.mae, min);
        assert_eq!(trained.models.len(), trained.best.components.len());
        assert_eq!(trained.test_rows, 80);
        assert_eq!(trained.train_rows, 500 - 12 - 80);
        assert!(trained.mape.is_finite());
    }

    #[test]
    fn test_single_model_roster() {
        let mut config = small_config();
        config.trainer.models = vec![ModelKind::MovingAverage];
        let trained = train_models(&dataset(&config), &config.trainer).unwrap();

        assert_eq!(trained.candidates.len(), 1);
        assert_eq!(trained.best.components, vec![ModelKind::MovingAverage]);
        assert!(trained.moving_average_column().unwrap().starts_with("ma_close_"));
    }

    #[test]
    fn test_split_larger_than_dataset_fails() {
        let mut config = small_config();
        config.trainer.test_split = TestSplitConfig::Tail { rows: 10_000 };
        assert!(matches!(
            train_models(&dataset(&config), &config.trainer),
            Err(ModelError::InvalidSplit(_))
        ));
    }

    #[test]
    fn test_reloaded_artifact_reproduces_mae() {
        let config = small_config();
        let data = dataset(&config);
        let trained = train_models(&data, &config.trainer).unwrap();
        let root = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(root.path());

        let artifact = ModelArtifact {
            model_id: "reload".into(),
            coin: "BTC-USD".into(),
            window: "1h".into(),
            horizon: 12,
            created_at: Utc::now(),
            mae: trained.best.mae,
            mape: trained.mape,
            components: trained.best.components.clone(),
            moving_average_column: trained.moving_average_column(),
            models: trained.models.clone(),
            feature_names: data.feature_names.clone(),
        };
        let path = store.write(&artifact).unwrap();
        let loaded = store.load(&path).unwrap();

        let split = TrainTestSplit::from_config(&data, &config.trainer.test_split).unwrap();
        let predictions: Vec<f64> = (0..split.test.n_samples())
            .map(|i| loaded.predict_row(split.test.row(i)))
            .collect();
        let reloaded_mae = mae(&predictions, &split.test.targets_f64());

        assert!((reloaded_mae - trained.best.mae).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_train_window_persists_artifact_and_rows() {
        let config = small_config();
        let store = Store::new_in_memory().await.unwrap();
        let repos = store.repositories();
        let candles = synthetic_candles("BTC-USD", 500);
        let day = candles[0].day();
        // 500 five-minute candles span two days
        let (first, second): (Vec<_>, Vec<_>) = candles.into_iter().partition(|c| c.day() == day);
        repos.candles.replace_day("BTC-USD", day, &first).await.unwrap();
        repos
            .candles
            .replace_day("BTC-USD", second[0].day(), &second)
            .await
            .unwrap();

        let root = tempfile::tempdir().unwrap();
        let artifacts = ArtifactStore::new(root.path());
        let window = config.pipeline.windows[0].clone();

        let report = train_window(&repos, &artifacts, &config, "BTC-USD", &window)
            .await
            .unwrap();

        assert!(report.path.exists());
        let manifest = repos.manifest.current("BTC-USD", "1h").await.unwrap().unwrap();
        assert_eq!(manifest.model_id, report.model_id);
        assert_eq!(manifest.path, report.path.to_string_lossy());
        let performance = repos
            .performance
            .latest_for_model(&report.model_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(performance.strategy, report.strategy);
        assert_eq!(performance.mae, report.mae);
    }

    #[tokio::test]
    async fn test_train_window_without_candles() {
        let config = small_config();
        let store = Store::new_in_memory().await.unwrap();
        let root = tempfile::tempdir().unwrap();
        let window = config.pipeline.windows[0].clone();

        let err = train_window(
            &store.repositories(),
            &ArtifactStore::new(root.path()),
            &config,
            "BTC-USD",
            &window,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::NoCandles { .. })
        ));
    }
}
