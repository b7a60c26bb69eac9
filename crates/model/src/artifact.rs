//! Persisted model artifacts.
//!
//! One artifact per coin and window lives at
//! `<root>/<coin>/<window>/model-<mae>.json` with the MAE printed to eight
//! decimals. Writing a new artifact removes its siblings.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use coin_forecast_core::ModelKind;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::regressors::{FittedModel, Regressor};
use crate::selection::{combine, strategy_name};

const ARTIFACT_PREFIX: &str = "model-";
const ARTIFACT_SUFFIX: &str = ".json";

/// The fitted winning ensemble of a coin and window plus its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model_id: String,
    pub coin: String,
    pub window: String,
    pub horizon: usize,
    pub created_at: DateTime<Utc>,
    pub mae: f64,
    /// Infinite when a test target is zero
    #[serde(with = "crate::metrics::unbounded")]
    pub mape: f64,
    /// Ensemble rule: the members whose predictions are averaged
    pub components: Vec<ModelKind>,
    /// Fitted members, in `components` order
    pub models: Vec<FittedModel>,
    pub moving_average_column: Option<String>,
    pub feature_names: Vec<String>,
}

impl ModelArtifact {
    #[must_use]
    pub fn strategy(&self) -> String {
        strategy_name(&self.components)
    }

    #[must_use]
    pub fn file_name(&self) -> String {
        artifact_file_name(self.mae)
    }

    /// Scores one feature row with the ensemble.
    #[must_use]
    pub fn predict_row(&self, row: ArrayView1<'_, f32>) -> f64 {
        let values: Vec<f64> = self.models.iter().map(|m| m.predict_row(row)).collect();
        combine(&values)
    }
}

#[must_use]
pub fn artifact_file_name(mae: f64) -> String {
    format!("{ARTIFACT_PREFIX}{mae:.8}{ARTIFACT_SUFFIX}")
}

/// MAE embedded in an artifact file name, `None` for other files.
#[must_use]
pub fn parse_artifact_mae(file_name: &str) -> Option<f64> {
    file_name
        .strip_prefix(ARTIFACT_PREFIX)?
        .strip_suffix(ARTIFACT_SUFFIX)?
        .parse()
        .ok()
}

/// Directory tree of model artifacts and prediction snapshots.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of a coin and window.
    #[must_use]
    pub fn dir(&self, coin: &str, window: &str) -> PathBuf {
        self.root.join(coin).join(window)
    }

    /// Writes `artifact` after deleting every other artifact of its coin and window.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be prepared or the file written.
    pub fn write(&self, artifact: &ModelArtifact) -> Result<PathBuf, ModelError> {
        let dir = self.dir(&artifact.coin, &artifact.window);
        fs::create_dir_all(&dir)?;

        for (path, _) in self.list(&artifact.coin, &artifact.window)? {
            tracing::debug!(path = %path.display(), "Removing previous artifact");
            fs::remove_file(&path)?;
        }

        let path = dir.join(artifact.file_name());
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(artifact)?)?;
        fs::rename(&tmp, &path)?;

        tracing::info!(
            coin = %artifact.coin,
            window = %artifact.window,
            path = %path.display(),
            "Wrote model artifact"
        );
        Ok(path)
    }

    /// # Errors
    /// Returns an error if the file is missing or not a valid artifact.
    pub fn load(&self, path: &Path) -> Result<ModelArtifact, ModelError> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Artifact files of a coin and window with their embedded MAE.
    ///
    /// # Errors
    /// Returns an error if the directory exists but cannot be read.
    pub fn list(&self, coin: &str, window: &str) -> Result<Vec<(PathBuf, f64)>, ModelError> {
        let dir = self.dir(coin, window);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if let Some(mae) = name.to_str().and_then(parse_artifact_mae) {
                out.push((entry.path(), mae));
            }
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }

    /// Path of the artifact with the lowest embedded MAE, if any.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be read.
    pub fn lowest_error_in_dir(
        &self,
        coin: &str,
        window: &str,
    ) -> Result<Option<PathBuf>, ModelError> {
        let best = self
            .list(coin, window)?
            .into_iter()
            .filter(|(_, mae)| mae.is_finite())
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(path, _)| path);
        Ok(best)
    }
}
